pub mod engine;
pub mod error;
pub mod model_cache;
pub mod permission;
pub mod settings;
pub mod voice;

#[cfg(feature = "app")]
mod app;
#[cfg(feature = "app")]
mod commands;

#[cfg(feature = "app")]
pub use app::run;
pub use error::AppError;
