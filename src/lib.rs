pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::{Config, ModelSettings};
pub use error::{RecommendError, RecommendResult};
