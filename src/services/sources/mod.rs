//! Rating data sources
//!
//! The engine never reads files itself: a `RatingSource` hands it an
//! already-parsed dataset, whether from a MovieLens directory on disk or from
//! memory.

use crate::{
    error::RecommendResult,
    models::{Item, Rating},
};

pub mod memory;
pub mod movielens;

pub use memory::InMemorySource;
pub use movielens::MovieLensSource;

/// Ratings and item metadata loaded together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub ratings: Vec<Rating>,
    pub items: Vec<Item>,
}

/// Trait for rating data sources
///
/// Sources are read-only from the engine's point of view; every `load` returns
/// a fresh copy of the full dataset.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingSource: Send + Sync {
    /// Load the full rating table and item catalog
    async fn load(&self) -> RecommendResult<Dataset>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}
