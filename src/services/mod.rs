pub mod factorization;
pub mod hybrid;
pub mod matrix;
pub mod popularity;
pub mod recommender;
pub mod similarity;
pub mod sources;

pub use factorization::FactorizationModel;
pub use hybrid::HybridDispatcher;
pub use matrix::UserItemMatrix;
pub use popularity::PopularityRanker;
pub use recommender::{ModelSnapshot, RecommenderService};
pub use similarity::ItemSimilarityModel;
pub use sources::{Dataset, InMemorySource, MovieLensSource, RatingSource};
