use crate::models::{ItemId, UserId};

/// Recommendation engine errors
#[derive(thiserror::Error, Debug)]
pub enum RecommendError {
    #[error("Unrecognized method: '{0}' (expected auto, collaborative, popularity or svd)")]
    UnrecognizedMethod(String),

    #[error("Cannot fit: rating table is empty")]
    EmptyRatings,

    #[error("Cannot fit: invalid rating {rating} for user {user_id}, item {item_id}")]
    InvalidRating {
        user_id: UserId,
        item_id: ItemId,
        rating: f64,
    },

    #[error("Cannot fit: duplicate rating for user {user_id}, item {item_id}")]
    DuplicateRating { user_id: UserId, item_id: ItemId },

    #[error("User {0} not found in the dataset")]
    UserNotFound(UserId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type RecommendResult<T> = Result<T, RecommendError>;
