use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::RecommendError;

use super::{ItemId, UserId};

/// A ranked item returned to the caller
///
/// Score semantics depend on the strategy that produced it, so scores from
/// different strategies are not comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: ItemId,
    pub title: Option<String>,
    pub score: f64,
}

impl Recommendation {
    pub fn untitled(item_id: ItemId, score: f64) -> Self {
        Self {
            item_id,
            title: None,
            score,
        }
    }
}

/// Concrete scoring strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Item-based collaborative filtering
    Collaborative,
    /// Global mean-rating ranking
    Popularity,
    /// Low-rank factorization
    Svd,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Collaborative => "collaborative",
            Strategy::Popularity => "popularity",
            Strategy::Svd => "svd",
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Method requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Pick a strategy from the size of the user's history
    Auto,
    Explicit(Strategy),
}

impl FromStr for Method {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Method::Auto),
            "collaborative" => Ok(Method::Explicit(Strategy::Collaborative)),
            "popularity" => Ok(Method::Explicit(Strategy::Popularity)),
            "svd" => Ok(Method::Explicit(Strategy::Svd)),
            other => Err(RecommendError::UnrecognizedMethod(other.to_string())),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Auto => write!(f, "auto"),
            Method::Explicit(strategy) => write!(f, "{}", strategy),
        }
    }
}

/// Request for recommendations
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: UserId,
    #[serde(default = "default_n")]
    pub n: usize,
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_n() -> usize {
    5
}

fn default_method() -> String {
    "auto".to_string()
}

impl RecommendationRequest {
    pub fn new(user_id: UserId, n: usize, method: impl Into<String>) -> Self {
        Self {
            user_id,
            n,
            method: method.into(),
        }
    }
}

/// Recommendations plus the strategy that produced them
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub method_used: Strategy,
    pub recommendations: Vec<Recommendation>,
    pub total: usize,
}
