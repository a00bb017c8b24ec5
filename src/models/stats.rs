use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use super::{Item, Rating};

/// Summary statistics of the loaded dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub total_users: usize,
    pub total_items: usize,
    pub total_ratings: usize,
    pub mean_ratings_per_user: f64,
    pub mean_rating: f64,
}

impl DatasetStats {
    pub fn from_ratings(ratings: &[Rating], items: &[Item]) -> Self {
        let users: HashSet<_> = ratings.iter().map(|r| r.user_id).collect();
        let total_users = users.len();
        let total_ratings = ratings.len();

        let (mean_ratings_per_user, mean_rating) = if total_ratings == 0 {
            (0.0, 0.0)
        } else {
            let sum: f64 = ratings.iter().map(|r| r.rating).sum();
            (
                total_ratings as f64 / total_users as f64,
                sum / total_ratings as f64,
            )
        };

        Self {
            total_users,
            total_items: items.len(),
            total_ratings,
            mean_ratings_per_user,
            mean_rating,
        }
    }
}

/// Health report for the currently served model snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: &'static str,
    pub total_ratings: usize,
    pub total_items: usize,
    pub fit_id: Uuid,
    pub fitted_at: DateTime<Utc>,
}
