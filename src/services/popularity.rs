use serde::Serialize;
use std::collections::BTreeMap;

use crate::{
    error::RecommendResult,
    models::{ItemId, Rating, Recommendation, UserId},
};

use super::matrix::{by_score_desc, validate_ratings};

/// Aggregate statistics for one item that passed the support threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularItem {
    pub item_id: ItemId,
    pub rating_count: usize,
    pub mean_rating: f64,
}

/// Ranks items by global mean rating
///
/// Only items with at least `min_ratings` ratings are ranked. The ranking is
/// the same for every user.
#[derive(Debug, Clone)]
pub struct PopularityRanker {
    min_ratings: usize,
    table: Vec<PopularItem>,
}

impl PopularityRanker {
    pub fn fit(ratings: &[Rating], min_ratings: usize) -> RecommendResult<Self> {
        validate_ratings(ratings)?;
        Ok(Self::rank(ratings, min_ratings))
    }

    /// Builds the ranking from ratings that already passed validation
    pub(crate) fn rank(ratings: &[Rating], min_ratings: usize) -> Self {
        let mut totals: BTreeMap<ItemId, (usize, f64)> = BTreeMap::new();
        for r in ratings {
            let entry = totals.entry(r.item_id).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += r.rating;
        }

        let mut table: Vec<PopularItem> = totals
            .into_iter()
            .filter(|(_, (count, _))| *count >= min_ratings)
            .map(|(item_id, (count, sum))| PopularItem {
                item_id,
                rating_count: count,
                mean_rating: sum / count as f64,
            })
            .collect();

        table.sort_by(|a, b| {
            by_score_desc(&(a.item_id, a.mean_rating), &(b.item_id, b.mean_rating))
        });

        tracing::info!(
            items = table.len(),
            min_ratings,
            "Fitted popularity ranking"
        );

        Self { min_ratings, table }
    }

    /// Top `n` items by mean rating, without titles
    ///
    /// Returns every qualifying item when fewer than `n` exist.
    pub fn recommend(&self, _user_id: UserId, n: usize) -> Vec<Recommendation> {
        self.table
            .iter()
            .take(n)
            .map(|item| Recommendation::untitled(item.item_id, item.mean_rating))
            .collect()
    }

    pub fn table(&self) -> &[PopularItem] {
        &self.table
    }

    pub fn min_ratings(&self) -> usize {
        self.min_ratings
    }
}
