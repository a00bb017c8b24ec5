use ndarray::{Array2, Axis};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::RecommendResult,
    models::{ItemCatalog, ItemId, Rating, Recommendation, UserId},
};

use super::matrix::{by_score_desc, top_n, UserHistory, UserItemMatrix};

/// Item-based collaborative filtering over cosine similarity
///
/// Similarities are computed between the zero-filled item columns of the
/// user x item matrix, so items sharing few raters score low even when those
/// raters agree.
#[derive(Debug, Clone)]
pub struct ItemSimilarityModel {
    neighborhood_size: usize,
    matrix: Arc<UserItemMatrix>,
    similarity: Array2<f64>,
    /// Per item column: the `neighborhood_size` most similar other items
    neighbors: Vec<Vec<(ItemId, f64)>>,
}

impl ItemSimilarityModel {
    pub fn fit(ratings: &[Rating], neighborhood_size: usize) -> RecommendResult<Self> {
        let matrix = UserItemMatrix::from_ratings(ratings)?;
        Ok(Self::fit_matrix(Arc::new(matrix), neighborhood_size))
    }

    /// Fits on an already pivoted matrix, which may be shared with other models
    pub fn fit_matrix(matrix: Arc<UserItemMatrix>, neighborhood_size: usize) -> Self {
        let start = Instant::now();
        let similarity = cosine_similarity(matrix.values());
        let neighbors = nearest_neighbors(&similarity, matrix.item_ids(), neighborhood_size);

        let (users, items) = matrix.shape();
        tracing::info!(
            users,
            items,
            neighborhood_size,
            elapsed_ms = start.elapsed().as_millis(),
            "Fitted item similarity model"
        );

        Self {
            neighborhood_size,
            matrix,
            similarity,
            neighbors,
        }
    }

    /// Cosine similarity between two fitted items
    pub fn similarity(&self, a: ItemId, b: ItemId) -> Option<f64> {
        let i = self.matrix.item_index(a)?;
        let j = self.matrix.item_index(b)?;
        Some(self.similarity[[i, j]])
    }

    /// Most similar other items, best first; empty for items unseen at fit time
    pub fn similar_items(&self, item_id: ItemId) -> &[(ItemId, f64)] {
        match self.matrix.item_index(item_id) {
            Some(idx) => &self.neighbors[idx],
            None => &[],
        }
    }

    pub fn similarity_matrix(&self) -> &Array2<f64> {
        &self.similarity
    }

    pub fn item_ids(&self) -> &[ItemId] {
        self.matrix.item_ids()
    }

    pub fn neighborhood_size(&self) -> usize {
        self.neighborhood_size
    }

    /// Ranks unseen items by the mean of `rating * similarity` contributions
    /// from the user's rated items that list them as neighbours.
    ///
    /// The mean is unweighted: a candidate reached by many weak neighbours
    /// can outrank one reached by a single strong neighbour. Users without
    /// ratings get an empty list.
    pub fn recommend(
        &self,
        user_id: UserId,
        ratings: &[Rating],
        items: &ItemCatalog,
        n: usize,
    ) -> Vec<Recommendation> {
        let history = UserHistory::collect(ratings, user_id);
        if history.is_empty() {
            tracing::debug!(user_id, "No rating history, nothing to aggregate");
            return Vec::new();
        }

        let mut contributions: HashMap<ItemId, Vec<f64>> = HashMap::new();
        for (item_id, rating) in &history.rated {
            let neighbors = self.similar_items(*item_id);
            if neighbors.is_empty() {
                tracing::debug!(user_id, item_id, "Item has no neighbours");
                continue;
            }

            for (candidate, sim) in neighbors {
                if history.seen.contains(candidate) {
                    continue;
                }
                contributions
                    .entry(*candidate)
                    .or_default()
                    .push(rating * sim);
            }
        }

        let scored: Vec<(ItemId, f64)> = contributions
            .into_iter()
            .map(|(item_id, values)| {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                (item_id, mean)
            })
            .collect();

        top_n(scored, n)
            .into_iter()
            .map(|(item_id, score)| items.recommendation(item_id, score))
            .collect()
    }
}

/// Cosine similarity between the columns of `values`
///
/// Zero columns get similarity 0 to everything else. The result is exactly
/// symmetric with a unit diagonal and entries clamped to [-1, 1].
fn cosine_similarity(values: &Array2<f64>) -> Array2<f64> {
    let norms = values.map_axis(Axis(0), |col| col.dot(&col).sqrt());

    let mut normalized = values.clone();
    for (mut col, norm) in normalized.axis_iter_mut(Axis(1)).zip(norms.iter()) {
        if *norm > 0.0 {
            col.mapv_inplace(|v| v / norm);
        }
    }

    let mut similarity = normalized.t().dot(&normalized);
    let size = similarity.nrows();
    for i in 0..size {
        similarity[[i, i]] = 1.0;
        for j in (i + 1)..size {
            let sim = similarity[[i, j]].clamp(-1.0, 1.0);
            similarity[[i, j]] = sim;
            similarity[[j, i]] = sim;
        }
    }

    similarity
}

/// The `k` most similar items per column, never including the item itself
fn nearest_neighbors(
    similarity: &Array2<f64>,
    item_ids: &[ItemId],
    k: usize,
) -> Vec<Vec<(ItemId, f64)>> {
    similarity
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(i, row)| {
            let mut others: Vec<(ItemId, f64)> = row
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, sim)| (item_ids[j], *sim))
                .collect();
            others.sort_by(by_score_desc);
            others.truncate(k);
            others
        })
        .collect()
}
