use nalgebra::DMatrix;
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::{RecommendError, RecommendResult},
    models::{ItemCatalog, ItemId, Rating, Recommendation, UserId},
};

use super::matrix::{top_n, UserHistory, UserItemMatrix};

const MIN_RATING: f64 = 1.0;
const MAX_RATING: f64 = 5.0;

/// Extra random directions sampled beyond the target rank
const OVERSAMPLES: usize = 10;

/// Low-rank factorization recommender
///
/// Fits a truncated SVD `R ~ U S V^T` of the zero-filled user x item matrix
/// and keeps `U S` as user factors and `V` as item factors. Predictions for
/// ids unseen at fit time fall back to the global mean rating.
#[derive(Debug, Clone)]
pub struct FactorizationModel {
    n_factors: usize,
    matrix: Arc<UserItemMatrix>,
    user_factors: Array2<f64>,
    item_factors: Array2<f64>,
    global_mean: f64,
}

impl FactorizationModel {
    pub fn fit(ratings: &[Rating], n_factors: usize, random_state: u64) -> RecommendResult<Self> {
        let matrix = UserItemMatrix::from_ratings(ratings)?;
        Self::fit_matrix(Arc::new(matrix), n_factors, random_state)
    }

    /// Fits on an already pivoted matrix, which may be shared with other models
    pub fn fit_matrix(
        matrix: Arc<UserItemMatrix>,
        n_factors: usize,
        random_state: u64,
    ) -> RecommendResult<Self> {
        let start = Instant::now();
        let global_mean = matrix.global_mean();

        let (users, items) = matrix.shape();
        let rank = n_factors.max(1).min(users.min(items));
        if rank != n_factors {
            tracing::warn!(
                requested = n_factors,
                rank,
                users,
                items,
                "Clamped factor count to matrix dimensions"
            );
        }

        let (user_factors, item_factors) = truncated_svd(matrix.values(), rank, random_state)?;

        tracing::info!(
            users,
            items,
            rank,
            global_mean,
            elapsed_ms = start.elapsed().as_millis(),
            "Fitted factorization model"
        );

        Ok(Self {
            n_factors: rank,
            matrix,
            user_factors,
            item_factors,
            global_mean,
        })
    }

    /// Predicted rating in [1, 5]
    pub fn predict(&self, user_id: UserId, item_id: ItemId) -> f64 {
        match (self.matrix.user_index(user_id), self.matrix.item_index(item_id)) {
            (Some(u), Some(i)) => self.score(u, i),
            _ => self.global_mean,
        }
    }

    fn score(&self, user_idx: usize, item_idx: usize) -> f64 {
        clamp_rating(
            self.user_factors
                .row(user_idx)
                .dot(&self.item_factors.row(item_idx)),
        )
    }

    /// Ranks every fitted item the user has not rated by predicted rating
    ///
    /// Cost is linear in the catalog size per call.
    pub fn recommend(
        &self,
        user_id: UserId,
        ratings: &[Rating],
        items: &ItemCatalog,
        n: usize,
    ) -> Vec<Recommendation> {
        let history = UserHistory::collect(ratings, user_id);
        let user_idx = self.matrix.user_index(user_id);
        if user_idx.is_none() {
            tracing::debug!(user_id, "User unseen at fit time, using global mean");
        }

        let scored: Vec<(ItemId, f64)> = self
            .matrix
            .item_ids()
            .iter()
            .enumerate()
            .filter(|(_, item_id)| !history.seen.contains(*item_id))
            .map(|(i, item_id)| {
                let score = match user_idx {
                    Some(u) => self.score(u, i),
                    None => self.global_mean,
                };
                (*item_id, score)
            })
            .collect();

        top_n(scored, n)
            .into_iter()
            .map(|(item_id, score)| items.recommendation(item_id, score))
            .collect()
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    pub fn n_factors(&self) -> usize {
        self.n_factors
    }

    /// users x k
    pub fn user_factors(&self) -> &Array2<f64> {
        &self.user_factors
    }

    /// items x k
    pub fn item_factors(&self) -> &Array2<f64> {
        &self.item_factors
    }
}

fn clamp_rating(value: f64) -> f64 {
    value.clamp(MIN_RATING, MAX_RATING)
}

/// Randomized truncated SVD of `a` (m x n) to `rank` components
///
/// Projects `a` onto a seeded random subspace refined by power iterations,
/// then decomposes the small projected matrix exactly. Returns `(U S, V)`.
fn truncated_svd(
    a: &Array2<f64>,
    rank: usize,
    seed: u64,
) -> RecommendResult<(Array2<f64>, Array2<f64>)> {
    let (m, n) = a.dim();
    let width = (rank + OVERSAMPLES).min(m.min(n));
    // Fewer passes once the rank is a sizeable share of the matrix
    let power_iterations = if rank * 10 < m.min(n) { 7 } else { 4 };

    let mut rng = StdRng::seed_from_u64(seed);
    let omega = Array2::from_shape_fn((n, width), |_| rng.gen_range(-1.0..1.0));

    let mut q = orthonormal_basis(&a.dot(&omega));
    for _ in 0..power_iterations {
        let z = orthonormal_basis(&a.t().dot(&q));
        q = orthonormal_basis(&a.dot(&z));
    }

    // a ~ q b, with b small enough to decompose directly
    let b = to_dmatrix(&q.t().dot(a));
    let svd = b.svd(true, true);
    let (Some(u_b), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(RecommendError::Internal(
            "SVD of the projected matrix returned no singular vectors".to_string(),
        ));
    };
    let sigma = svd.singular_values;

    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|x, y| sigma[*y].total_cmp(&sigma[*x]));
    order.truncate(rank);

    let u_b = from_dmatrix(&u_b);
    let v_t = from_dmatrix(&v_t);

    let mut user_factors = Array2::<f64>::zeros((m, rank));
    let mut item_factors = Array2::<f64>::zeros((n, rank));

    for (component, &idx) in order.iter().enumerate() {
        let u = q.dot(&u_b.column(idx));
        user_factors.column_mut(component).assign(&(&u * sigma[idx]));
        item_factors.column_mut(component).assign(&v_t.row(idx));
    }

    Ok((user_factors, item_factors))
}

/// Orthonormal basis for the column space of `m` via Householder QR
fn orthonormal_basis(m: &Array2<f64>) -> Array2<f64> {
    from_dmatrix(&to_dmatrix(m).qr().q())
}

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn from_dmatrix(d: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((d.nrows(), d.ncols()), |(i, j)| d[(i, j)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use ndarray::array;

    fn ratings() -> Vec<Rating> {
        vec![
            Rating::new(1, 1, 5.0, 0),
            Rating::new(1, 2, 3.0, 0),
            Rating::new(1, 3, 4.0, 0),
            Rating::new(2, 1, 4.0, 0),
            Rating::new(2, 2, 2.0, 0),
            Rating::new(2, 4, 5.0, 0),
            Rating::new(3, 2, 5.0, 0),
            Rating::new(3, 3, 1.0, 0),
            Rating::new(3, 4, 4.0, 0),
            Rating::new(4, 1, 2.0, 0),
            Rating::new(4, 4, 3.0, 0),
        ]
    }

    #[test]
    fn test_full_rank_reconstructs_rated_cells() {
        let model = FactorizationModel::fit(&ratings(), 4, 42).unwrap();
        assert_eq!(model.n_factors(), 4);

        for r in ratings() {
            let predicted = model.predict(r.user_id, r.item_id);
            assert!(
                (predicted - r.rating).abs() < 1e-6,
                "user {} item {}: {} vs {}",
                r.user_id,
                r.item_id,
                predicted,
                r.rating
            );
        }
    }

    #[test]
    fn test_rank_one_matrix_recovered_with_one_factor() {
        // Outer product of (1, 2) and (1, 2, 2)
        let ratings = vec![
            Rating::new(1, 1, 1.0, 0),
            Rating::new(1, 2, 2.0, 0),
            Rating::new(1, 3, 2.0, 0),
            Rating::new(2, 1, 2.0, 0),
            Rating::new(2, 2, 4.0, 0),
            Rating::new(2, 3, 4.0, 0),
        ];
        let model = FactorizationModel::fit(&ratings, 1, 7).unwrap();

        for r in &ratings {
            assert!((model.predict(r.user_id, r.item_id) - r.rating).abs() < 1e-9);
        }
    }

    #[test]
    fn test_predict_within_bounds_and_falls_back_to_global_mean() {
        let model = FactorizationModel::fit(&ratings(), 2, 42).unwrap();
        let mean = 38.0 / 11.0;
        assert!((model.global_mean() - mean).abs() < 1e-12);

        for user_id in 0..7 {
            for item_id in 0..7 {
                let p = model.predict(user_id, item_id);
                assert!((1.0..=5.0).contains(&p));
            }
        }

        assert_eq!(model.predict(99, 1), model.global_mean());
        assert_eq!(model.predict(1, 99), model.global_mean());
    }

    #[test]
    fn test_factor_count_clamped_to_matrix_size() {
        let model = FactorizationModel::fit(&ratings(), 50, 42).unwrap();
        assert_eq!(model.n_factors(), 4);
        assert_eq!(model.user_factors().dim(), (4, 4));
        assert_eq!(model.item_factors().dim(), (4, 4));
    }

    #[test]
    fn test_fit_is_reproducible_for_a_seed() {
        let a = FactorizationModel::fit(&ratings(), 2, 42).unwrap();
        let b = FactorizationModel::fit(&ratings(), 2, 42).unwrap();
        assert_eq!(a.user_factors(), b.user_factors());
        assert_eq!(a.item_factors(), b.item_factors());
    }

    #[test]
    fn test_recommend_skips_rated_items() {
        let model = FactorizationModel::fit(&ratings(), 2, 42).unwrap();
        let catalog = ItemCatalog::new(&[Item::new(4, "Get Shorty (1995)")]);

        let recs = model.recommend(1, &ratings(), &catalog, 5);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].item_id, 4);
        assert_eq!(recs[0].title.as_deref(), Some("Get Shorty (1995)"));
        assert_eq!(recs[0].score, model.predict(1, 4));
    }

    #[test]
    fn test_new_user_gets_global_mean_ranking() {
        let model = FactorizationModel::fit(&ratings(), 2, 42).unwrap();
        let recs = model.recommend(500, &ratings(), &ItemCatalog::default(), 3);

        let ids: Vec<ItemId> = recs.iter().map(|r| r.item_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(recs.iter().all(|r| r.score == model.global_mean()));
    }

    #[test]
    fn test_orthonormal_basis_spans_columns() {
        // Second column is twice the first
        let m = array![[1.0, 2.0, 0.0], [1.0, 2.0, 1.0], [0.0, 0.0, 1.0], [2.0, 4.0, 3.0]];
        let q = orthonormal_basis(&m);
        assert_eq!(q.dim(), (4, 3));

        let gram = q.t().dot(&q);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-12);
            }
        }

        // Projecting onto the basis leaves the original columns unchanged
        let projected = q.dot(&q.t().dot(&m));
        for (x, y) in projected.iter().zip(m.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_matrix_shares_pivot() {
        let matrix = Arc::new(UserItemMatrix::from_ratings(&ratings()).unwrap());
        let model = FactorizationModel::fit_matrix(Arc::clone(&matrix), 2, 42).unwrap();
        let owned = FactorizationModel::fit(&ratings(), 2, 42).unwrap();

        assert_eq!(Arc::strong_count(&matrix), 2);
        assert_eq!(model.global_mean(), matrix.global_mean());
        assert_eq!(model.user_factors(), owned.user_factors());
    }

    #[test]
    fn test_empty_ratings_cannot_fit() {
        assert!(FactorizationModel::fit(&[], 2, 42).is_err());
    }

    #[test]
    fn test_item_factors_are_orthonormal() {
        let model = FactorizationModel::fit(&ratings(), 3, 42).unwrap();
        let gram = model.item_factors().t().dot(model.item_factors());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-8);
            }
        }
    }
}
