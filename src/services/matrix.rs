use ndarray::Array2;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    error::{RecommendError, RecommendResult},
    models::{ItemId, Rating, UserId},
};

/// Checks that a rating table can be fitted on
///
/// Ids must be at least 1 and ratings finite values in [1, 5].
pub fn validate_ratings(ratings: &[Rating]) -> RecommendResult<()> {
    if ratings.is_empty() {
        return Err(RecommendError::EmptyRatings);
    }

    for r in ratings {
        let valid = r.user_id >= 1
            && r.item_id >= 1
            && r.rating.is_finite()
            && (1.0..=5.0).contains(&r.rating);
        if !valid {
            return Err(RecommendError::InvalidRating {
                user_id: r.user_id,
                item_id: r.item_id,
                rating: r.rating,
            });
        }
    }

    Ok(())
}

/// Dense user x item rating matrix
///
/// Rows are the distinct user ids of the fitted ratings and columns the
/// distinct item ids, both ascending. Unrated cells hold 0.0 rather than a
/// missing marker, which makes downstream similarities and factors treat
/// "not rated" as a low rating.
#[derive(Debug, Clone)]
pub struct UserItemMatrix {
    user_ids: Vec<UserId>,
    item_ids: Vec<ItemId>,
    user_index: HashMap<UserId, usize>,
    item_index: HashMap<ItemId, usize>,
    values: Array2<f64>,
    global_mean: f64,
}

impl UserItemMatrix {
    pub fn from_ratings(ratings: &[Rating]) -> RecommendResult<Self> {
        validate_ratings(ratings)?;

        let user_ids: Vec<UserId> = ratings
            .iter()
            .map(|r| r.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let item_ids: Vec<ItemId> = ratings
            .iter()
            .map(|r| r.item_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let user_index: HashMap<UserId, usize> =
            user_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let item_index: HashMap<ItemId, usize> =
            item_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut values = Array2::<f64>::zeros((user_ids.len(), item_ids.len()));
        let mut seen: HashSet<(UserId, ItemId)> = HashSet::with_capacity(ratings.len());

        for r in ratings {
            if !seen.insert((r.user_id, r.item_id)) {
                return Err(RecommendError::DuplicateRating {
                    user_id: r.user_id,
                    item_id: r.item_id,
                });
            }
            values[[user_index[&r.user_id], item_index[&r.item_id]]] = r.rating;
        }

        let global_mean = ratings.iter().map(|r| r.rating).sum::<f64>() / ratings.len() as f64;

        Ok(Self {
            user_ids,
            item_ids,
            user_index,
            item_index,
            values,
            global_mean,
        })
    }

    pub fn user_index(&self, user_id: UserId) -> Option<usize> {
        self.user_index.get(&user_id).copied()
    }

    pub fn item_index(&self, item_id: ItemId) -> Option<usize> {
        self.item_index.get(&item_id).copied()
    }

    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Mean of the observed ratings, ignoring unrated cells
    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    /// (users, items)
    pub fn shape(&self) -> (usize, usize) {
        (self.user_ids.len(), self.item_ids.len())
    }
}

/// A user's ratings in table order, plus the set of rated items
#[derive(Debug, Clone, Default)]
pub struct UserHistory {
    pub rated: Vec<(ItemId, f64)>,
    pub seen: HashSet<ItemId>,
}

impl UserHistory {
    pub fn collect(ratings: &[Rating], user_id: UserId) -> Self {
        let rated: Vec<(ItemId, f64)> = ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| (r.item_id, r.rating))
            .collect();
        let seen = rated.iter().map(|(item_id, _)| *item_id).collect();

        Self { rated, seen }
    }

    pub fn is_empty(&self) -> bool {
        self.rated.is_empty()
    }
}

/// Number of ratings a user has in the table
pub fn count_user_ratings(ratings: &[Rating], user_id: UserId) -> usize {
    ratings.iter().filter(|r| r.user_id == user_id).count()
}

/// Score descending, then item id ascending
pub fn by_score_desc(a: &(ItemId, f64), b: &(ItemId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Sorts scored items with [`by_score_desc`] and keeps the first `n`
pub fn top_n(mut scored: Vec<(ItemId, f64)>, n: usize) -> Vec<(ItemId, f64)> {
    scored.sort_by(by_score_desc);
    scored.truncate(n);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ratings() -> Vec<Rating> {
        vec![
            Rating::new(2, 30, 4.0, 0),
            Rating::new(1, 10, 5.0, 0),
            Rating::new(1, 20, 4.0, 0),
            Rating::new(2, 10, 3.0, 0),
        ]
    }

    #[test]
    fn test_matrix_indexes_distinct_sorted_ids() {
        let matrix = UserItemMatrix::from_ratings(&sample_ratings()).unwrap();

        assert_eq!(matrix.user_ids(), &[1, 2]);
        assert_eq!(matrix.item_ids(), &[10, 20, 30]);
        assert_eq!(matrix.shape(), (2, 3));
        assert_eq!(matrix.user_index(2), Some(1));
        assert_eq!(matrix.item_index(30), Some(2));
        assert_eq!(matrix.item_index(99), None);
    }

    #[test]
    fn test_matrix_zero_fills_unrated_cells() {
        let matrix = UserItemMatrix::from_ratings(&sample_ratings()).unwrap();
        let values = matrix.values();

        assert_eq!(values[[0, 0]], 5.0);
        assert_eq!(values[[0, 2]], 0.0);
        assert_eq!(values[[1, 1]], 0.0);
        assert_eq!(values[[1, 2]], 4.0);
    }

    #[test]
    fn test_global_mean_ignores_unrated_cells() {
        let matrix = UserItemMatrix::from_ratings(&sample_ratings()).unwrap();
        assert_eq!(matrix.global_mean(), 4.0);
    }

    #[test]
    fn test_empty_ratings_cannot_fit() {
        let err = UserItemMatrix::from_ratings(&[]).unwrap_err();
        assert!(matches!(err, RecommendError::EmptyRatings));
    }

    #[test]
    fn test_out_of_range_rating_rejected() {
        let ratings = vec![Rating::new(1, 1, 6.0, 0)];
        let err = validate_ratings(&ratings).unwrap_err();
        assert!(matches!(err, RecommendError::InvalidRating { item_id: 1, .. }));

        let ratings = vec![Rating::new(0, 1, 3.0, 0)];
        assert!(validate_ratings(&ratings).is_err());

        let ratings = vec![Rating::new(1, 1, f64::NAN, 0)];
        assert!(validate_ratings(&ratings).is_err());
    }

    #[test]
    fn test_duplicate_rating_rejected() {
        let ratings = vec![Rating::new(1, 1, 3.0, 0), Rating::new(1, 1, 4.0, 1)];
        let err = UserItemMatrix::from_ratings(&ratings).unwrap_err();
        assert!(matches!(
            err,
            RecommendError::DuplicateRating { user_id: 1, item_id: 1 }
        ));
    }

    #[test]
    fn test_user_history() {
        let history = UserHistory::collect(&sample_ratings(), 1);
        assert_eq!(history.rated, vec![(10, 5.0), (20, 4.0)]);
        assert!(history.seen.contains(&20));
        assert!(UserHistory::collect(&sample_ratings(), 7).is_empty());
        assert_eq!(count_user_ratings(&sample_ratings(), 2), 2);
    }

    #[test]
    fn test_top_n_breaks_ties_by_item_id() {
        let scored = vec![(30, 4.0), (20, 4.5), (10, 4.0), (40, 1.0)];
        assert_eq!(top_n(scored.clone(), 3), vec![(20, 4.5), (10, 4.0), (30, 4.0)]);
        assert_eq!(top_n(scored, 10).len(), 4);
    }
}
