use std::sync::Arc;

use crate::{
    config::ModelSettings,
    error::RecommendResult,
    models::{ItemCatalog, Method, Rating, Recommendation, Strategy, UserId},
};

use super::{
    factorization::FactorizationModel,
    matrix::{count_user_ratings, UserItemMatrix},
    popularity::PopularityRanker,
    similarity::ItemSimilarityModel,
};

/// Default history size from which `auto` picks collaborative filtering
pub const AUTO_MIN_HISTORY: usize = 5;

/// Routes each request to one of the three fitted strategies
///
/// Holds no mutable state: routing reads the fitted models and the rating
/// table passed in with the request.
#[derive(Debug, Clone)]
pub struct HybridDispatcher {
    svd: FactorizationModel,
    collaborative: ItemSimilarityModel,
    popularity: PopularityRanker,
    auto_min_history: usize,
}

impl HybridDispatcher {
    pub fn new(
        svd: FactorizationModel,
        collaborative: ItemSimilarityModel,
        popularity: PopularityRanker,
    ) -> Self {
        Self {
            svd,
            collaborative,
            popularity,
            auto_min_history: AUTO_MIN_HISTORY,
        }
    }

    pub fn with_auto_min_history(mut self, auto_min_history: usize) -> Self {
        self.auto_min_history = auto_min_history;
        self
    }

    /// Fits all three strategies on the same rating table
    ///
    /// The table is validated and pivoted once; both matrix models share the
    /// pivot. Fails as a whole if any strategy cannot be fitted.
    pub fn fit(ratings: &[Rating], settings: &ModelSettings) -> RecommendResult<Self> {
        let matrix = Arc::new(UserItemMatrix::from_ratings(ratings)?);

        let popularity = PopularityRanker::rank(ratings, settings.min_ratings);
        let collaborative =
            ItemSimilarityModel::fit_matrix(Arc::clone(&matrix), settings.neighborhood_size);
        let svd = FactorizationModel::fit_matrix(matrix, settings.n_factors, settings.random_state)?;

        Ok(Self::new(svd, collaborative, popularity)
            .with_auto_min_history(settings.auto_min_history))
    }

    /// The concrete strategy a method maps to for this user
    pub fn resolve(&self, user_id: UserId, ratings: &[Rating], method: Method) -> Strategy {
        match method {
            Method::Explicit(strategy) => strategy,
            Method::Auto => {
                let history = count_user_ratings(ratings, user_id);
                let strategy = if history >= self.auto_min_history {
                    Strategy::Collaborative
                } else {
                    Strategy::Popularity
                };
                tracing::debug!(user_id, history, %strategy, "Resolved auto method");
                strategy
            }
        }
    }

    pub fn recommend(
        &self,
        user_id: UserId,
        ratings: &[Rating],
        items: &ItemCatalog,
        n: usize,
        method: Method,
    ) -> (Vec<Recommendation>, Strategy) {
        let strategy = self.resolve(user_id, ratings, method);

        let recommendations = match strategy {
            Strategy::Collaborative => self.collaborative.recommend(user_id, ratings, items, n),
            Strategy::Popularity => items.attach_titles(self.popularity.recommend(user_id, n)),
            Strategy::Svd => self.svd.recommend(user_id, ratings, items, n),
        };

        (recommendations, strategy)
    }

    /// Same as [`recommend`](Self::recommend) with the method given by name
    pub fn recommend_by_name(
        &self,
        user_id: UserId,
        ratings: &[Rating],
        items: &ItemCatalog,
        n: usize,
        method: &str,
    ) -> RecommendResult<(Vec<Recommendation>, Strategy)> {
        let method: Method = method.parse()?;
        Ok(self.recommend(user_id, ratings, items, n, method))
    }

    pub fn svd(&self) -> &FactorizationModel {
        &self.svd
    }

    pub fn collaborative(&self) -> &ItemSimilarityModel {
        &self.collaborative
    }

    pub fn popularity(&self) -> &PopularityRanker {
        &self.popularity
    }
}
