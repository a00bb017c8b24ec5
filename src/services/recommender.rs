use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::ModelSettings,
    error::{RecommendError, RecommendResult},
    models::{
        DatasetStats, ItemCatalog, Method, Rating, RecommendationRequest, RecommendationResponse,
        ServiceHealth,
    },
};

use super::{
    hybrid::HybridDispatcher,
    sources::{Dataset, RatingSource},
};

/// One immutable generation of fitted models and the data they were fitted on
#[derive(Debug)]
pub struct ModelSnapshot {
    pub fit_id: Uuid,
    pub fitted_at: DateTime<Utc>,
    dataset: Dataset,
    catalog: ItemCatalog,
    hybrid: HybridDispatcher,
}

impl ModelSnapshot {
    pub fn fit(dataset: Dataset, settings: &ModelSettings) -> RecommendResult<Self> {
        let start = Instant::now();
        let hybrid = HybridDispatcher::fit(&dataset.ratings, settings)?;
        let catalog = ItemCatalog::new(&dataset.items);
        let fit_id = Uuid::new_v4();

        tracing::info!(
            fit_id = %fit_id,
            ratings = dataset.ratings.len(),
            items = catalog.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Model snapshot fitted"
        );

        Ok(Self {
            fit_id,
            fitted_at: Utc::now(),
            dataset,
            catalog,
            hybrid,
        })
    }

    pub fn ratings(&self) -> &[Rating] {
        &self.dataset.ratings
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn hybrid(&self) -> &HybridDispatcher {
        &self.hybrid
    }

    pub fn stats(&self) -> DatasetStats {
        DatasetStats::from_ratings(&self.dataset.ratings, &self.dataset.items)
    }
}

/// Serves recommendations from the current model snapshot
///
/// Readers clone the `Arc` of the current snapshot and never hold the lock
/// while scoring. A refit builds a complete new snapshot off the async
/// runtime and swaps it in only when fitting succeeded.
#[derive(Clone)]
pub struct RecommenderService {
    source: Arc<dyn RatingSource>,
    settings: ModelSettings,
    snapshot: Arc<RwLock<Arc<ModelSnapshot>>>,
}

impl RecommenderService {
    /// Loads the dataset from `source` and fits the initial snapshot
    pub async fn load(
        source: Arc<dyn RatingSource>,
        settings: ModelSettings,
    ) -> RecommendResult<Self> {
        tracing::info!(source = source.name(), "Loading recommender models");
        let snapshot = Self::fit_snapshot(source.as_ref(), settings).await?;

        Ok(Self {
            source,
            settings,
            snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
        })
    }

    async fn fit_snapshot(
        source: &dyn RatingSource,
        settings: ModelSettings,
    ) -> RecommendResult<ModelSnapshot> {
        let dataset = source.load().await?;
        tokio::task::spawn_blocking(move || ModelSnapshot::fit(dataset, &settings))
            .await
            .map_err(|e| RecommendError::Internal(e.to_string()))?
    }

    /// Reloads the source and replaces the snapshot
    ///
    /// On failure the previous snapshot keeps serving.
    pub async fn refit(&self) -> RecommendResult<Uuid> {
        let fresh = match Self::fit_snapshot(self.source.as_ref(), self.settings).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Refit failed, keeping current snapshot");
                return Err(e);
            }
        };

        let fit_id = fresh.fit_id;
        let previous = {
            let mut current = self.snapshot.write().await;
            std::mem::replace(&mut *current, Arc::new(fresh))
        };

        tracing::info!(
            previous_fit_id = %previous.fit_id,
            fit_id = %fit_id,
            "Swapped in refitted snapshot"
        );

        Ok(fit_id)
    }

    /// The snapshot currently being served
    pub async fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.snapshot.read().await.clone()
    }

    #[tracing::instrument(skip(self, request), fields(user_id = request.user_id, n = request.n, method = %request.method))]
    pub async fn recommend(
        &self,
        request: RecommendationRequest,
    ) -> RecommendResult<RecommendationResponse> {
        if request.n == 0 || request.n > self.settings.max_recommendations {
            return Err(RecommendError::InvalidInput(format!(
                "n must be between 1 and {}, got {}",
                self.settings.max_recommendations, request.n
            )));
        }
        let method: Method = request.method.parse()?;

        let snapshot = self.snapshot().await;
        let ratings = snapshot.ratings();
        if !ratings.iter().any(|r| r.user_id == request.user_id) {
            return Err(RecommendError::UserNotFound(request.user_id));
        }

        let (recommendations, method_used) = snapshot.hybrid().recommend(
            request.user_id,
            ratings,
            snapshot.catalog(),
            request.n,
            method,
        );

        tracing::info!(
            fit_id = %snapshot.fit_id,
            count = recommendations.len(),
            method_used = %method_used,
            "Recommendations generated"
        );

        Ok(RecommendationResponse {
            user_id: request.user_id,
            method_used,
            total: recommendations.len(),
            recommendations,
        })
    }

    pub async fn stats(&self) -> DatasetStats {
        self.snapshot().await.stats()
    }

    pub async fn health(&self) -> ServiceHealth {
        let snapshot = self.snapshot().await;
        ServiceHealth {
            status: "healthy",
            total_ratings: snapshot.ratings().len(),
            total_items: snapshot.catalog().len(),
            fit_id: snapshot.fit_id,
            fitted_at: snapshot.fitted_at,
        }
    }
}
