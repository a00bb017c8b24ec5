use std::sync::Arc;

use movielens_recommender::{
    services::{MovieLensSource, RecommenderService},
    Config,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    tracing::info!(data_dir = %config.data_dir, "Starting movie recommender");

    let source = Arc::new(MovieLensSource::new(&config.data_dir));
    let service = RecommenderService::load(source, config.model_settings()).await?;

    let stats = service.stats().await;
    tracing::info!(
        users = stats.total_users,
        items = stats.total_items,
        ratings = stats.total_ratings,
        mean_ratings_per_user = stats.mean_ratings_per_user,
        mean_rating = stats.mean_rating,
        "Dataset statistics"
    );

    let health = service.health().await;
    tracing::info!(
        status = health.status,
        fit_id = %health.fit_id,
        fitted_at = %health.fitted_at,
        "Models ready"
    );

    Ok(())
}
