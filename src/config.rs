use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Directory holding the MovieLens `u.data` and `u.item` files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Minimum number of ratings an item needs to be ranked by popularity
    #[serde(default = "default_min_ratings")]
    pub min_ratings: usize,

    /// Number of neighbours kept per item by the similarity model
    #[serde(default = "default_neighborhood_size")]
    pub neighborhood_size: usize,

    /// Latent dimensions of the factorization model
    #[serde(default = "default_n_factors")]
    pub n_factors: usize,

    /// Seed for the factorization's random projection
    #[serde(default = "default_random_state")]
    pub random_state: u64,

    /// History size from which `auto` routes a user to collaborative filtering
    #[serde(default = "default_auto_min_history")]
    pub auto_min_history: usize,

    /// Upper bound on `n` accepted per request
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

fn default_data_dir() -> String {
    "ml-100k".to_string()
}

fn default_min_ratings() -> usize {
    50
}

fn default_neighborhood_size() -> usize {
    20
}

fn default_n_factors() -> usize {
    50
}

fn default_random_state() -> u64 {
    42
}

fn default_auto_min_history() -> usize {
    5
}

fn default_max_recommendations() -> usize {
    20
}

/// Model hyperparameters shared by every strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSettings {
    pub min_ratings: usize,
    pub neighborhood_size: usize,
    pub n_factors: usize,
    pub random_state: u64,
    pub auto_min_history: usize,
    pub max_recommendations: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            min_ratings: default_min_ratings(),
            neighborhood_size: default_neighborhood_size(),
            n_factors: default_n_factors(),
            random_state: default_random_state(),
            auto_min_history: default_auto_min_history(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            min_ratings: self.min_ratings,
            neighborhood_size: self.neighborhood_size,
            n_factors: self.n_factors,
            random_state: self.random_state,
            auto_min_history: self.auto_min_history,
            max_recommendations: self.max_recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_env() {
        let vars: Vec<(String, String)> = Vec::new();
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.data_dir, "ml-100k");
        assert_eq!(config.model_settings(), ModelSettings::default());
    }

    #[test]
    fn test_overrides_from_env() {
        let vars = vec![
            ("DATA_DIR".to_string(), "/data/ml".to_string()),
            ("MIN_RATINGS".to_string(), "10".to_string()),
            ("N_FACTORS".to_string(), "8".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.data_dir, "/data/ml");
        let settings = config.model_settings();
        assert_eq!(settings.min_ratings, 10);
        assert_eq!(settings.n_factors, 8);
        assert_eq!(settings.neighborhood_size, 20);
    }
}
