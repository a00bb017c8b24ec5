use crate::{error::RecommendResult, models::Rating};

use super::{Dataset, RatingSource};

/// Serves a dataset that was parsed elsewhere
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    dataset: Dataset,
}

impl InMemorySource {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn from_ratings(ratings: Vec<Rating>) -> Self {
        Self::new(Dataset {
            ratings,
            items: Vec::new(),
        })
    }
}

#[async_trait::async_trait]
impl RatingSource for InMemorySource {
    async fn load(&self) -> RecommendResult<Dataset> {
        Ok(self.dataset.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    #[test]
    fn test_load_returns_copy_of_dataset() {
        let dataset = Dataset {
            ratings: vec![Rating::new(1, 1, 4.0, 0)],
            items: vec![Item::new(1, "Toy Story (1995)")],
        };
        let source = InMemorySource::new(dataset.clone());

        let loaded = tokio_test::block_on(source.load()).unwrap();
        assert_eq!(loaded, dataset);
        assert_eq!(source.name(), "memory");
    }
}
