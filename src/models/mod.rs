use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod recommendation;
pub mod stats;

pub use recommendation::{
    Method, Recommendation, RecommendationRequest, RecommendationResponse, Strategy,
};
pub use stats::{DatasetStats, ServiceHealth};

pub type UserId = u32;
pub type ItemId = u32;

/// A single historical rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: f64,
    /// Seconds since the Unix epoch, carried for provenance only
    pub timestamp: i64,
}

impl Rating {
    pub fn new(user_id: UserId, item_id: ItemId, rating: f64, timestamp: i64) -> Self {
        Self {
            user_id,
            item_id,
            rating,
            timestamp,
        }
    }

    /// When the rating was given, if the timestamp is representable
    pub fn rated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0)
    }
}

/// Movie metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    /// Genre tags, not used by any current strategy
    #[serde(default)]
    pub genres: Vec<String>,
}

impl Item {
    pub fn new(item_id: ItemId, title: impl Into<String>) -> Self {
        Self {
            item_id,
            title: title.into(),
            release_date: None,
            genres: Vec::new(),
        }
    }
}

/// Item metadata indexed by id
///
/// Strategies rank item ids only; titles are attached afterwards with
/// left-join semantics, so an id without metadata keeps a `None` title.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: HashMap<ItemId, Item>,
}

impl ItemCatalog {
    pub fn new(items: &[Item]) -> Self {
        Self {
            items: items.iter().map(|item| (item.item_id, item.clone())).collect(),
        }
    }

    pub fn title(&self, item_id: ItemId) -> Option<&str> {
        self.items.get(&item_id).map(|item| item.title.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Builds a recommendation, joining the item's title when known
    pub fn recommendation(&self, item_id: ItemId, score: f64) -> Recommendation {
        Recommendation {
            item_id,
            title: self.title(item_id).map(str::to_string),
            score,
        }
    }

    /// Fills in titles on recommendations produced without a catalog
    pub fn attach_titles(&self, recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
        recommendations
            .into_iter()
            .map(|rec| self.recommendation(rec.item_id, rec.score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rated_at_converts_unix_seconds() {
        let rating = Rating::new(196, 242, 3.0, 881250949);
        let rated_at = rating.rated_at().unwrap();
        assert_eq!(rated_at.to_rfc3339(), "1997-12-04T15:55:49+00:00");
    }

    #[test]
    fn test_rated_at_out_of_range() {
        let rating = Rating::new(1, 1, 3.0, i64::MAX);
        assert!(rating.rated_at().is_none());
    }

    #[test]
    fn test_catalog_left_join() {
        let catalog = ItemCatalog::new(&[Item::new(1, "Toy Story (1995)")]);

        let known = catalog.recommendation(1, 4.5);
        assert_eq!(known.title.as_deref(), Some("Toy Story (1995)"));

        let unknown = catalog.recommendation(99, 3.0);
        assert_eq!(unknown.item_id, 99);
        assert_eq!(unknown.title, None);
    }

    #[test]
    fn test_attach_titles_keeps_order_and_scores() {
        let catalog = ItemCatalog::new(&[Item::new(1, "A"), Item::new(2, "B")]);
        let recs = vec![
            Recommendation::untitled(2, 4.0),
            Recommendation::untitled(3, 3.5),
            Recommendation::untitled(1, 3.0),
        ];

        let joined = catalog.attach_titles(recs);
        let titles: Vec<Option<&str>> = joined.iter().map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec![Some("B"), None, Some("A")]);
        assert_eq!(joined[1].score, 3.5);
    }
}
