use std::path::{Path, PathBuf};

use crate::{
    error::{RecommendError, RecommendResult},
    models::{Item, Rating},
};

use super::{Dataset, RatingSource};

const RATINGS_FILE: &str = "u.data";
const ITEMS_FILE: &str = "u.item";

/// Genre flag columns of `u.item`, in file order
pub const GENRES: [&str; 19] = [
    "unknown",
    "Action",
    "Adventure",
    "Animation",
    "Children",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Fantasy",
    "Film-Noir",
    "Horror",
    "Musical",
    "Mystery",
    "Romance",
    "Sci-Fi",
    "Thriller",
    "War",
    "Western",
];

/// Index of the first genre flag in a `u.item` row
const GENRE_OFFSET: usize = 5;

/// Reads a MovieLens 100k directory (`u.data` + `u.item`)
#[derive(Debug, Clone)]
pub struct MovieLensSource {
    dir: PathBuf,
}

impl MovieLensSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait::async_trait]
impl RatingSource for MovieLensSource {
    #[tracing::instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn load(&self) -> RecommendResult<Dataset> {
        let ratings_bytes = read_file(&self.dir.join(RATINGS_FILE)).await?;
        let items_bytes = read_file(&self.dir.join(ITEMS_FILE)).await?;

        let ratings = parse_ratings(&String::from_utf8_lossy(&ratings_bytes))?;
        let items = parse_items(&decode_latin1(&items_bytes))?;

        tracing::info!(
            ratings = ratings.len(),
            items = items.len(),
            "Loaded MovieLens dataset"
        );

        Ok(Dataset { ratings, items })
    }

    fn name(&self) -> &'static str {
        "movielens"
    }
}

async fn read_file(path: &Path) -> RecommendResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read dataset file");
        RecommendError::Io(e)
    })
}

/// `u.item` is Latin-1, where every byte is its own code point
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Parses tab separated `user_id item_id rating timestamp` rows
pub fn parse_ratings(text: &str) -> RecommendResult<Vec<Rating>> {
    let mut ratings = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(malformed(RATINGS_FILE, line_no, "expected 4 fields"));
        }

        let user_id = fields[0]
            .parse()
            .map_err(|_| malformed(RATINGS_FILE, line_no, "invalid user_id"))?;
        let item_id = fields[1]
            .parse()
            .map_err(|_| malformed(RATINGS_FILE, line_no, "invalid item_id"))?;
        let rating = fields[2]
            .parse()
            .map_err(|_| malformed(RATINGS_FILE, line_no, "invalid rating"))?;
        let timestamp = fields[3]
            .parse()
            .map_err(|_| malformed(RATINGS_FILE, line_no, "invalid timestamp"))?;

        ratings.push(Rating::new(user_id, item_id, rating, timestamp));
    }

    Ok(ratings)
}

/// Parses pipe separated `u.item` rows
///
/// Only the id and title are required; trailing metadata columns may be
/// missing.
pub fn parse_items(text: &str) -> RecommendResult<Vec<Item>> {
    let mut items = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < 2 {
            return Err(malformed(ITEMS_FILE, line_no, "expected id and title"));
        }

        let item_id = fields[0]
            .trim()
            .parse()
            .map_err(|_| malformed(ITEMS_FILE, line_no, "invalid item_id"))?;

        let release_date = fields
            .get(2)
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let genres = GENRES
            .iter()
            .enumerate()
            .filter(|(i, _)| fields.get(GENRE_OFFSET + i).map(|f| f.trim()) == Some("1"))
            .map(|(_, genre)| genre.to_string())
            .collect();

        items.push(Item {
            item_id,
            title: fields[1].to_string(),
            release_date,
            genres,
        });
    }

    Ok(items)
}

fn malformed(file: &str, line_no: usize, reason: &str) -> RecommendError {
    RecommendError::Dataset(format!("{} line {}: {}", file, line_no + 1, reason))
}
