#![forbid(unsafe_code)]

//! Similar-book lookup.
//!
//! A free-text title is fuzzily resolved against the title index, then the
//! matched title's row of the similarity matrix is ranked. The lookup never
//! fails: every bad path (blank query, no close title, missing catalog entry)
//! yields a shorter or empty result.
//!
//! ```
//! use bookrec::catalog::{BookCatalog, BookRecord, PopularityTable, SimilarityMatrix, Tables, TitleIndex};
//! use bookrec::recommend::Recommender;
//!
//! let titles = TitleIndex::new(vec!["Harry Potter".into(), "The Hobbit".into(), "Dune".into()]).unwrap();
//! let matrix = SimilarityMatrix::from_rows(vec![
//!     vec![1.0, 0.8, 0.3],
//!     vec![0.8, 1.0, 0.4],
//!     vec![0.3, 0.4, 1.0],
//! ]).unwrap();
//! let catalog = BookCatalog::from_records(
//!     ["Harry Potter", "The Hobbit", "Dune"]
//!         .into_iter()
//!         .map(|title| BookRecord { title: title.into(), author: None, image: None })
//!         .collect(),
//! );
//! let tables = Tables::new(titles, matrix, catalog, PopularityTable::default()).unwrap();
//! let recommender = Recommender::new(tables);
//!
//! let results = recommender.recommend("harry poter", 2);
//! assert_eq!(results[0].title, "The Hobbit");
//! assert_eq!(results[1].score, 0.3);
//! ```

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::catalog::{PopularBook, Tables, TablesStats};
use crate::fuzzy;

/// Results returned when the caller does not ask for a specific count.
pub const DEFAULT_RECOMMENDATIONS: usize = 5;

/// Minimum similarity ratio for a title to count as a match.
pub const MATCH_CUTOFF: f64 = 0.55;

/// Author reported when the catalog record has none.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// A recommended book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
    /// Canonical title.
    pub title: String,
    /// Author, or [`UNKNOWN_AUTHOR`].
    pub author: String,
    /// Cover image URL.
    pub image: Option<String>,
    /// Similarity to the matched title, exactly as stored in the matrix.
    pub score: f64,
}

/// Outcome of a lookup together with the title the query resolved to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendations {
    /// Canonical title the query matched, if any.
    pub matched: Option<String>,
    /// Similar books, most similar first.
    pub results: Vec<RecommendationResult>,
}

/// Read-only lookup context over the loaded tables.
///
/// Cheap to share behind an `Arc`; no method takes `&mut self`.
#[derive(Debug, Clone)]
pub struct Recommender {
    tables: Tables,
    /// Lowercased title to canonical title. A later title wins on collision.
    folded: HashMap<String, String>,
}

impl Recommender {
    /// Wraps `tables`, precomputing the case-insensitive title view.
    pub fn new(tables: Tables) -> Self {
        let folded = tables
            .titles
            .iter()
            .map(|title| (title.to_lowercase(), title.to_string()))
            .collect();
        Self { tables, folded }
    }

    /// Up to `n` books most similar to the title `query` fuzzily matches.
    pub fn recommend(&self, query: &str, n: usize) -> Vec<RecommendationResult> {
        self.lookup(query, n).results
    }

    /// Like [`recommend`](Self::recommend), also reporting the matched title.
    pub fn lookup(&self, query: &str, n: usize) -> Recommendations {
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() || n == 0 {
            return Recommendations::default();
        }
        let Some(matched) = self.match_title(&normalized) else {
            debug!(query = %normalized, "no title above cutoff");
            return Recommendations::default();
        };
        let Some(position) = self.tables.titles.position(matched) else {
            return Recommendations::default();
        };
        let Some(row) = self.tables.similarity.row(position) else {
            return Recommendations::default();
        };

        let mut ranked: Vec<(usize, f64)> = row
            .iter()
            .copied()
            .enumerate()
            .filter(|&(other, _)| other != position)
            .collect();
        // stable: equal scores keep ascending position order
        ranked.sort_by(|left, right| right.1.total_cmp(&left.1));
        ranked.truncate(n);

        let results = ranked
            .into_iter()
            .filter_map(|(other, score)| self.describe(other, score))
            .collect();
        Recommendations {
            matched: Some(matched.to_string()),
            results,
        }
    }

    /// Canonical title closest to an already normalized query.
    fn match_title(&self, normalized: &str) -> Option<&str> {
        let candidates = self.folded.keys().map(String::as_str);
        fuzzy::close_matches(normalized, candidates, 1, MATCH_CUTOFF)
            .first()
            .and_then(|key| self.folded.get(*key))
            .map(String::as_str)
    }

    fn describe(&self, position: usize, score: f64) -> Option<RecommendationResult> {
        let title = self.tables.titles.title(position)?;
        let Some(record) = self.tables.catalog.first_by_title(title) else {
            debug!(%title, "similar title has no catalog record");
            return None;
        };
        Some(RecommendationResult {
            title: record.title.clone(),
            author: record
                .author
                .clone()
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            image: record.image.clone(),
            score,
        })
    }

    /// The popularity table, in display order.
    pub fn popular(&self) -> &[PopularBook] {
        self.tables.popular.books()
    }

    /// Size and consistency summary of the backing tables.
    pub fn stats(&self) -> TablesStats {
        self.tables.stats()
    }

    /// The backing tables.
    pub fn tables(&self) -> &Tables {
        &self.tables
    }
}
