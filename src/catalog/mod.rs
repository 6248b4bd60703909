#![forbid(unsafe_code)]

//! Read-only tables backing the recommender.
//!
//! Four structures are loaded once at startup and never mutated afterwards:
//! the title index, the item-item similarity matrix, the book catalog and the
//! popularity table. Index position `i` is both row `i` and column `i` of the
//! matrix.

mod load;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub use load::{load_books, load_popular, load_similarity};

/// Number of entries shown in the popularity table.
pub const POPULAR_SIZE: usize = 50;

/// Default file name of the paired title index and similarity matrix.
pub const SIMILARITY_FILE: &str = "similarity.csv";
/// Default file name of the book catalog.
pub const BOOKS_FILE: &str = "books.csv";
/// Default file name of the popularity table.
pub const POPULAR_FILE: &str = "popular.csv";

/// Structural problem in an otherwise parseable table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    /// The title index has no entries.
    #[error("title index is empty")]
    EmptyIndex,
    /// A title appears twice in the index.
    #[error("duplicate title '{0}' in index")]
    DuplicateTitle(String),
    /// A title in the index is blank.
    #[error("blank title at position {0}")]
    BlankTitle(usize),
    /// A matrix row has the wrong number of columns.
    #[error("row {row} has {found} scores, expected {expected}")]
    RowLength {
        /// Row position.
        row: usize,
        /// Expected column count.
        expected: usize,
        /// Actual column count.
        found: usize,
    },
    /// A score is NaN or infinite.
    #[error("score at ({row}, {column}) is not finite")]
    NonFinite {
        /// Row position.
        row: usize,
        /// Column position.
        column: usize,
    },
    /// Matrix and index disagree on the number of titles.
    #[error("similarity matrix is {dimension}x{dimension} but the index has {titles} titles")]
    DimensionMismatch {
        /// Titles in the index.
        titles: usize,
        /// Matrix dimension.
        dimension: usize,
    },
}

/// Ordered, deduplicated book titles.
#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    titles: Vec<String>,
    positions: HashMap<String, usize>,
}

impl TitleIndex {
    /// Builds the index, rejecting blank or repeated titles.
    pub fn new(titles: Vec<String>) -> Result<Self, TableError> {
        if titles.is_empty() {
            return Err(TableError::EmptyIndex);
        }
        let mut positions = HashMap::with_capacity(titles.len());
        for (position, title) in titles.iter().enumerate() {
            if title.trim().is_empty() {
                return Err(TableError::BlankTitle(position));
            }
            if positions.insert(title.clone(), position).is_some() {
                return Err(TableError::DuplicateTitle(title.clone()));
            }
        }
        Ok(Self { titles, positions })
    }

    /// Number of titles.
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Row/column position of `title`.
    pub fn position(&self, title: &str) -> Option<usize> {
        self.positions.get(title).copied()
    }

    /// Title stored at `position`.
    pub fn title(&self, position: usize) -> Option<&str> {
        self.titles.get(position).map(String::as_str)
    }

    /// Titles in position order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.titles.iter().map(String::as_str)
    }
}

/// Dense square matrix of precomputed similarity scores, row-major.
#[derive(Debug, Clone, Default)]
pub struct SimilarityMatrix {
    dimension: usize,
    scores: Vec<f64>,
}

impl SimilarityMatrix {
    /// Builds the matrix from rows, which must form a square of finite values.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, TableError> {
        let dimension = rows.len();
        let mut scores = Vec::with_capacity(dimension * dimension);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != dimension {
                return Err(TableError::RowLength {
                    row,
                    expected: dimension,
                    found: values.len(),
                });
            }
            if let Some(column) = values.iter().position(|value| !value.is_finite()) {
                return Err(TableError::NonFinite { row, column });
            }
            scores.extend(values);
        }
        Ok(Self { dimension, scores })
    }

    /// Number of rows (and columns).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Scores of `position` against every position.
    pub fn row(&self, position: usize) -> Option<&[f64]> {
        if position >= self.dimension {
            return None;
        }
        let start = position * self.dimension;
        Some(&self.scores[start..start + self.dimension])
    }

    /// Score at `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.row(row).and_then(|values| values.get(column).copied())
    }
}

/// One edition of a book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRecord {
    /// Title, matching the title index verbatim.
    pub title: String,
    /// Author, when known.
    pub author: Option<String>,
    /// Cover image URL, when known.
    pub image: Option<String>,
}

/// Book records keyed non-uniquely by title.
#[derive(Debug, Clone, Default)]
pub struct BookCatalog {
    records: Vec<BookRecord>,
    first_by_title: HashMap<String, usize>,
}

impl BookCatalog {
    /// Builds the catalog. The first record of each title represents it.
    pub fn from_records(records: Vec<BookRecord>) -> Self {
        let mut first_by_title = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            first_by_title.entry(record.title.clone()).or_insert(idx);
        }
        Self {
            records,
            first_by_title,
        }
    }

    /// Representative record for `title`.
    pub fn first_by_title(&self, title: &str) -> Option<&BookRecord> {
        self.first_by_title
            .get(title)
            .and_then(|&idx| self.records.get(idx))
    }

    /// Total records, duplicates included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct titles.
    pub fn distinct_titles(&self) -> usize {
        self.first_by_title.len()
    }

    fn contains_title(&self, title: &str) -> bool {
        self.first_by_title.contains_key(title)
    }
}

/// Entry in the popularity table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularBook {
    /// Book title.
    pub title: String,
    /// Book author.
    pub author: String,
    /// Cover image URL, when known.
    pub image: Option<String>,
    /// Number of ratings received.
    pub rating_count: u64,
    /// Mean rating.
    pub average_rating: f64,
}

/// Fixed list of the most rated books, in display order.
#[derive(Debug, Clone, Default)]
pub struct PopularityTable {
    books: Vec<PopularBook>,
}

impl PopularityTable {
    /// Keeps at most [`POPULAR_SIZE`] books, preserving order.
    pub fn new(mut books: Vec<PopularBook>) -> Self {
        books.truncate(POPULAR_SIZE);
        Self { books }
    }

    /// Books in display order.
    pub fn books(&self) -> &[PopularBook] {
        &self.books
    }

    /// Number of books.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

/// Locations of the precomputed artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Paired title index and similarity matrix.
    pub similarity: PathBuf,
    /// Book catalog.
    pub books: PathBuf,
    /// Popularity table.
    pub popular: PathBuf,
}

impl DataPaths {
    /// Default artifact names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            similarity: dir.join(SIMILARITY_FILE),
            books: dir.join(BOOKS_FILE),
            popular: dir.join(POPULAR_FILE),
        }
    }
}

/// CSV column names used by the catalog and popularity artifacts.
///
/// Header lookup is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    /// Title column.
    pub title: String,
    /// Author column.
    pub author: String,
    /// Cover image column.
    pub image: String,
    /// Rating count column (popularity table only).
    pub rating_count: String,
    /// Average rating column (popularity table only).
    pub average_rating: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            title: "Book-Title".into(),
            author: "Book-Author".into(),
            image: "Image-URL-M".into(),
            rating_count: "num_ratings".into(),
            average_rating: "avg_rating".into(),
        }
    }
}

/// All backing tables, loaded together.
#[derive(Debug, Clone)]
pub struct Tables {
    /// Title index.
    pub titles: TitleIndex,
    /// Similarity matrix aligned with `titles`.
    pub similarity: SimilarityMatrix,
    /// Book catalog.
    pub catalog: BookCatalog,
    /// Popularity table.
    pub popular: PopularityTable,
}

impl Tables {
    /// Assembles the tables, checking that matrix and index line up.
    pub fn new(
        titles: TitleIndex,
        similarity: SimilarityMatrix,
        catalog: BookCatalog,
        popular: PopularityTable,
    ) -> Result<Self, TableError> {
        if titles.len() != similarity.dimension() {
            return Err(TableError::DimensionMismatch {
                titles: titles.len(),
                dimension: similarity.dimension(),
            });
        }
        Ok(Self {
            titles,
            similarity,
            catalog,
            popular,
        })
    }

    /// Loads every artifact named by `paths`.
    pub fn load(paths: &DataPaths, columns: &ColumnNames) -> crate::error::Result<Self> {
        let (titles, similarity) = load_similarity(&paths.similarity)?;
        let catalog = load_books(&paths.books, columns)?;
        let popular = load_popular(&paths.popular, columns)?;
        Self::new(titles, similarity, catalog, popular)
            .map_err(|err| crate::error::LoadError::table(&paths.similarity, err))
    }

    /// Size and consistency summary.
    pub fn stats(&self) -> TablesStats {
        let indexed: HashSet<&str> = self.titles.iter().collect();
        let indexed_without_catalog = self
            .titles
            .iter()
            .filter(|title| !self.catalog.contains_title(title))
            .count();
        let catalog_without_index = self
            .catalog
            .first_by_title
            .keys()
            .filter(|title| !indexed.contains(title.as_str()))
            .count();
        TablesStats {
            titles: self.titles.len(),
            matrix_dimension: self.similarity.dimension(),
            catalog_records: self.catalog.len(),
            catalog_titles: self.catalog.distinct_titles(),
            indexed_without_catalog,
            catalog_without_index,
            popular_books: self.popular.len(),
        }
    }
}

/// Summary produced by [`Tables::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablesStats {
    /// Titles in the index.
    pub titles: usize,
    /// Similarity matrix dimension.
    pub matrix_dimension: usize,
    /// Catalog records, duplicate editions included.
    pub catalog_records: usize,
    /// Distinct catalog titles.
    pub catalog_titles: usize,
    /// Indexed titles that can never be surfaced for lack of a catalog record.
    pub indexed_without_catalog: usize,
    /// Catalog titles unknown to the similarity index.
    pub catalog_without_index: usize,
    /// Entries in the popularity table.
    pub popular_books: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, author: &str) -> BookRecord {
        BookRecord {
            title: title.into(),
            author: Some(author.into()),
            image: None,
        }
    }

    #[test]
    fn title_index_rejects_duplicates_and_blanks() {
        assert_eq!(
            TitleIndex::new(vec!["Dune".into(), "Dune".into()]).unwrap_err(),
            TableError::DuplicateTitle("Dune".into())
        );
        assert_eq!(
            TitleIndex::new(vec!["Dune".into(), "  ".into()]).unwrap_err(),
            TableError::BlankTitle(1)
        );
        assert_eq!(TitleIndex::new(Vec::new()).unwrap_err(), TableError::EmptyIndex);
    }

    #[test]
    fn title_index_positions_follow_input_order() {
        let index = TitleIndex::new(vec!["B".into(), "A".into()]).unwrap();
        assert_eq!(index.position("A"), Some(1));
        assert_eq!(index.title(0), Some("B"));
        assert_eq!(index.position("a"), None);
    }

    #[test]
    fn matrix_must_be_square_and_finite() {
        assert_eq!(
            SimilarityMatrix::from_rows(vec![vec![1.0, 0.5], vec![0.5]]).unwrap_err(),
            TableError::RowLength {
                row: 1,
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            SimilarityMatrix::from_rows(vec![vec![1.0, f64::NAN], vec![0.5, 1.0]]).unwrap_err(),
            TableError::NonFinite { row: 0, column: 1 }
        );
        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0, 0.2], vec![0.7, 1.0]]).unwrap();
        assert_eq!(matrix.row(1), Some(&[0.7, 1.0][..]));
        assert_eq!(matrix.get(0, 1), Some(0.2));
        assert_eq!(matrix.row(2), None);
    }

    #[test]
    fn catalog_surfaces_first_edition() {
        let catalog = BookCatalog::from_records(vec![
            record("Dune", "Frank Herbert"),
            record("Emma", "Jane Austen"),
            record("Dune", "F. Herbert"),
        ]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.distinct_titles(), 2);
        assert_eq!(
            catalog.first_by_title("Dune").and_then(|r| r.author.as_deref()),
            Some("Frank Herbert")
        );
        assert!(catalog.first_by_title("dune").is_none());
    }

    #[test]
    fn popularity_table_is_capped() {
        let books = (0..60)
            .map(|i| PopularBook {
                title: format!("Book {i}"),
                author: "Anon".into(),
                image: None,
                rating_count: 100 - i as u64,
                average_rating: 4.0,
            })
            .collect();
        let table = PopularityTable::new(books);
        assert_eq!(table.len(), POPULAR_SIZE);
        assert_eq!(table.books()[0].title, "Book 0");
    }

    #[test]
    fn tables_check_dimension_and_report_stats() {
        let titles = TitleIndex::new(vec!["Dune".into(), "Emma".into()]).unwrap();
        let catalog = BookCatalog::from_records(vec![
            record("Dune", "Frank Herbert"),
            record("Ulysses", "James Joyce"),
        ]);
        let small = SimilarityMatrix::from_rows(vec![vec![1.0]]).unwrap();
        assert_eq!(
            Tables::new(
                titles.clone(),
                small,
                catalog.clone(),
                PopularityTable::default()
            )
            .unwrap_err(),
            TableError::DimensionMismatch {
                titles: 2,
                dimension: 1
            }
        );

        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0, 0.1], vec![0.1, 1.0]]).unwrap();
        let tables = Tables::new(titles, matrix, catalog, PopularityTable::default()).unwrap();
        let stats = tables.stats();
        assert_eq!(stats.titles, 2);
        assert_eq!(stats.catalog_titles, 2);
        assert_eq!(stats.indexed_without_catalog, 1);
        assert_eq!(stats.catalog_without_index, 1);
        assert_eq!(stats.popular_books, 0);
    }
}
