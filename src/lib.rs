//! Book recommendations from a precomputed item-item similarity matrix.
//!
//! The [`catalog`] tables are loaded once from CSV artifacts, wrapped in a
//! [`recommend::Recommender`], and served as a web page by [`server`].

#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod fuzzy;
pub mod logging;
pub mod recommend;
pub mod server;

pub use catalog::{ColumnNames, DataPaths, Tables};
pub use error::{LoadError, Result};
pub use recommend::{RecommendationResult, Recommendations, Recommender};
