//! SQLite persistence for articles.
//!
//! Provides a WAL-mode database with versioned migrations, the
//! [`ArticleStore`] contract consumed by the pipeline, and an FTS5-backed
//! repository implementing it.

pub mod db;
pub mod migrations;
pub mod repository;
pub mod search;
pub mod store;

pub use db::Database;
pub use repository::ArticleRepository;
pub use search::{sanitize_fts5_query, SearchHit};
pub use store::{ArticleStore, UpsertOutcome};
