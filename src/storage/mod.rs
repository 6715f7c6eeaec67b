//! Durable article store backed by SQLite.
//!
//! One table, keyed uniquely by link. Articles are inserted with
//! insert-if-absent semantics and never updated or deleted.

mod articles;
mod schema;
mod types;

pub use schema::Database;
pub use types::{Article, DatabaseError, NewArticle};
