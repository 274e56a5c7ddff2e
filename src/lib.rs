//! Schema-driven SQLite fixture generator.
//!
//! Every run deletes the database file, recreates the tables described by a
//! [`Schema`] and inserts the rows of a seed [`Catalog`].

pub mod libs;

pub use libs::*;
