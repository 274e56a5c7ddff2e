pub mod config;
pub mod error;
pub mod id;
pub mod migrator;
pub mod query_builder;
pub mod schema;
pub mod seed;
pub mod storage;

// Re-export them for easier access from main.rs
pub use config::*;
pub use error::*;
pub use id::*;
pub use migrator::*;
pub use query_builder::*;
pub use schema::*;
pub use seed::*;
pub use storage::*;
