pub mod activity;
pub mod attendance;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod feed;
pub mod field_names;
pub mod models;
pub mod schema;
pub mod slug;
pub mod users;

pub use config::Config;
pub use db::Db;
pub use error::{Error, Result};
pub use rusqlite;
pub use rusqlite_migration;
