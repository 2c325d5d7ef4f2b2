// Re-export the public items from the db modules
pub use core::Db;
pub use transaction::{Exclusive, Scope};
pub use types::{Allocated, Changes, Column, Filter, Keyed, Record};

pub mod core;
pub mod transaction;
pub mod types;
