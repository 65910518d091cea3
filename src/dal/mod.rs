pub mod enrichment_db;
pub mod listing_db;
pub mod profile_db;
pub mod store;

pub use store::*;
