pub mod enrichment;
pub mod hostname;
pub mod profile;
