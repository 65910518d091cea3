pub mod csv_import;
pub mod droid;
pub mod enrichment_client;
pub mod enrichment_job;
pub mod extractor;
pub mod fetcher;
pub mod http_fetcher;
pub mod listing_harvester;
pub mod sequential_harvester;
pub mod shutdown;
pub mod sink;

#[cfg(test)]
mod test_support;

pub use csv_import::*;
pub use droid::*;
pub use enrichment_client::*;
pub use enrichment_job::*;
pub use extractor::*;
pub use fetcher::*;
pub use http_fetcher::*;
pub use listing_harvester::*;
pub use sequential_harvester::*;
pub use shutdown::*;
pub use sink::*;
