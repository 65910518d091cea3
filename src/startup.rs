use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;

use crate::{
    configuration::{BrowserBackend, BrowserSettings, DatabaseSettings, Settings},
    dal::PgStore,
    domain::profile::{HarvestedProfile, ListingRecord},
    error::FetchError,
    services::{
        import_listing_csv, listen_for_ctrl_c, BatchEnrichmentJob, CsvSink, DataForSeoClient,
        Droid, EnrichmentJobConfig, FetchedPage, HttpFetcher, LicenseeDetailExtractor,
        ListingConfig, PageFetcher, PaginatedListingHarvester, ProfileListingExtractor,
        SequentialConfig, SequentialIdHarvester, Sink, IMPORT_CHUNK_SIZE,
    },
};

/// Directory harvesting and hostname traffic enrichment.
#[derive(Parser)]
#[command(name = "dirharvest", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Walk licensee detail pages by numeric id.
    Sequential {
        /// First id to fetch (defaults to `sequential.start_id`).
        #[arg(long)]
        start_id: Option<u64>,

        #[arg(long, value_enum, default_value_t = Output::Csv)]
        output: Output,
    },

    /// Walk the alphabetical listing, partition by partition.
    Listing {
        /// Partition letters to scan, e.g. `pqr` (defaults to `listing.partitions`).
        #[arg(long)]
        partitions: Option<String>,

        /// Page to start every partition at (defaults to `listing.start_page`).
        #[arg(long)]
        start_page: Option<u32>,

        #[arg(long, value_enum, default_value_t = Output::Csv)]
        output: Output,
    },

    /// Load a listing csv into the database.
    Import {
        path: PathBuf,
    },

    /// Fetch traffic metrics for every hostname without a stored result.
    Enrich,
}

/// Where harvested records are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Output {
    /// Append to the csv file named in the configuration.
    Csv,
    /// Insert into the database.
    Store,
}

/// The browser session or plain http client a harvester fetches through.
pub enum Fetcher {
    Browser(Droid),
    Http(HttpFetcher),
}

impl Fetcher {
    pub async fn connect(settings: &BrowserSettings) -> anyhow::Result<Self> {
        match settings.backend {
            BrowserBackend::Webdriver => {
                let droid = Droid::new(settings).await.with_context(|| {
                    format!("Failed to start browser at {}", settings.webdriver_url)
                })?;
                Ok(Fetcher::Browser(droid))
            }
            BrowserBackend::Http => Ok(Fetcher::Http(
                HttpFetcher::new(settings).context("Failed to build http client")?,
            )),
        }
    }

    pub async fn close(self) {
        if let Fetcher::Browser(droid) = self {
            if let Err(e) = droid.quit().await {
                log::error!("Failed to close browser session: {}", e);
            }
        }
    }
}

#[async_trait]
impl PageFetcher for Fetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        match self {
            Fetcher::Browser(droid) => droid.fetch(url).await,
            Fetcher::Http(client) => client.fetch(url).await,
        }
    }
}

async fn connect_store(settings: &DatabaseSettings) -> anyhow::Result<PgStore> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(15 * 60)) // 15 minutes
        .connect_lazy_with(settings.with_db());

    let store = PgStore::new(pool);
    store
        .migrate()
        .await
        .context("Failed to run database migrations")?;
    Ok(store)
}

pub async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
    match command {
        Command::Sequential { start_id, output } => {
            let mut config = SequentialConfig::from(&settings.sequential);
            if let Some(start_id) = start_id {
                config.start_id = start_id;
            }

            match output {
                Output::Csv => {
                    let mut sink = CsvSink::<HarvestedProfile>::open(&settings.sequential.output)
                        .context("Failed to open sequential output file")?;
                    run_sequential(&settings.browser, config, &mut sink).await
                }
                Output::Store => {
                    let mut store = connect_store(&settings.database).await?;
                    let res = run_sequential(&settings.browser, config, &mut store).await;
                    store.close().await;
                    res
                }
            }
        }
        Command::Listing {
            partitions,
            start_page,
            output,
        } => {
            let mut listing = settings.listing.clone();
            if let Some(partitions) = partitions {
                listing.partitions = partitions;
            }
            if let Some(start_page) = start_page {
                listing.start_page = start_page;
            }
            let config = ListingConfig::from(&listing);

            match output {
                Output::Csv => {
                    let mut sink = CsvSink::<ListingRecord>::open(&listing.output)
                        .context("Failed to open listing output file")?;
                    run_listing(&settings.browser, config, &mut sink).await
                }
                Output::Store => {
                    let mut store = connect_store(&settings.database).await?;
                    let res = run_listing(&settings.browser, config, &mut store).await;
                    store.close().await;
                    res
                }
            }
        }
        Command::Import { path } => {
            let store = connect_store(&settings.database).await?;
            let res = import_listing_csv(&path, &store, IMPORT_CHUNK_SIZE)
                .await
                .with_context(|| format!("Failed to import {}", path.display()));
            store.close().await;
            res?;
            Ok(())
        }
        Command::Enrich => {
            let client = DataForSeoClient::new(&settings.enrichment)
                .context("Failed to build enrichment client")?;
            let store = connect_store(&settings.database).await?;
            let res = BatchEnrichmentJob::new(
                &store,
                &client,
                EnrichmentJobConfig::from(&settings.enrichment),
            )
            .run()
            .await
            .context("Enrichment aborted by a store failure");
            store.close().await;
            res?;
            Ok(())
        }
    }
}

async fn run_sequential<S: Sink<HarvestedProfile>>(
    browser: &BrowserSettings,
    config: SequentialConfig,
    sink: &mut S,
) -> anyhow::Result<()> {
    let fetcher = Fetcher::connect(browser).await?;
    let harvester =
        SequentialIdHarvester::new(&fetcher, LicenseeDetailExtractor, config, listen_for_ctrl_c());

    let res = harvester.run(sink).await;
    fetcher.close().await;

    let stats = res.context("Sequential harvest stopped by an output failure")?;
    if stats.aborted {
        log::warn!("Sequential harvest interrupted after id {:?}", stats.last_id);
    }
    Ok(())
}

async fn run_listing<S: Sink<ListingRecord>>(
    browser: &BrowserSettings,
    config: ListingConfig,
    sink: &mut S,
) -> anyhow::Result<()> {
    let fetcher = Fetcher::connect(browser).await?;
    let harvester = PaginatedListingHarvester::new(
        &fetcher,
        ProfileListingExtractor,
        config,
        listen_for_ctrl_c(),
    );

    let res = harvester.run(sink).await;
    fetcher.close().await;

    let stats = res.context("Listing harvest stopped by an output failure")?;
    if stats.aborted {
        log::warn!("Listing harvest interrupted");
    }
    Ok(())
}
