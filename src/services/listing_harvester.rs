use std::time::Duration;

use crate::{
    configuration::ListingSettings,
    domain::profile::ListingRecord,
    error::{FetchError, StoreError},
};

use super::{ListingExtractor, ListingLink, PageFetcher, Shutdown, Sink};

#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub base_url: String,
    pub partitions: Vec<char>,
    pub start_page: u32,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub detail_delay: Duration,
}

impl From<&ListingSettings> for ListingConfig {
    fn from(settings: &ListingSettings) -> Self {
        ListingConfig {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            partitions: settings
                .partitions
                .chars()
                .filter(|c| c.is_ascii_alphabetic())
                .map(|c| c.to_ascii_lowercase())
                .collect(),
            start_page: settings.start_page,
            max_retries: settings.max_retries,
            retry_base_delay: Duration::from_secs(settings.retry_base_delay_secs),
            detail_delay: Duration::from_millis(settings.detail_delay_millis),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// The page listed this many profile links.
    Items(usize),
    /// A valid page without links. Terminal for the partition.
    Empty,
    /// Retry budget spent without a successful fetch.
    Abandoned,
    /// Abort raised while waiting to retry.
    Interrupted,
}

/// Everything one page scan did. The retry count lives here and nowhere
/// else, so each page starts with a fresh budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageScan {
    pub status: PageStatus,
    pub retries: u32,
    pub backoff: Vec<Duration>,
    pub details_fetched: usize,
    pub detail_failures: usize,
    pub emitted: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PartitionStats {
    pub partition: char,
    pub pages: u32,
    pub abandoned_pages: u32,
    pub details_fetched: usize,
    pub detail_failures: usize,
    pub emitted: usize,
    pub aborted: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListingStats {
    pub partitions: Vec<PartitionStats>,
    pub aborted: bool,
}

impl ListingStats {
    pub fn emitted(&self) -> usize {
        self.partitions.iter().map(|p| p.emitted).sum()
    }
}

pub struct PaginatedListingHarvester<'a, F, E> {
    fetcher: &'a F,
    extractor: E,
    config: ListingConfig,
    shutdown: Shutdown,
}

impl<'a, F: PageFetcher, E: ListingExtractor> PaginatedListingHarvester<'a, F, E> {
    pub fn new(fetcher: &'a F, extractor: E, config: ListingConfig, shutdown: Shutdown) -> Self {
        PaginatedListingHarvester {
            fetcher,
            extractor,
            config,
            shutdown,
        }
    }

    pub fn listing_url(&self, partition: char, page: u32) -> String {
        format!("{}/{}/{}.html", self.config.base_url, partition, page)
    }

    /// Scans every partition in declared order.
    pub async fn run<S: Sink<ListingRecord>>(&self, sink: &mut S) -> Result<ListingStats, StoreError> {
        let mut stats = ListingStats::default();

        for &partition in &self.config.partitions {
            if self.shutdown.is_triggered() {
                stats.aborted = true;
                break;
            }

            log::info!("--- Starting partition: {} ---", partition.to_ascii_uppercase());
            let partition_stats = self.scan_partition(partition, sink).await?;
            log::info!(
                "Partition {} done: {} pages, {} records, {} abandoned pages, {} detail failures",
                partition.to_ascii_uppercase(),
                partition_stats.pages,
                partition_stats.emitted,
                partition_stats.abandoned_pages,
                partition_stats.detail_failures
            );

            stats.aborted = partition_stats.aborted;
            stats.partitions.push(partition_stats);
            if stats.aborted {
                break;
            }
        }

        log::info!("Listing harvest finished with {} records", stats.emitted());
        Ok(stats)
    }

    /// Walks pages of one partition until a page lists no profiles.
    pub async fn scan_partition<S: Sink<ListingRecord>>(
        &self,
        partition: char,
        sink: &mut S,
    ) -> Result<PartitionStats, StoreError> {
        let mut stats = PartitionStats {
            partition,
            ..Default::default()
        };
        let mut page = self.config.start_page;

        loop {
            if self.shutdown.is_triggered() {
                log::warn!("Listing harvest aborted at {}/{}", partition, page);
                stats.aborted = true;
                break;
            }

            let scan = self.scan_page(partition, page, sink).await?;
            stats.pages += 1;
            stats.details_fetched += scan.details_fetched;
            stats.detail_failures += scan.detail_failures;
            stats.emitted += scan.emitted;

            match scan.status {
                PageStatus::Empty => {
                    log::info!(
                        "No more profiles found for partition {}",
                        partition.to_ascii_uppercase()
                    );
                    break;
                }
                PageStatus::Abandoned => stats.abandoned_pages += 1,
                PageStatus::Interrupted => {
                    log::warn!("Listing harvest aborted at {}/{}", partition, page);
                    stats.aborted = true;
                    break;
                }
                PageStatus::Items(_) => {}
            }

            page += 1;
        }

        Ok(stats)
    }

    /// Fetches one listing page (retrying with linear backoff), then every
    /// profile it links to.
    pub async fn scan_page<S: Sink<ListingRecord>>(
        &self,
        partition: char,
        page: u32,
        sink: &mut S,
    ) -> Result<PageScan, StoreError> {
        let url = self.listing_url(partition, page);
        log::info!("Scraping listing page: {}", url);

        let mut scan = PageScan {
            status: PageStatus::Empty,
            retries: 0,
            backoff: vec![],
            details_fetched: 0,
            detail_failures: 0,
            emitted: 0,
        };

        let mut attempt_failures = 0;
        let links = loop {
            match self.fetcher.fetch(&url).await {
                Ok(fetched) => break self.extractor.extract_listing(&fetched),
                // Past the last page the directory answers 404.
                Err(FetchError::NotFound(_)) => {
                    log::info!("Listing page {} does not exist", url);
                    return Ok(scan);
                }
                Err(e) => {
                    attempt_failures += 1;
                    if attempt_failures > self.config.max_retries {
                        log::error!(
                            "Failed to scrape listing page {} after {} retries, skipping: {}",
                            url,
                            scan.retries,
                            e
                        );
                        scan.status = PageStatus::Abandoned;
                        return Ok(scan);
                    }

                    let delay = self.config.retry_base_delay * attempt_failures;
                    log::error!(
                        "Error scraping listing page {}: {}. Retry {} in {:?}",
                        url,
                        e,
                        attempt_failures,
                        delay
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.shutdown.triggered() => {
                            scan.status = PageStatus::Interrupted;
                            return Ok(scan);
                        }
                    }
                    scan.retries = attempt_failures;
                    scan.backoff.push(delay);
                }
            }
        };

        log::info!(
            "Found {} profiles on page {} for partition {}",
            links.len(),
            page,
            partition.to_ascii_uppercase()
        );
        if links.is_empty() {
            return Ok(scan);
        }
        scan.status = PageStatus::Items(links.len());

        for link in links {
            if link.url == url {
                continue;
            }
            if self.shutdown.is_triggered() {
                break;
            }

            tokio::time::sleep(self.config.detail_delay).await;
            scan.details_fetched += 1;

            match self.fetch_detail(&link).await {
                Some(record) => {
                    sink.append(&record).await?;
                    scan.emitted += 1;
                }
                None => scan.detail_failures += 1,
            }
        }

        Ok(scan)
    }

    async fn fetch_detail(&self, link: &ListingLink) -> Option<ListingRecord> {
        log::info!("Scraping profile: {}", link.url);

        match self.fetcher.fetch(&link.url).await {
            Ok(page) => {
                let record = self.extractor.extract_detail(&page);
                if record.is_none() {
                    log::info!("Profile {} has no website, skipping", link.url);
                }
                record
            }
            Err(e) => {
                log::error!("Error scraping profile {}: {}", link.url, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ListingConfig, PageStatus, PaginatedListingHarvester};
    use crate::services::{
        test_support::{
            listing_detail_html, listing_page_html, ScriptedFetcher, Scripted, VecSink,
        },
        ProfileListingExtractor, Shutdown,
    };

    const BASE: &str = "https://lawyers.example.com/profile/lawyer";

    fn config(partitions: &str, max_retries: u32) -> ListingConfig {
        ListingConfig {
            base_url: BASE.to_string(),
            partitions: partitions.chars().collect(),
            start_page: 1,
            max_retries,
            retry_base_delay: Duration::from_secs(300),
            detail_delay: Duration::from_millis(50),
        }
    }

    fn page_url(partition: char, page: u32) -> String {
        format!("{}/{}/{}.html", BASE, partition, page)
    }

    fn profile_url(partition: char, page: u32, i: usize) -> String {
        format!("https://lawyers.example.com/p/{}-{}-{}", partition, page, i)
    }

    /// Scripts a listing page with `count` profiles, each with a website.
    fn script_page(fetcher: &ScriptedFetcher, partition: char, page: u32, count: usize) {
        let urls: Vec<String> = (0..count).map(|i| profile_url(partition, page, i)).collect();
        let hrefs: Vec<&str> = urls.iter().map(String::as_str).collect();
        fetcher.page(&page_url(partition, page), listing_page_html(&hrefs));

        for (i, url) in urls.iter().enumerate() {
            fetcher.page(
                url,
                listing_detail_html(
                    &format!("Lawyer {} - Austin, TX", i),
                    Some(&format!("https://www.firm{}.com", i)),
                ),
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn partition_ends_on_first_empty_page() {
        let fetcher = ScriptedFetcher::default();
        script_page(&fetcher, 'a', 1, 3);
        script_page(&fetcher, 'a', 2, 2);
        script_page(&fetcher, 'a', 3, 0);
        let mut sink = VecSink::default();

        let harvester = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("a", 5),
            Shutdown::never(),
        );
        let stats = harvester.scan_partition('a', &mut sink).await.unwrap();

        let detail_requests = fetcher
            .requested()
            .iter()
            .filter(|u| u.contains("/p/"))
            .count();
        assert_eq!(detail_requests, 5);
        assert_eq!(fetcher.requests_for(&page_url('a', 4)), 0);
        assert_eq!(stats.pages, 3);
        assert_eq!(stats.emitted, 5);
        assert_eq!(sink.records.len(), 5);
        assert_eq!(sink.records[0].website, "https://www.firm0.com/");
    }

    #[tokio::test(start_paused = true)]
    async fn records_follow_partition_then_page_order() {
        let fetcher = ScriptedFetcher::default();
        script_page(&fetcher, 'a', 1, 2);
        script_page(&fetcher, 'a', 2, 0);
        script_page(&fetcher, 'b', 1, 1);
        script_page(&fetcher, 'b', 2, 0);
        let mut sink = VecSink::default();

        let stats = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("ab", 5),
            Shutdown::never(),
        )
        .run(&mut sink)
        .await
        .unwrap();

        assert_eq!(stats.emitted(), 3);
        assert_eq!(
            fetcher.requested(),
            vec![
                page_url('a', 1),
                profile_url('a', 1, 0),
                profile_url('a', 1, 1),
                page_url('a', 2),
                page_url('b', 1),
                profile_url('b', 1, 0),
                page_url('b', 2),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failing_page_is_retried_with_growing_backoff() {
        let fetcher = ScriptedFetcher::default();
        fetcher.script(
            &page_url('a', 1),
            vec![Scripted::Transport, Scripted::Transport],
        );
        script_page(&fetcher, 'a', 1, 1);
        let mut sink = VecSink::default();

        let harvester = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("a", 5),
            Shutdown::never(),
        );
        let scan = harvester.scan_page('a', 1, &mut sink).await.unwrap();

        assert_eq!(scan.status, PageStatus::Items(1));
        assert_eq!(scan.retries, 2);
        assert!(scan.retries <= 5);
        assert_eq!(
            scan.backoff,
            vec![Duration::from_secs(300), Duration::from_secs(600)]
        );
        assert!(scan.backoff.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(sink.records.len(), 1);
        assert_eq!(fetcher.requests_for(&page_url('a', 1)), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_page_is_abandoned_without_extra_sleep() {
        let fetcher = ScriptedFetcher::default();
        fetcher.script(&page_url('a', 1), (0..3).map(|_| Scripted::Transport).collect());
        let mut sink = VecSink::default();

        let harvester = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("a", 2),
            Shutdown::never(),
        );

        let started = tokio::time::Instant::now();
        let scan = harvester.scan_page('a', 1, &mut sink).await.unwrap();

        assert_eq!(scan.status, PageStatus::Abandoned);
        assert_eq!(scan.retries, 2);
        assert_eq!(fetcher.requests_for(&page_url('a', 1)), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(300 + 600));
        assert!(sink.records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn scan_moves_past_an_abandoned_page() {
        let fetcher = ScriptedFetcher::default();
        fetcher.script(&page_url('a', 1), (0..3).map(|_| Scripted::Transport).collect());
        script_page(&fetcher, 'a', 2, 1);
        script_page(&fetcher, 'a', 3, 0);
        let mut sink = VecSink::default();

        let stats = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("a", 2),
            Shutdown::never(),
        )
        .scan_partition('a', &mut sink)
        .await
        .unwrap();

        assert_eq!(stats.abandoned_pages, 1);
        assert_eq!(stats.pages, 3);
        assert_eq!(sink.records.len(), 1);
        // Page 2 succeeded on its first attempt, so its budget was fresh.
        assert_eq!(fetcher.requests_for(&page_url('a', 2)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_page_counts_in_partition_stats() {
        let fetcher = ScriptedFetcher::default();
        fetcher.script(&page_url('c', 1), (0..2).map(|_| Scripted::Transport).collect());
        script_page(&fetcher, 'c', 2, 0);
        let mut sink = VecSink::default();

        let stats = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("c", 1),
            Shutdown::never(),
        )
        .scan_partition('c', &mut sink)
        .await
        .unwrap();

        assert_eq!(stats.abandoned_pages, 1);
        assert_eq!(stats.pages, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn detail_failures_do_not_touch_the_page_budget() {
        let fetcher = ScriptedFetcher::default();
        let urls: Vec<String> = (0..3).map(|i| profile_url('d', 1, i)).collect();
        let hrefs: Vec<&str> = urls.iter().map(String::as_str).collect();
        fetcher.page(&page_url('d', 1), listing_page_html(&hrefs));
        fetcher.script(&urls[0], vec![Scripted::Transport]);
        fetcher.page(&urls[1], listing_detail_html("No Site - Dallas, TX", None));
        fetcher.page(
            &urls[2],
            listing_detail_html("Jane Doe - Austin, TX", Some("https://www.example.com")),
        );
        let mut sink = VecSink::default();

        let harvester = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("d", 0),
            Shutdown::never(),
        );
        let scan = harvester.scan_page('d', 1, &mut sink).await.unwrap();

        assert_eq!(scan.status, PageStatus::Items(3));
        assert_eq!(scan.retries, 0);
        assert_eq!(scan.details_fetched, 3);
        assert_eq!(scan.detail_failures, 2);
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].name, "Jane Doe - Austin, TX");
    }

    #[tokio::test(start_paused = true)]
    async fn link_back_to_listing_page_is_skipped() {
        let fetcher = ScriptedFetcher::default();
        let self_link = page_url('e', 1);
        fetcher.page(&self_link, listing_page_html(&[self_link.as_str()]));
        let mut sink = VecSink::default();

        let scan = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("e", 0),
            Shutdown::never(),
        )
        .scan_page('e', 1, &mut sink)
        .await
        .unwrap();

        assert_eq!(scan.status, PageStatus::Items(1));
        assert_eq!(scan.details_fetched, 0);
        assert_eq!(fetcher.requests_for(&self_link), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_page_ends_the_partition_without_retries() {
        let fetcher = ScriptedFetcher::default();
        script_page(&fetcher, 'a', 1, 1);
        // Page 2 is past the end of the directory.
        fetcher.script(&page_url('a', 2), vec![Scripted::NotFound]);
        let mut sink = VecSink::default();

        let harvester = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("a", 5),
            Shutdown::never(),
        );
        let stats = harvester.scan_partition('a', &mut sink).await.unwrap();

        assert_eq!(stats.pages, 2);
        assert_eq!(stats.abandoned_pages, 0);
        assert_eq!(sink.records.len(), 1);
        assert_eq!(fetcher.requests_for(&page_url('a', 2)), 1);
        assert_eq!(fetcher.requests_for(&page_url('a', 3)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_partition_ends_after_one_request() {
        let fetcher = ScriptedFetcher::default();
        let mut sink = VecSink::default();

        let scan = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("z", 5),
            Shutdown::never(),
        )
        .scan_page('z', 1, &mut sink)
        .await
        .unwrap();

        assert_eq!(scan.status, PageStatus::Empty);
        assert_eq!(scan.retries, 0);
        assert!(scan.backoff.is_empty());
        assert_eq!(fetcher.requested(), vec![page_url('z', 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_cuts_a_backoff_wait_short() {
        let fetcher = ScriptedFetcher::default();
        fetcher.script(&page_url('a', 1), (0..6).map(|_| Scripted::Transport).collect());
        let (sender, shutdown) = Shutdown::new();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            _ = sender.send(true);
        });
        let mut sink = VecSink::default();

        let harvester = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("a", 5),
            shutdown,
        );
        let started = tokio::time::Instant::now();
        let stats = harvester.scan_partition('a', &mut sink).await.unwrap();

        assert!(stats.aborted);
        assert_eq!(stats.abandoned_pages, 0);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        assert_eq!(fetcher.requests_for(&page_url('a', 1)), 1);
        assert_eq!(fetcher.requests_for(&page_url('a', 2)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_before_next_partition() {
        let fetcher = ScriptedFetcher::default();
        let (sender, shutdown) = Shutdown::new();
        sender.send(true).unwrap();

        let stats = PaginatedListingHarvester::new(
            &fetcher,
            ProfileListingExtractor,
            config("ab", 0),
            shutdown,
        )
        .run(&mut VecSink::default())
        .await
        .unwrap();

        assert!(stats.aborted);
        assert!(fetcher.requested().is_empty());
    }

    #[test]
    fn config_from_settings_normalizes_partitions() {
        let settings = crate::configuration::ListingSettings {
            base_url: "https://lawyers.example.com/profile/lawyer/".to_string(),
            partitions: "P, q,R".to_string(),
            start_page: 9,
            max_retries: 5,
            retry_base_delay_secs: 300,
            detail_delay_millis: 50,
            output: "output.csv".to_string(),
        };
        let config = ListingConfig::from(&settings);

        assert_eq!(config.partitions, vec!['p', 'q', 'r']);
        assert_eq!(config.base_url, BASE);
        assert_eq!(config.retry_base_delay, Duration::from_secs(300));
    }
}
