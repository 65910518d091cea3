use async_trait::async_trait;
use thirtyfour::{
    error::WebDriverError, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver, WindowHandle,
};

use crate::{configuration::BrowserSettings, error::FetchError};

use super::{FetchedPage, PageFetcher};

/// One Chrome session shared by a harvester for its whole run.
pub struct Droid {
    pub driver: WebDriver,
}

impl Droid {
    pub async fn new(settings: &BrowserSettings) -> Result<Self, WebDriverError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_headless()?;
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-setuid-sandbox")?;
        // Images are never read by the extractors.
        caps.add_arg("--blink-settings=imagesEnabled=false")?;
        if let Some(user_agent) = &settings.user_agent {
            caps.add_arg(&format!("--user-agent={}", user_agent))?;
        }

        let driver = WebDriver::new(settings.webdriver_url.as_str(), caps).await?;
        driver
            .set_page_load_timeout(settings.page_load_timeout())
            .await?;

        log::info!("Started browser session on {}", settings.webdriver_url);

        Ok(Droid { driver })
    }

    pub async fn quit(self) -> Result<(), WebDriverError> {
        self.driver.quit().await
    }
}

/// Window operations a tab-scoped fetch is built from.
#[async_trait]
pub trait TabSession: Send + Sync {
    type Tab: Clone + Send + Sync;

    async fn current_tab(&self) -> Result<Self::Tab, FetchError>;
    /// Opens a tab without focusing it.
    async fn open_tab(&self) -> Result<Self::Tab, FetchError>;
    async fn switch_tab(&self, tab: Self::Tab) -> Result<(), FetchError>;
    /// Closes the focused tab.
    async fn close_tab(&self) -> Result<(), FetchError>;
    async fn page_source(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl TabSession for WebDriver {
    type Tab = WindowHandle;

    async fn current_tab(&self) -> Result<WindowHandle, FetchError> {
        Ok(self.window().await?)
    }

    async fn open_tab(&self) -> Result<WindowHandle, FetchError> {
        Ok(self.new_tab().await?)
    }

    async fn switch_tab(&self, tab: WindowHandle) -> Result<(), FetchError> {
        Ok(self.switch_to_window(tab).await?)
    }

    async fn close_tab(&self) -> Result<(), FetchError> {
        Ok(self.close_window().await?)
    }

    async fn page_source(&self, url: &str) -> Result<String, FetchError> {
        self.goto(url)
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        self.source()
            .await
            .map_err(|e| FetchError::transport(url, e))
    }
}

/// Loads `url` in a fresh tab. Once the tab exists it is closed and focus
/// returns home on every path, whatever failed in between.
pub async fn fetch_in_tab<S: TabSession>(session: &S, url: &str) -> Result<FetchedPage, FetchError> {
    let home = session.current_tab().await?;
    let tab = session.open_tab().await?;

    let loaded = match session.switch_tab(tab.clone()).await {
        Ok(()) => session.page_source(url).await,
        Err(e) => Err(e),
    };
    let released = release_tab(session, tab, home).await;

    match (loaded, released) {
        (Ok(source), Ok(())) => Ok(FetchedPage {
            url: url.to_string(),
            status: None,
            source,
        }),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), released) => {
            if let Err(close_err) = released {
                log::error!("Failed to release tab for {}: {}", url, close_err);
            }
            Err(e)
        }
    }
}

async fn release_tab<S: TabSession>(session: &S, tab: S::Tab, home: S::Tab) -> Result<(), FetchError> {
    // Focus may still be on home if the first switch failed.
    let closed = match session.switch_tab(tab).await {
        Ok(()) => session.close_tab().await,
        Err(e) => Err(e),
    };
    session.switch_tab(home).await?;
    closed
}

#[async_trait]
impl PageFetcher for Droid {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        fetch_in_tab(&self.driver, url).await
    }
}
