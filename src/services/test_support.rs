//! Fixture documents and in-memory collaborators shared by the service tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::error::{FetchError, StoreError};

use super::{FetchedPage, PageFetcher, Sink};

pub fn listing_page_html(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .enumerate()
        .map(|(i, href)| {
            format!(
                r#"<li><div class="fl-profiles-list-header"><a href="{}">Profile {}</a></div></li>"#,
                href, i
            )
        })
        .collect();

    format!(
        r#"<html><body><div id="main-content">
            <section class="fl-profiles fl-container">
                <div class="fl-profiles-list-wrapper"><ol>{}</ol></div>
            </section>
        </div></body></html>"#,
        items
    )
}

pub fn listing_detail_html(name: &str, website: Option<&str>) -> String {
    let website = website
        .map(|w| format!(r#"<a class="profile-website-header" href="{}">Website</a>"#, w))
        .unwrap_or_default();

    format!(
        "<html><body><h1>{}</h1><div>{}</div></body></html>",
        name, website
    )
}

pub fn licensee_html(name: &str, id: u64, website: &str) -> String {
    format!(
        r#"<html><head><title>{name} - Attorney Licensee Search</title></head><body>
        <div id="moduleMemberDetail">
            <h3><b>{name} #{id}</b></h3>
            <p>Address: 1 Main St, Fresno, CA 93721</p>
            <p>Website: <a href="{website}">{website}</a></p>
        </div></body></html>"#
    )
}

pub enum Scripted {
    Page(String),
    Transport,
    NotFound,
}

/// Answers each url from a queue of scripted responses and records every
/// request. Urls without a script answer `NotFound`.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn script(&self, url: &str, responses: Vec<Scripted>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(responses);
    }

    pub fn page(&self, url: &str, html: String) {
        self.script(url, vec![Scripted::Page(html)]);
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Scripted::Page(source)) => Ok(FetchedPage {
                url: url.to_string(),
                status: Some(200),
                source,
            }),
            Some(Scripted::Transport) => Err(FetchError::transport(url, "connection reset")),
            Some(Scripted::NotFound) | None => Err(FetchError::NotFound(url.to_string())),
        }
    }
}

/// Collects appended records, optionally failing every write.
pub struct VecSink<R> {
    pub records: Vec<R>,
    pub fail: bool,
}

impl<R> Default for VecSink<R> {
    fn default() -> Self {
        VecSink {
            records: vec![],
            fail: false,
        }
    }
}

#[async_trait]
impl<R: Clone + Send + Sync> Sink<R> for VecSink<R> {
    async fn append(&mut self, record: &R) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.records.push(record.clone());
        Ok(())
    }
}
