use std::collections::HashSet;

use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::domain::profile::{HarvestedProfile, ListingRecord};

use super::FetchedPage;

const LISTING_LINK_SELECTOR: &str = "#main-content > section.fl-profiles.fl-container > div.fl-profiles-list-wrapper > ol > li > div.fl-profiles-list-header > a";
const SEARCH_PAGE_TITLE: &str = "Attorney Licensee Search";

/// Pulls one profile out of a sequential-id detail page.
pub trait ProfileExtractor: Send + Sync {
    fn extract_profile(&self, page: &FetchedPage) -> Option<HarvestedProfile>;
}

/// Pulls profile links out of a listing page and one record out of each
/// profile page they lead to.
pub trait ListingExtractor: Send + Sync {
    fn extract_listing(&self, page: &FetchedPage) -> Vec<ListingLink>;
    fn extract_detail(&self, page: &FetchedPage) -> Option<ListingRecord>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLink {
    pub url: String,
    pub label: String,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

fn inner_text(element: ElementRef) -> String {
    element.text().join(" ").split_whitespace().join(" ")
}

fn resolve_href(page_url: &str, href: &str) -> String {
    match Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Licensee detail pages keyed by a numeric id.
#[derive(Debug, Default, Clone, Copy)]
pub struct LicenseeDetailExtractor;

impl ProfileExtractor for LicenseeDetailExtractor {
    fn extract_profile(&self, page: &FetchedPage) -> Option<HarvestedProfile> {
        let document = Html::parse_document(&page.source);
        let container = document.select(&selector("#moduleMemberDetail")).next()?;

        let name = member_name(container).or_else(|| title_name(&document))?;

        let paragraphs: Vec<ElementRef> = container.select(&selector("p")).collect();
        let labelled = |label: &str| {
            paragraphs
                .iter()
                .copied()
                .find(|p| inner_text(*p).contains(label))
        };

        let (city, state) = labelled("Address:")
            .map(|p| {
                let address = p.text().join("\n").replacen("Address:", "", 1);
                split_city_state(address.trim())
            })
            .unwrap_or_default();

        let website = labelled("Website:")
            .map(|p| website_from_paragraph(page, p))
            .unwrap_or_default();

        let email = labelled("Email:").and_then(|p| visible_email(&document, p));

        Some(HarvestedProfile {
            name,
            city,
            state,
            status: license_status(container),
            website,
            email,
        })
    }
}

/// Name from the `Name #123456` heading.
fn member_name(container: ElementRef) -> Option<String> {
    container
        .select(&selector("h3 > b"))
        .map(inner_text)
        .find(|text| text.contains('#'))
        .map(|text| strip_member_number(&text))
        .filter(|name| !name.is_empty())
}

fn title_name(document: &Html) -> Option<String> {
    let title = document
        .select(&selector("title"))
        .next()
        .map(inner_text)?;
    let name = title.split('-').next().unwrap_or_default().trim();

    match name.is_empty() || name == SEARCH_PAGE_TITLE {
        true => None,
        false => Some(name.to_string()),
    }
}

fn strip_member_number(text: &str) -> String {
    let Some(hash) = text.find('#') else {
        return text.trim().to_string();
    };
    let digits_end = text[hash + 1..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| hash + 1 + i)
        .unwrap_or(text.len());

    format!("{}{}", &text[..hash], &text[digits_end..])
        .split_whitespace()
        .join(" ")
}

fn license_status(container: ElementRef) -> Option<String> {
    let label = container
        .select(&selector("b"))
        .find(|b| inner_text(*b).contains("License Status:"))?;

    let status = match label.select(&selector("span")).next() {
        Some(span) => inner_text(span),
        None => inner_text(label).replace("License Status:", "").trim().to_string(),
    };

    match status.is_empty() {
        true => None,
        false => Some(status),
    }
}

/// `Street, City, ST ZIP` → (`City`, `ST`). Addresses without a comma are
/// taken whole as the city.
pub fn split_city_state(address: &str) -> (String, String) {
    let parts: Vec<&str> = address.split(',').collect();
    if parts.len() < 2 {
        return (address.split_whitespace().join(" "), String::new());
    }

    let state_zip = parts[parts.len() - 1].trim();
    let state: String = state_zip.chars().take(2).collect();
    let state = match state.len() == 2 && state.chars().all(|c| c.is_ascii_uppercase()) {
        true => state,
        false => String::new(),
    };

    // Street lines are separated by line breaks, the city sits on the last one.
    let city = parts[parts.len() - 2]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or_default()
        .to_string();

    (city, state)
}

fn website_from_paragraph(page: &FetchedPage, paragraph: ElementRef) -> String {
    if let Some(href) = paragraph
        .select(&selector("a"))
        .next()
        .and_then(|a| a.value().attr("href"))
    {
        return resolve_href(&page.url, href);
    }

    let text = inner_text(paragraph).replace("Website:", "").trim().to_string();
    match text == "Not Available" {
        true => String::new(),
        false => text,
    }
}

/// The page renders several decoy addresses and hides all but one with
/// `display:none` rules.
fn visible_email(document: &Html, paragraph: ElementRef) -> Option<String> {
    let hidden = hidden_element_ids(document);

    paragraph
        .select(&selector(r#"span[id^="e"]"#))
        .filter(|span| {
            let id = span.value().id().unwrap_or_default();
            let inline_hidden = span
                .value()
                .attr("style")
                .map(declares_display_none)
                .unwrap_or(false);
            !hidden.contains(id) && !inline_hidden
        })
        .filter_map(|span| span.select(&selector("a")).next().map(inner_text))
        .find(|email| !email.is_empty())
}

fn declares_display_none(declarations: &str) -> bool {
    declarations
        .to_lowercase()
        .split_whitespace()
        .join("")
        .contains("display:none")
}

fn hidden_element_ids(document: &Html) -> HashSet<String> {
    let mut hidden = HashSet::new();

    for style in document.select(&selector("style")) {
        let css = style.text().join("");
        for rule in css.split('}') {
            let Some((selectors, declarations)) = rule.split_once('{') else {
                continue;
            };
            if !declares_display_none(declarations) {
                continue;
            }
            for sel in selectors.split(',') {
                if let Some(id) = sel.trim().strip_prefix('#') {
                    hidden.insert(id.to_string());
                }
            }
        }
    }

    hidden
}

/// Alphabetical lawyer listing whose entries link to profile pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileListingExtractor;

impl ListingExtractor for ProfileListingExtractor {
    fn extract_listing(&self, page: &FetchedPage) -> Vec<ListingLink> {
        let document = Html::parse_document(&page.source);

        document
            .select(&selector(LISTING_LINK_SELECTOR))
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                Some(ListingLink {
                    url: resolve_href(&page.url, href),
                    label: inner_text(a),
                })
            })
            .collect()
    }

    fn extract_detail(&self, page: &FetchedPage) -> Option<ListingRecord> {
        let document = Html::parse_document(&page.source);

        let name = document
            .select(&selector("h1"))
            .next()
            .map(inner_text)
            .unwrap_or_default();

        let website = document
            .select(&selector(".profile-website-header"))
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve_href(&page.url, href))
            .unwrap_or_default();

        match website.is_empty() {
            true => None,
            false => Some(ListingRecord { name, website }),
        }
    }
}
