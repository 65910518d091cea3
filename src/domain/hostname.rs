use url::Url;

/// Normalized authority of a website url: lowercased host with any leading
/// `www.` labels removed. Returns `None` when no host can be found.
///
/// Applying it to its own output yields the same value.
pub fn canonical_hostname(website: &str) -> Option<String> {
    let website = website.trim();
    if website.is_empty() {
        return None;
    }

    let host = parse_absolute_host(website).or_else(|| fallback_host(website))?;

    let mut host = host.trim_end_matches('.');
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest;
    }

    match host.is_empty() {
        true => None,
        false => Some(host.to_string()),
    }
}

fn parse_absolute_host(website: &str) -> Option<String> {
    if !website.contains("://") {
        return None;
    }

    let parsed_url = Url::parse(website).ok()?;
    match parsed_url.host_str() {
        Some("") | None => None,
        Some(host) => Some(host.to_lowercase()),
    }
}

/// Host of strings like `example.com/path` or `http://exa mple.com` that
/// `Url::parse` rejects: text after an optional scheme up to the first
/// `/`, `:`, `?` or `#`.
pub fn fallback_host(website: &str) -> Option<String> {
    let lowered = website.trim().to_lowercase();
    let rest = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    if rest.contains("://") {
        return None;
    }

    // Bracketed ipv6 literals carry their own colons.
    let candidate = match rest.strip_prefix('[').and_then(|r| r.split_once(']')) {
        Some((literal, _)) => &rest[..literal.len() + 2],
        None => rest
            .split(['/', ':', '?', '#'])
            .next()
            .unwrap_or_default()
            .trim(),
    };

    if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
        return None;
    }

    // Route through the url parser so punycode and casing match the absolute path.
    match Url::parse(&format!("http://{}", candidate)) {
        Ok(parsed_url) => parsed_url
            .host_str()
            .filter(|h| !h.is_empty())
            .map(|h| h.to_string()),
        Err(_) => Some(candidate.to_string()),
    }
}
