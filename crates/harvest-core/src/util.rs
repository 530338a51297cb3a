use scraper::ElementRef;
use url::Url;

/// First non-blank text node directly under `element`, trimmed.
///
/// Text of nested elements is not considered.
pub fn own_text<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
}

/// Resolve `href` against `base`. Absolute hrefs are returned as-is.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }
    Url::parse(base)
        .ok()?
        .join(href)
        .ok()
        .map(|url| url.to_string())
}

/// Cheap pseudo-random number in `[0, max)`, seeded from the clock.
///
/// Xorshift over the current time in nanoseconds. Good enough for delay
/// jitter and User-Agent picks, not for anything security related.
pub fn random_below(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    // xorshift64 never leaves zero
    x |= 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max
}
