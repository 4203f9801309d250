//! Navigation side effect: opening reference docs in the default browser.

/// Builds the docs URL for an API name by plain concatenation. No
/// escaping; whatever the user typed goes on the end.
pub fn docs_url(base_url: &str, term: &str) -> String {
    format!("{base_url}{term}")
}

/// Opens `url` in the default browser, fire-and-forget.
///
/// Failure (headless host, no registered browser) is logged and swallowed.
pub fn open_docs(url: &str) {
    if let Err(e) = webbrowser::open(url) {
        log::warn!("could not open {url} in a browser: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docs_url_appends_the_term() {
        assert_eq!(
            docs_url("https://developer.chrome.com/docs/extensions/reference/", "tabs"),
            "https://developer.chrome.com/docs/extensions/reference/tabs"
        );
    }

    #[test]
    fn test_docs_url_does_not_escape() {
        assert_eq!(docs_url("https://d.test/", "a b"), "https://d.test/a b");
    }
}
