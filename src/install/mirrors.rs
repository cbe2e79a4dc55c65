use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Builds the ordered list of download candidates for one tool version.
#[derive(Debug, Clone)]
pub struct MirrorResolver {
    /// Template with `{version}` and `{mirror}` placeholders.
    mirror_link: String,
    /// Template with a `{version}` placeholder; always the last candidate.
    download_link: String,
}

fn mirror_item_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"<li id="([^"]*?)">"#).ok())
        .as_ref()
}

impl MirrorResolver {
    #[must_use]
    pub fn new(mirror_link: impl Into<String>, download_link: impl Into<String>) -> Self {
        Self {
            mirror_link: mirror_link.into(),
            download_link: download_link.into(),
        }
    }

    /// The direct download URL used when no mirror works or none are listed.
    #[must_use]
    pub fn canonical(&self, version: &str) -> String {
        self.download_link.replace("{version}", version)
    }

    /// Extracts mirror ids from a mirror-listing page and returns one URL per
    /// id, followed by the canonical URL. Duplicates are dropped, first
    /// occurrence wins.
    #[must_use]
    pub fn resolve(&self, page_source: Option<&str>, version: &str) -> Vec<String> {
        let mut links: Vec<String> = Vec::new();
        if let Some(page) = page_source {
            debug!("Parsing mirrors...");
            if let Some(pattern) = mirror_item_pattern() {
                for captures in pattern.captures_iter(page) {
                    let Some(mirror) = captures.get(1).map(|m| m.as_str().trim()) else {
                        continue;
                    };
                    if mirror.is_empty() {
                        continue;
                    }
                    let encoded: String = url::form_urlencoded::byte_serialize(mirror.as_bytes()).collect();
                    let link = self
                        .mirror_link
                        .replace("{version}", version)
                        .replace("{mirror}", &encoded);
                    if !links.contains(&link) {
                        links.push(link);
                    }
                }
            }
        }
        let canonical = self.canonical(version);
        if !links.contains(&canonical) {
            links.push(canonical);
        }
        debug!("Total mirrors: {}", links.len());
        links
    }
}
