//! Asset manifest resolution.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Ordered list of locators preloaded at install time.
///
/// Entries are relative paths, resolved against the application root, or
/// absolute URLs for third-party resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Vec<String>);

impl Manifest {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(entries.into_iter().map(Into::into).collect())
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve every entry against `root`.
    ///
    /// Fragments are dropped and duplicate URLs collapse to their first
    /// occurrence, so the result is in manifest order.
    pub fn resolve(&self, root: &Url) -> Result<Vec<Url>, Error> {
        let mut resolved: Vec<Url> = Vec::with_capacity(self.0.len());
        for entry in &self.0 {
            let mut url = root
                .join(entry.trim())
                .map_err(|e| Error::InvalidUrl(format!("manifest entry {entry:?}: {e}")))?;
            url.set_fragment(None);
            if !resolved.contains(&url) {
                resolved.push(url);
            }
        }
        Ok(resolved)
    }

    /// Entries that resolve to a URL already produced by an earlier entry.
    pub fn duplicates(&self, root: &Url) -> Vec<&str> {
        let mut seen: Vec<Url> = Vec::new();
        let mut dups = Vec::new();
        for entry in &self.0 {
            let Ok(mut url) = root.join(entry.trim()) else { continue };
            url.set_fragment(None);
            if seen.contains(&url) {
                dups.push(entry.as_str());
            } else {
                seen.push(url);
            }
        }
        dups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Url {
        Url::parse("https://example.com/app/").unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let manifest = Manifest::new(["./", "./index.html", "/favicon.ico", "https://cdn.example.net/lib.js"]);
        let urls: Vec<String> = manifest.resolve(&root()).unwrap().into_iter().map(String::from).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/app/",
                "https://example.com/app/index.html",
                "https://example.com/favicon.ico",
                "https://cdn.example.net/lib.js",
            ]
        );
    }

    #[test]
    fn test_resolve_dedups() {
        let manifest = Manifest::new(["./index.html", "index.html", "./index.html#main"]);
        assert_eq!(manifest.resolve(&root()).unwrap().len(), 1);
        assert_eq!(manifest.duplicates(&root()), vec!["index.html", "./index.html#main"]);
    }

    #[test]
    fn test_resolve_invalid_entry() {
        let manifest = Manifest::new(["http://[::1"]);
        assert!(matches!(manifest.resolve(&root()), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::default();
        assert!(manifest.is_empty());
        assert!(manifest.resolve(&root()).unwrap().is_empty());
    }
}
