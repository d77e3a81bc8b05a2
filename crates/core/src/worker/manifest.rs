//! Static asset manifest precached at install.

use std::collections::HashSet;

use url::Url;

use crate::Error;
use crate::request::{CacheMode, RequestDescriptor};
use crate::url::resolve;

/// Ordered, de-duplicated list of absolute asset URLs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetManifest {
    urls: Vec<Url>,
}

impl AssetManifest {
    /// Resolve manifest entries against the application origin.
    ///
    /// Two entries that resolve to the same URL are rejected, the way
    /// `Cache.addAll` refuses duplicate requests.
    pub fn resolve(origin: &Url, entries: &[String]) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        let mut urls = Vec::with_capacity(entries.len());

        for entry in entries {
            let url = resolve(origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")))?;
            if !seen.insert(url.clone()) {
                return Err(Error::InvalidInput(format!("duplicate manifest entry: {url}")));
            }
            urls.push(url);
        }

        Ok(Self { urls })
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(url)
    }

    /// Install-time requests: `GET`, bypassing intermediate HTTP caches.
    pub fn requests(&self) -> impl Iterator<Item = RequestDescriptor> + '_ {
        self.urls.iter().map(|url| RequestDescriptor {
            url: url.clone(),
            method: "GET".into(),
            destination: crate::request::Destination::Empty,
            mode: crate::request::RequestMode::Cors,
            cache: CacheMode::Reload,
        })
    }
}
