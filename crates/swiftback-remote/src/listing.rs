use crate::client::{escape_query, SwiftClient};
use crate::RemoteError;
use std::collections::HashSet;
use tracing::{debug, info};

const PAGE_LIMIT: usize = 10_000;

/// Snapshot of the object names under the destination prefix, taken once
/// before the remote-digest stage starts. Read-only afterwards: the
/// pipeline treats it as an immutable existence oracle keyed by relative
/// path.
pub struct RemoteIndex {
    names: HashSet<String>,
}

impl RemoteIndex {
    /// List the container with marker pagination until exhaustion,
    /// stripping the `{dst_folder}/` prefix from every name.
    pub fn fetch(
        client: &SwiftClient,
        endpoint: &str,
        container: &str,
        dst_folder: &str,
    ) -> Result<Self, RemoteError> {
        let prefix = format!("{dst_folder}/");
        let mut names = HashSet::new();
        let mut marker = String::new();

        loop {
            let mut url = format!(
                "{endpoint}/{container}?format=plain&limit={PAGE_LIMIT}&prefix={}",
                escape_query(&prefix)
            );
            if !marker.is_empty() {
                url.push_str("&marker=");
                url.push_str(&escape_query(&marker));
            }

            let body = client.get_text(&url)?;
            let mut page_len = 0usize;
            for line in body.lines() {
                let name = line.trim();
                if name.is_empty() {
                    continue;
                }
                page_len += 1;
                marker = name.to_owned();
                if let Some(rel) = name.strip_prefix(&prefix) {
                    names.insert(rel.to_owned());
                }
            }
            debug!("listing page: {page_len} names");
            if page_len == 0 {
                break;
            }
        }

        info!("remote listing: {} objects under '{prefix}'", names.len());
        Ok(Self { names })
    }

    pub fn exists(&self, rel_key: &str) -> bool {
        self.names.contains(rel_key)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<String> for RemoteIndex {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
