//! Idempotent single-file HTTP retrieval.
//!
//! A destination that already exists is never re-fetched; that existence
//! check is what makes a full re-run safe after a partial one. Bodies are
//! streamed to `<dest>.part` and renamed into place only once complete.

use std::path::{Path, PathBuf};

use reqwest::{Client, StatusCode, header::LOCATION, redirect::Policy};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;

use sitemigrate_shared::{Result, SiteMigrateError};

/// User-Agent string for media requests.
const USER_AGENT: &str = concat!("sitemigrate/", env!("CARGO_PKG_VERSION"));

/// Result of a single retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The body was written to the destination.
    Downloaded { bytes: u64 },
    /// The destination already existed; no request was made.
    Skipped,
}

/// HTTP client that follows 301/302 itself, up to a fixed hop count.
pub struct Fetcher {
    client: Client,
    max_redirects: u32,
}

impl Fetcher {
    /// Create a fetcher. The client never follows redirects on its own and
    /// applies no request timeout.
    pub fn new(max_redirects: u32) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()
            .map_err(|e| SiteMigrateError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_redirects,
        })
    }

    /// Download `url` to `dest` unless `dest` already exists.
    #[instrument(skip(self), fields(dest = %dest.display()))]
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome> {
        if tokio::fs::try_exists(dest)
            .await
            .map_err(|e| SiteMigrateError::io(dest, e))?
        {
            debug!("destination exists, skipping");
            return Ok(FetchOutcome::Skipped);
        }

        let response = self.get_following_redirects(url).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SiteMigrateError::io(parent, e))?;
        }

        let part = part_path(dest);
        match stream_to_file(response, &part).await {
            Ok(bytes) => {
                tokio::fs::rename(&part, dest)
                    .await
                    .map_err(|e| SiteMigrateError::io(dest, e))?;
                debug!(bytes, "downloaded");
                Ok(FetchOutcome::Downloaded { bytes })
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    /// Issue a GET, re-issuing it to `Location` on 301/302.
    async fn get_following_redirects(&self, url: &str) -> Result<reqwest::Response> {
        let mut current = Url::parse(url)
            .map_err(|e| SiteMigrateError::validation(format!("invalid URL '{url}': {e}")))?;
        let mut hops = 0;

        loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| SiteMigrateError::Network(format!("{current}: {e}")))?;

            match response.status() {
                StatusCode::OK => return Ok(response),
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => {
                    if hops >= self.max_redirects {
                        return Err(SiteMigrateError::TooManyRedirects {
                            url: url.to_string(),
                            hops,
                        });
                    }
                    let location = response
                        .headers()
                        .get(LOCATION)
                        .and_then(|v| v.to_str().ok())
                        .ok_or_else(|| {
                            SiteMigrateError::Network(format!(
                                "{current}: redirect without a Location header"
                            ))
                        })?;
                    let next = current.join(location).map_err(|e| {
                        SiteMigrateError::Network(format!(
                            "{current}: bad redirect target '{location}': {e}"
                        ))
                    })?;
                    debug!(from = %current, to = %next, "following redirect");
                    current = next;
                    hops += 1;
                }
                status => {
                    return Err(SiteMigrateError::Http {
                        url: current.to_string(),
                        status: status.as_u16(),
                    });
                }
            }
        }
    }
}

async fn stream_to_file(mut response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| SiteMigrateError::io(path, e))?;
    let mut bytes = 0u64;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| SiteMigrateError::Network(format!("body read failed: {e}")))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| SiteMigrateError::io(path, e))?;
        bytes += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| SiteMigrateError::io(path, e))?;
    Ok(bytes)
}

/// `photo.png` -> `photo.png.part`
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
