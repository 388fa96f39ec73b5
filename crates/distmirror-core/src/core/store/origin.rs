use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT_ENCODING;
use tracing::debug;
use url::Url;

use crate::config::keep_proxies;
use crate::effects::OriginClient;

const USER_AGENT: &str = concat!("distmirror/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Builds `<origin>/sources/<package>/<branch>/<hash>`.
pub fn origin_url(origin: &Url, package: &str, branch: &str, hash: &str) -> Result<Url> {
    let mut url = origin.clone();
    url.path_segments_mut()
        .map_err(|()| anyhow!("origin URL {origin} cannot be a base"))?
        .pop_if_empty()
        .extend(["sources", package, branch, hash]);
    Ok(url)
}

/// Lookaside cache client speaking plain HTTP GET.
pub struct HttpOrigin {
    client: Client,
}

impl HttpOrigin {
    /// # Errors
    /// Returns an error if the underlying client cannot be built.
    pub fn new() -> Result<Self> {
        let builder = Client::builder().user_agent(USER_AGENT).timeout(HTTP_TIMEOUT);
        let builder = if keep_proxies() {
            builder
        } else {
            builder.no_proxy()
        };
        Ok(Self {
            client: builder.build().context("failed to build HTTP client")?,
        })
    }
}

impl OriginClient for HttpOrigin {
    fn download(&self, url: &Url) -> Result<Vec<u8>> {
        debug!(%url, "downloading from origin");
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT_ENCODING, "*")
            .send()
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("unexpected response for {url}"))?;
        let body = response
            .bytes()
            .with_context(|| format!("failed to read the body of {url}"))?;
        Ok(body.to_vec())
    }
}
