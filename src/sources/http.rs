use crate::vr::pipeline::FeedSource;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::time::Duration;

/// Blocking client for the remote feed service.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: Client,
    base_url: String,
}

pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

impl HttpFeed {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim().to_string(),
        })
    }

    fn get_text(&self, path: &str) -> Result<String> {
        let url = endpoint(&self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("GET {url} failed"))?;
        if !response.status().is_success() {
            anyhow::bail!("GET {url} returned status {}", response.status());
        }
        response
            .text()
            .with_context(|| format!("failed to read body of {url}"))
    }
}

impl FeedSource for HttpFeed {
    fn fetch_rows(&self) -> Result<String> {
        self.get_text("")
    }

    fn fetch_discord(&self) -> Result<String> {
        self.get_text("discord")
    }
}
