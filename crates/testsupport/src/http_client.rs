use anyhow::Result;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;

pub struct ProbeClient {
    client: Client,
}

impl ProbeClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Poll until the service answers on its published port or attempts
    /// run out. Any HTTP response counts; only connection failures keep
    /// the poll going.
    pub async fn wait_for_http(&self, url: &str, attempts: u32, delay: Duration) -> bool {
        for _ in 0..attempts {
            if self.client.get(url).send().await.is_ok() {
                return true;
            }
            sleep(delay).await;
        }
        false
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        Ok(response.text().await?)
    }
}

impl Default for ProbeClient {
    fn default() -> Self {
        Self::new()
    }
}
