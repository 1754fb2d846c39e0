// gachabot-core/src/snapshot.rs
//
// The production snapshot source: one GET against the storefront's pack
// listing endpoint. Site-specific DOM scraping lives outside this crate;
// whatever produces the listing only has to serve the normalized record
// shape.

use tokio::sync::Mutex;
use tracing::debug;

use async_trait::async_trait;

use gachabot_common::models::BannerSnapshot;
use gachabot_common::traits::SnapshotSource;
use gachabot_common::Error;

pub struct HttpSnapshotSource {
    endpoint: String,
    /// Built lazily per scrape session and dropped by `close`, so a timed
    /// out attempt never leaks its connections into the next one.
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpSnapshotSource {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<Vec<BannerSnapshot>, Error> {
        let client = {
            let mut guard = self.client.lock().await;
            guard
                .get_or_insert_with(|| {
                    reqwest::Client::builder()
                        .user_agent("gachabot")
                        .build()
                        .unwrap_or_default()
                })
                .clone()
        };

        let response = client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::Source(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Source(format!("bad status: {e}")))?;

        let banners: Vec<BannerSnapshot> = response
            .json()
            .await
            .map_err(|e| Error::Source(format!("malformed listing: {e}")))?;

        debug!("snapshot source returned {} records", banners.len());
        Ok(banners)
    }

    async fn close(&self) {
        let mut guard = self.client.lock().await;
        if guard.take().is_some() {
            debug!("snapshot source session released");
        }
    }
}
