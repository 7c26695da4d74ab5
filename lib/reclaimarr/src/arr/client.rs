use crate::error::{LifecycleError, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

pub const DEFAULT_CACHE_TTL_SECS: i64 = 300;

/// HTTP plumbing shared by the Sonarr and Radarr v3 APIs.
#[derive(Debug, Clone)]
pub(crate) struct ArrClient {
    service: &'static str,
    base_url: Url,
    api_key: String,
    client: Client,
}

impl ArrClient {
    pub fn new(
        service: &'static str,
        base_url: Option<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let base_url_str = base_url.ok_or(LifecycleError::NotConfigured(service))?;
        let api_key = api_key.ok_or(LifecycleError::NotConfigured(service))?;
        let base_url = Url::parse(&format!("{}/", base_url_str.trim_end_matches('/')))?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LifecycleError::transport(service, e))?;
        Ok(Self {
            service,
            base_url,
            api_key,
            client,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = self.base_url.join(&format!("api/v3/{endpoint}"))?;
        debug!("Request: {} {}", method, url);
        let mut request = self
            .client
            .request(method, url)
            .header("X-Api-Key", &self.api_key);
        if let Some(b) = body {
            request = request.json(b);
        }
        let response = request
            .send()
            .await
            .map_err(|e| LifecycleError::transport(self.service, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LifecycleError::transport(self.service, e))?;
        if !status.is_success() {
            return Err(LifecycleError::Api {
                service: self.service,
                status: status.as_u16(),
                message: text,
            });
        }
        let body = if text.trim().is_empty() {
            "null"
        } else {
            text.as_str()
        };
        serde_json::from_str(body).map_err(|e| LifecycleError::Api {
            service: self.service,
            status: status.as_u16(),
            message: format!("JSON parse error: {e}"),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.request(Method::GET, endpoint, None::<&()>).await
    }

    /// The v3 APIs update a resource by PUTting it back whole.
    pub async fn set_unmonitored(&self, endpoint: &str) -> Result<()> {
        let mut resource: serde_json::Value = self.get(endpoint).await?;
        match resource.as_object_mut() {
            Some(object) => {
                object.insert("monitored".to_string(), serde_json::Value::Bool(false));
            }
            None => {
                return Err(LifecycleError::Api {
                    service: self.service,
                    status: 200,
                    message: format!("unexpected payload for {endpoint}"),
                })
            }
        }
        let _: serde_json::Value = self
            .request(Method::PUT, endpoint, Some(&resource))
            .await?;
        Ok(())
    }

    pub async fn check_connection(&self) -> bool {
        self.get::<serde_json::Value>("system/status").await.is_ok()
    }
}

/// Catalog listing cached for a short time, so one analysis run or
/// deletion batch lists the tracker once instead of once per item.
#[derive(Debug, Clone)]
pub(crate) struct ListingCache<T> {
    entries: Arc<Mutex<Option<(DateTime<Utc>, Arc<Vec<T>>)>>>,
    ttl: Duration,
}

impl<T> ListingCache<T> {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: Arc::new(Mutex::new(None)),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<Arc<Vec<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<T>>>,
    {
        let mut guard = self.entries.lock().await;
        if let Some((fetched_at, entries)) = guard.as_ref() {
            if Utc::now() - *fetched_at < self.ttl {
                return Ok(Arc::clone(entries));
            }
        }
        let entries = Arc::new(fetch().await?);
        *guard = Some((Utc::now(), Arc::clone(&entries)));
        Ok(entries)
    }

    pub async fn invalidate(&self) {
        *self.entries.lock().await = None;
    }
}
