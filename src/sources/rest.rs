//! Pooled, TTL-cached, single-flight, retrying REST client (§4.2).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value as Json;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;

use crate::error::{Error, Result};

const MAX_CACHE_ENTRIES: usize = 1024;
const DEFAULT_TTL: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

/// Credential a pool client authenticates with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Credential {
    ApiKey(String),
    Bearer(String),
}

impl Credential {
    fn header(&self) -> (&'static str, String) {
        match self {
            Self::ApiKey(key) => ("x-api-key", key.clone()),
            Self::Bearer(token) => ("Authorization", format!("Bearer {token}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    base_url: String,
    credential: Credential,
}

struct CacheEntry {
    body: Json,
    inserted_at: Instant,
}

/// Bounded, evict-oldest, TTL-bounded cache. A small hand-rolled structure
/// (order tracked via an explicit queue) rather than a crate dependency —
/// the policy here (evict-oldest plus whole-cache clear) is simple enough
/// not to warrant pulling in a general-purpose LRU implementation.
struct Cache {
    entries: std::collections::HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    ttl: Duration,
}

impl Cache {
    fn new(ttl: Duration) -> Self {
        Self { entries: std::collections::HashMap::new(), order: VecDeque::new(), ttl }
    }

    fn get(&self, key: &str) -> Option<Json> {
        self.entries.get(key).and_then(|entry| {
            if entry.inserted_at.elapsed() < self.ttl {
                Some(entry.body.clone())
            } else {
                None
            }
        })
    }

    fn insert(&mut self, key: String, body: Json) {
        if !self.entries.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.entries.insert(key, CacheEntry { body, inserted_at: Instant::now() });
        while self.entries.len() > MAX_CACHE_ENTRIES {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// One pooled client for a `(base_url, credential)` pair.
pub struct PoolClient {
    base_url: String,
    credential: Credential,
    http: reqwest::Client,
    cache: AsyncMutex<Cache>,
    closed: std::sync::atomic::AtomicBool,
}

/// Canonically-sort a parameter map into a stable cache-key suffix.
fn canonical_params(params: &[(String, String)]) -> String {
    let mut sorted = params.to_vec();
    sorted.sort();
    sorted
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

impl PoolClient {
    fn new(base_url: String, credential: Credential) -> Self {
        Self {
            base_url,
            credential,
            http: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_default(),
            cache: AsyncMutex::new(Cache::new(DEFAULT_TTL)),
            closed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(std::sync::atomic::Ordering::Acquire) {
            return Err(Error::Closed(format!("pool client for {} is closed", self.base_url)));
        }
        Ok(())
    }

    /// `GET path?params`, with TTL cache and single-flight on miss.
    pub async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Json> {
        self.ensure_open()?;
        let key = format!("{path}?{}", canonical_params(params));

        // Holding the mutex for the whole miss path is the single-flight
        // guard: a second concurrent miss blocks here and then observes
        // the first caller's cached result (double-checked locking).
        let mut cache = self.cache.lock().await;
        if let Some(body) = cache.get(&key) {
            return Ok(body);
        }

        let body = self.fetch_with_retry(reqwest::Method::GET, path, params, None, None).await?;
        cache.insert(key, body.clone());
        Ok(body)
    }

    /// `POST`/`PUT`/`DELETE`. No cache lookup; caller opts into a
    /// whole-cache clear via `invalidate_cache` and may override the
    /// client's bearer token for just this call.
    pub async fn mutate(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Json>,
        invalidate_cache: bool,
        bearer_override: Option<&str>,
    ) -> Result<Json> {
        self.ensure_open()?;
        let result = self.fetch_with_retry(method, path, &[], body, bearer_override).await?;
        if invalidate_cache {
            self.cache.lock().await.clear();
        }
        Ok(result)
    }

    async fn fetch_with_retry(
        &self,
        method: reqwest::Method,
        path: &str,
        params: &[(String, String)],
        body: Option<Json>,
        bearer_override: Option<&str>,
    ) -> Result<Json> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let (header_name, header_value) = match bearer_override {
            Some(token) => ("Authorization", format!("Bearer {token}")),
            None => self.credential.header(),
        };

        let mut last_err = None;
        for attempt in 0..=RETRY_DELAYS_MS.len() {
            let mut request = self.http.request(method.clone(), &url).header(header_name, &header_value);
            if !params.is_empty() {
                request = request.query(params);
            }
            if let Some(ref b) = body {
                request = request.json(b);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(decode_body(response).await);
                }
                Ok(response) => {
                    last_err = Some(format!("upstream status {}", response.status()));
                }
                Err(err) => {
                    last_err = Some(err.to_string());
                }
            }

            if attempt < RETRY_DELAYS_MS.len() {
                sleep(Duration::from_millis(RETRY_DELAYS_MS[attempt])).await;
            }
        }

        Err(Error::Upstream(last_err.unwrap_or_else(|| "unknown upstream failure".to_string())))
    }

    pub fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::Release);
    }
}

async fn decode_body(response: reqwest::Response) -> Json {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or(Json::String(text))
}

/// Process-wide map from `(base_url, credential)` to a [`PoolClient`].
#[derive(Default)]
pub struct RestPool {
    clients: DashMap<ClientKey, Arc<PoolClient>>,
}

impl RestPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self, base_url: &str, credential: Credential) -> Arc<PoolClient> {
        let key = ClientKey { base_url: base_url.to_string(), credential: credential.clone() };
        self.clients
            .entry(key)
            .or_insert_with(|| Arc::new(PoolClient::new(base_url.to_string(), credential)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_params_are_sorted() {
        let params = vec![("b".to_string(), "2".to_string()), ("a".to_string(), "1".to_string())];
        assert_eq!(canonical_params(&params), "a=1&b=2");
    }

    #[test]
    fn cache_evicts_oldest_past_capacity() {
        let mut cache = Cache::new(Duration::from_secs(60));
        for i in 0..(MAX_CACHE_ENTRIES + 10) {
            cache.insert(format!("key{i}"), Json::from(i));
        }
        assert_eq!(cache.entries.len(), MAX_CACHE_ENTRIES);
        assert!(cache.get("key0").is_none());
    }

    #[test]
    fn cache_entries_expire_past_ttl() {
        let mut cache = Cache::new(Duration::from_millis(0));
        cache.insert("k".to_string(), Json::from(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache = Cache::new(Duration::from_secs(60));
        cache.insert("k".to_string(), Json::from(1));
        cache.clear();
        assert!(cache.get("k").is_none());
    }

    #[tokio::test]
    async fn closed_client_rejects_requests() {
        let client = PoolClient::new("http://example.invalid".to_string(), Credential::ApiKey("k".to_string()));
        client.close();
        let err = client.get("/users", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Closed(_)));
    }

    #[test]
    fn pool_returns_same_client_for_same_key() {
        let pool = RestPool::new();
        let a = pool.client("http://x", Credential::ApiKey("k".to_string()));
        let b = pool.client("http://x", Credential::ApiKey("k".to_string()));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
