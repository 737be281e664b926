//! Xueqiu stock-timeline adapter.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use newswire_core::text::truncate_chars;
use newswire_core::{NewsQuery, NewsSource};
use newswire_types::{NewsItem, NewswireError, Sentiment, SourceConfig};

use crate::client::HttpClient;
use crate::normalize;

/// Post titles are the first 50 code points of the post body; Xueqiu posts
/// have no headline of their own.
const TITLE_CHARS: usize = 50;

/// Connector for the Xueqiu per-stock discussion timeline.
///
/// Wire format: `GET {base}/statuses/stock_timeline.json?symbol_id=<s>&count=<n>`
/// returning `{"list":[{id, user:{screen_name}, text, created_at, target,
/// symbol_id}]}` with `created_at` in epoch milliseconds. Forum posts carry
/// the social relevance tier (0.7).
pub struct XueqiuSource {
    client: HttpClient,
    base_url: Url,
    params: BTreeMap<String, String>,
    category: String,
}

/// Builder for [`XueqiuSource`].
pub struct XueqiuSourceBuilder {
    base_url: String,
    timeout: Duration,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    category: String,
    credential: Option<String>,
}

impl XueqiuSource {
    /// Stable source id; prefixes every item id.
    pub const NAME: &'static str = "xueqiu";

    /// Start a builder pointed at the production endpoint.
    #[must_use]
    pub fn builder() -> XueqiuSourceBuilder {
        XueqiuSourceBuilder {
            base_url: "https://xueqiu.com".to_string(),
            timeout: Duration::from_secs(30),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            category: "社区讨论".to_string(),
            credential: None,
        }
    }

    /// Build from a registry row. The row's credential becomes the timeline
    /// cookie Xueqiu requires.
    ///
    /// # Errors
    /// `InvalidArg` on malformed base URL or headers.
    pub fn from_config(cfg: &SourceConfig) -> Result<Self, NewswireError> {
        let mut b = Self::builder();
        if !cfg.base_url.is_empty() {
            b = b.base_url(&cfg.base_url);
        }
        if !cfg.category.is_empty() {
            b.category = cfg.category.clone();
        }
        b.headers = cfg.headers.clone();
        b.params = cfg.params.clone();
        b.credential = cfg.credential.clone();
        b.build()
    }
}

impl XueqiuSourceBuilder {
    /// Override the base URL (tests point this at a local mock server).
    #[must_use]
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the session cookie credential.
    #[must_use]
    pub fn credential(mut self, token: &str) -> Self {
        self.credential = Some(token.to_string());
        self
    }

    /// Finish the builder.
    ///
    /// # Errors
    /// `InvalidArg` on malformed base URL or headers.
    pub fn build(mut self) -> Result<XueqiuSource, NewswireError> {
        if let Some(token) = &self.credential {
            self.headers
                .insert("cookie".to_string(), format!("xq_a_token={token}"));
        }
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| NewswireError::InvalidArg(format!("xueqiu base url: {e}")))?;
        Ok(XueqiuSource {
            client: HttpClient::new(XueqiuSource::NAME, self.timeout, &self.headers)?,
            base_url,
            params: self.params,
            category: self.category,
        })
    }
}

#[derive(Deserialize)]
struct XqEnvelope {
    #[serde(default)]
    list: Vec<XqPost>,
}

#[derive(Deserialize)]
struct XqPost {
    id: u64,
    #[serde(default)]
    user: Option<XqUser>,
    text: String,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    symbol_id: Option<String>,
}

#[derive(Deserialize)]
struct XqUser {
    #[serde(default)]
    screen_name: Option<String>,
}

#[async_trait]
impl NewsSource for XueqiuSource {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn category(&self) -> &str {
        &self.category
    }

    async fn fetch(
        &self,
        query: &NewsQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<NewsItem>, NewswireError> {
        let mut url = self
            .base_url
            .join("statuses/stock_timeline.json")
            .map_err(|e| NewswireError::InvalidArg(format!("xueqiu url: {e}")))?;
        {
            let mut qp = url.query_pairs_mut();
            for (k, v) in &self.params {
                qp.append_pair(k, v);
            }
            if !query.symbol.is_empty() {
                qp.append_pair("symbol_id", &query.symbol);
            }
            qp.append_pair("count", &query.limit.to_string());
        }

        let value = self.client.get_json(url, cancel).await?;
        let envelope: XqEnvelope = serde_json::from_value(value)
            .map_err(|e| NewswireError::decode(Self::NAME, e.to_string()))?;

        let now = Utc::now();
        let mut out = Vec::new();
        for post in envelope.list {
            let parsed = post
                .created_at
                .and_then(DateTime::from_timestamp_millis);
            let published = normalize::normalize_publish(parsed, now);

            let mut item = NewsItem::new(
                format!("{}_{}", Self::NAME, post.id),
                truncate_chars(&post.text, TITLE_CHARS),
                Self::NAME,
                published,
            );
            item.body = post.text;
            item.author = post
                .user
                .and_then(|u| u.screen_name)
                .unwrap_or_default();
            item.url = post.target.unwrap_or_default();
            item.category = self.category.clone();
            item.relevance = crate::SOCIAL_RELEVANCE;
            item.sentiment = Some(Sentiment::neutral());

            if !normalize::mentions_symbol(&item, &query.symbol, post.symbol_id.as_deref()) {
                continue;
            }
            if !query.symbol.is_empty() {
                item.symbols.insert(query.symbol.clone());
            }
            out.push(item);
        }
        tracing::debug!(source = Self::NAME, items = out.len(), "fetch complete");
        Ok(out)
    }
}
