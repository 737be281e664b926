//! Sina roll-news adapter.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use newswire_core::{NewsQuery, NewsSource};
use newswire_types::{NewsItem, NewswireError, Sentiment, SourceConfig};

use crate::client::HttpClient;
use crate::normalize;

/// Connector for the Sina finance roll-news endpoint.
///
/// Wire format: `GET {base}/api/roll/get?num=<n>&page=1&...` returning
/// `{"result":{"data":[{id, title, intro, content, media_name, url, ctime,
/// keywords, channel, symbol}]}}` with `ctime` as epoch seconds in a string.
pub struct SinaSource {
    client: HttpClient,
    base_url: Url,
    params: BTreeMap<String, String>,
    category: String,
}

/// Builder for [`SinaSource`].
pub struct SinaSourceBuilder {
    base_url: String,
    timeout: Duration,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    category: String,
}

impl SinaSource {
    /// Stable source id; prefixes every item id.
    pub const NAME: &'static str = "sina";

    /// Start a builder pointed at the production endpoint.
    #[must_use]
    pub fn builder() -> SinaSourceBuilder {
        SinaSourceBuilder {
            base_url: "https://feed.sina.com.cn".to_string(),
            timeout: Duration::from_secs(30),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            category: "财经".to_string(),
        }
    }

    /// Build from a registry row, honouring its base URL, headers, default
    /// params, and category.
    ///
    /// # Errors
    /// `InvalidArg` on malformed base URL or headers.
    pub fn from_config(cfg: &SourceConfig) -> Result<Self, NewswireError> {
        let mut b = Self::builder();
        if !cfg.base_url.is_empty() {
            b = b.base_url(&cfg.base_url);
        }
        if !cfg.category.is_empty() {
            b = b.category(&cfg.category);
        }
        b.headers = cfg.headers.clone();
        b.params = cfg.params.clone();
        b.build()
    }
}

impl SinaSourceBuilder {
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

    /// Add a fixed request header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a default query parameter.
    #[must_use]
    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the fallback category for unlabelled articles.
    #[must_use]
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// Finish the builder.
    ///
    /// # Errors
    /// `InvalidArg` on malformed base URL or headers.
    pub fn build(self) -> Result<SinaSource, NewswireError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| NewswireError::InvalidArg(format!("sina base url: {e}")))?;
        Ok(SinaSource {
            client: HttpClient::new(SinaSource::NAME, self.timeout, &self.headers)?,
            base_url,
            params: self.params,
            category: self.category,
        })
    }
}

#[derive(Deserialize)]
struct SinaEnvelope {
    result: SinaResult,
}

#[derive(Deserialize)]
struct SinaResult {
    #[serde(default)]
    data: Vec<SinaArticle>,
}

#[derive(Deserialize)]
struct SinaArticle {
    id: u64,
    title: String,
    #[serde(default)]
    intro: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    media_name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ctime: Option<String>,
    #[serde(default)]
    keywords: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

#[async_trait]
impl NewsSource for SinaSource {
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
            .join("api/roll/get")
            .map_err(|e| NewswireError::InvalidArg(format!("sina url: {e}")))?;
        {
            let mut qp = url.query_pairs_mut();
            for (k, v) in &self.params {
                qp.append_pair(k, v);
            }
            qp.append_pair("num", &query.limit.to_string());
            qp.append_pair("page", "1");
        }

        let value = self.client.get_json(url, cancel).await?;
        let envelope: SinaEnvelope = serde_json::from_value(value)
            .map_err(|e| NewswireError::decode(Self::NAME, e.to_string()))?;

        let now = Utc::now();
        let mut out = Vec::new();
        for article in envelope.result.data {
            let parsed = article
                .ctime
                .as_deref()
                .and_then(|s| s.parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            let published = normalize::normalize_publish(parsed, now);

            let mut item = NewsItem::new(
                format!("{}_{}", Self::NAME, article.id),
                article.title,
                Self::NAME,
                published,
            );
            item.summary = article.intro.unwrap_or_default();
            item.body = article.content.unwrap_or_default();
            item.author = article.media_name.unwrap_or_default();
            item.url = article.url.unwrap_or_default();
            item.category = article.channel.unwrap_or_else(|| self.category.clone());
            item.relevance = crate::NEWS_SITE_RELEVANCE;
            item.sentiment = Some(Sentiment::neutral());
            if let Some(keywords) = &article.keywords {
                item.tags = normalize::split_keywords(keywords).collect();
            }

            if !normalize::mentions_symbol(&item, &query.symbol, article.symbol.as_deref()) {
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
