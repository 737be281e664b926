//! Tencent stock-news adapter.

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

/// Connector for the Tencent finance news endpoint.
///
/// Wire format: `GET {base}/cgi/news/list?symbol=<s>&n=<n>` returning
/// `{"code":0,"data":{"items":[{news_id, title, abstract, content, source,
/// url, publish_time, symbols}]}}` with RFC 3339 publish stamps. A non-zero
/// `code` is a provider-side failure.
pub struct TencentSource {
    client: HttpClient,
    base_url: Url,
    params: BTreeMap<String, String>,
    category: String,
}

/// Builder for [`TencentSource`].
pub struct TencentSourceBuilder {
    base_url: String,
    timeout: Duration,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    category: String,
}

impl TencentSource {
    /// Stable source id; prefixes every item id.
    pub const NAME: &'static str = "tencent";

    /// Start a builder pointed at the production endpoint.
    #[must_use]
    pub fn builder() -> TencentSourceBuilder {
        TencentSourceBuilder {
            base_url: "https://proxy.finance.qq.com".to_string(),
            timeout: Duration::from_secs(30),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            category: "财经".to_string(),
        }
    }

    /// Build from a registry row.
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
        b.build()
    }
}

impl TencentSourceBuilder {
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

    /// Finish the builder.
    ///
    /// # Errors
    /// `InvalidArg` on malformed base URL or headers.
    pub fn build(self) -> Result<TencentSource, NewswireError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| NewswireError::InvalidArg(format!("tencent base url: {e}")))?;
        Ok(TencentSource {
            client: HttpClient::new(TencentSource::NAME, self.timeout, &self.headers)?,
            base_url,
            params: self.params,
            category: self.category,
        })
    }
}

#[derive(Deserialize)]
struct TxEnvelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    data: Option<TxData>,
}

#[derive(Deserialize)]
struct TxData {
    #[serde(default)]
    items: Vec<TxArticle>,
}

#[derive(Deserialize)]
struct TxArticle {
    news_id: String,
    title: String,
    #[serde(default, rename = "abstract")]
    summary: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    publish_time: Option<String>,
    #[serde(default)]
    column: Option<String>,
    #[serde(default)]
    symbols: Vec<String>,
}

#[async_trait]
impl NewsSource for TencentSource {
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
            .join("cgi/news/list")
            .map_err(|e| NewswireError::InvalidArg(format!("tencent url: {e}")))?;
        {
            let mut qp = url.query_pairs_mut();
            for (k, v) in &self.params {
                qp.append_pair(k, v);
            }
            if !query.symbol.is_empty() {
                qp.append_pair("symbol", &query.symbol);
            }
            qp.append_pair("n", &query.limit.to_string());
        }

        let value = self.client.get_json(url, cancel).await?;
        let envelope: TxEnvelope = serde_json::from_value(value)
            .map_err(|e| NewswireError::decode(Self::NAME, e.to_string()))?;
        if envelope.code != 0 {
            return Err(NewswireError::source(
                Self::NAME,
                format!("provider code {}", envelope.code),
            ));
        }
        let Some(data) = envelope.data else {
            return Ok(Vec::new());
        };

        let now = Utc::now();
        let mut out = Vec::new();
        for article in data.items {
            let parsed = article
                .publish_time
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc));
            let published = normalize::normalize_publish(parsed, now);

            let native_symbols = article.symbols.join(",");
            let mut item = NewsItem::new(
                format!("{}_{}", Self::NAME, article.news_id),
                article.title,
                Self::NAME,
                published,
            );
            item.summary = article.summary.unwrap_or_default();
            item.body = article.content.unwrap_or_default();
            item.author = article.source.unwrap_or_default();
            item.url = article.url.unwrap_or_default();
            item.category = article.column.unwrap_or_else(|| self.category.clone());
            item.relevance = crate::NEWS_SITE_RELEVANCE;
            item.sentiment = Some(Sentiment::neutral());
            item.symbols = article.symbols.iter().cloned().collect();

            if !normalize::mentions_symbol(&item, &query.symbol, Some(&native_symbols)) {
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
