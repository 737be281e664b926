//! Eastmoney quote-news adapter.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use newswire_core::{NewsQuery, NewsSource};
use newswire_types::{NewsItem, NewswireError, Sentiment, SourceConfig};

use crate::client::HttpClient;
use crate::normalize;

/// Connector for the Eastmoney per-symbol news endpoint.
///
/// Wire format: `GET {base}/api/qt/news/get?symbol=<s>&pageSize=<n>`
/// returning `{"data":{"list":[{code, title, digest, content, showDateTime,
/// mediaName, url, column, stockList}]}}`. `showDateTime` is a local
/// `"%Y-%m-%d %H:%M:%S"` stamp in the Shanghai zone.
pub struct EastmoneySource {
    client: HttpClient,
    base_url: Url,
    params: BTreeMap<String, String>,
    category: String,
}

/// Builder for [`EastmoneySource`].
pub struct EastmoneySourceBuilder {
    base_url: String,
    timeout: Duration,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    category: String,
}

impl EastmoneySource {
    /// Stable source id; prefixes every item id.
    pub const NAME: &'static str = "eastmoney";

    /// Start a builder pointed at the production endpoint.
    #[must_use]
    pub fn builder() -> EastmoneySourceBuilder {
        EastmoneySourceBuilder {
            base_url: "https://np-anotice-stock.eastmoney.com".to_string(),
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

impl EastmoneySourceBuilder {
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
    pub fn build(self) -> Result<EastmoneySource, NewswireError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| NewswireError::InvalidArg(format!("eastmoney base url: {e}")))?;
        Ok(EastmoneySource {
            client: HttpClient::new(EastmoneySource::NAME, self.timeout, &self.headers)?,
            base_url,
            params: self.params,
            category: self.category,
        })
    }
}

#[derive(Deserialize)]
struct EmEnvelope {
    #[serde(default)]
    data: Option<EmData>,
}

#[derive(Deserialize)]
struct EmData {
    #[serde(default)]
    list: Vec<EmArticle>,
}

#[derive(Deserialize)]
struct EmArticle {
    code: String,
    title: String,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, rename = "showDateTime")]
    show_date_time: Option<String>,
    #[serde(default, rename = "mediaName")]
    media_name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    column: Option<String>,
    #[serde(default, rename = "stockList")]
    stock_list: Vec<String>,
}

#[async_trait]
impl NewsSource for EastmoneySource {
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
            .join("api/qt/news/get")
            .map_err(|e| NewswireError::InvalidArg(format!("eastmoney url: {e}")))?;
        {
            let mut qp = url.query_pairs_mut();
            for (k, v) in &self.params {
                qp.append_pair(k, v);
            }
            if !query.symbol.is_empty() {
                qp.append_pair("symbol", &query.symbol);
            }
            qp.append_pair("pageSize", &query.limit.to_string());
        }

        let value = self.client.get_json(url, cancel).await?;
        let envelope: EmEnvelope = serde_json::from_value(value)
            .map_err(|e| NewswireError::decode(Self::NAME, e.to_string()))?;
        let Some(data) = envelope.data else {
            return Ok(Vec::new());
        };

        let now = Utc::now();
        let mut out = Vec::new();
        for article in data.list {
            // Provider stamps are zone-less local times in Shanghai.
            let parsed = article
                .show_date_time
                .as_deref()
                .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
                .and_then(|naive| {
                    chrono_tz::Asia::Shanghai
                        .from_local_datetime(&naive)
                        .single()
                })
                .map(|t| t.with_timezone(&Utc));
            let published = normalize::normalize_publish(parsed, now);

            let native_symbols = article.stock_list.join(",");
            let mut item = NewsItem::new(
                format!("{}_{}", Self::NAME, article.code),
                article.title,
                Self::NAME,
                published,
            );
            item.summary = article.digest.unwrap_or_default();
            item.body = article.content.unwrap_or_default();
            item.author = article.media_name.unwrap_or_default();
            item.url = article.url.unwrap_or_default();
            item.category = article.column.unwrap_or_else(|| self.category.clone());
            item.relevance = crate::NEWS_SITE_RELEVANCE;
            item.sentiment = Some(Sentiment::neutral());
            item.symbols = article.stock_list.iter().cloned().collect();

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
