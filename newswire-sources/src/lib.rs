//! newswire-sources
//!
//! HTTP connectors that implement [`NewsSource`] for the external providers
//! the platform aggregates: Sina roll news, Eastmoney quote news, the Xueqiu
//! stock timeline, and Tencent stock news. Each adapter builds the
//! provider-specific request, decodes the native payload, and normalises it
//! to [`NewsItem`](newswire_types::NewsItem).
#![warn(missing_docs)]

mod client;
mod eastmoney;
mod normalize;
mod sina;
mod tencent;
mod xueqiu;

pub use client::HttpClient;
pub use eastmoney::{EastmoneySource, EastmoneySourceBuilder};
pub use sina::{SinaSource, SinaSourceBuilder};
pub use tencent::{TencentSource, TencentSourceBuilder};
pub use xueqiu::{XueqiuSource, XueqiuSourceBuilder};

pub use newswire_core::{NewsQuery, NewsSource};

/// Relevance assigned to articles from editorial news sites.
pub const NEWS_SITE_RELEVANCE: f64 = 0.8;
/// Relevance assigned to posts from forum-style social sources.
pub const SOCIAL_RELEVANCE: f64 = 0.7;
