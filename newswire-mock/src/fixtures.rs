//! Deterministic fixture articles keyed by symbol.

use chrono::Utc;

use newswire_types::{NewsItem, Sentiment};

pub(crate) fn items_for(source: &str, symbol: &str) -> Vec<NewsItem> {
    let now = Utc::now();
    let sym = if symbol.is_empty() { "000001" } else { symbol };

    let seeds = [
        (
            1u64,
            format!("{sym} 盘中异动，成交量明显放大"),
            "行情快讯",
            10i64,
        ),
        (
            2,
            format!("机构调研纪要：{sym} 基本面稳健"),
            "机构观点",
            45,
        ),
        (3, format!("{sym} 发布投资者关系活动记录"), "公告", 95),
    ];

    seeds
        .into_iter()
        .map(|(native, title, category, minutes_ago)| {
            let mut item = NewsItem::new(
                format!("{source}_{sym}_{native}"),
                title,
                source,
                now - chrono::TimeDelta::minutes(minutes_ago),
            );
            item.summary = format!("{sym} 相关资讯（fixture #{native}）");
            item.body = format!("这是 {source} 提供的第 {native} 条示例正文，标的 {sym}。");
            item.category = category.to_string();
            item.relevance = 0.8;
            item.symbols = [sym.to_string()].into_iter().collect();
            item.sentiment = Some(Sentiment::neutral());
            item
        })
        .collect()
}
