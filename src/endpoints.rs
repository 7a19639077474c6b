//! Remote API endpoints.
//!
//! Resource paths, report query construction and the mapping from each
//! mutation to the cached resources it makes stale.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Method, Url};
use serde_json::Value;

use crate::cache::KeyMatch;
use crate::error::FetchResult;
use crate::fetch::{CacheOptions, CachedFetcher, CachedResponse, RequestOptions};

/// TTL for report endpoints (campaigns, keywords, placements, ...).
pub const REPORT_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for the wallet balance, which moves faster than reports.
pub const WALLET_TTL: Duration = Duration::from_secs(2 * 60);

// == Resource Paths ==
pub const CAMPAIGN: &str = "/mamaearth/campaign";
pub const CAMPAIGN_GRAPH: &str = "/mamaearth/campaign_graph";
pub const KEYWORDS: &str = "/mamaearth/keywords";
pub const KEYWORD_GRAPH: &str = "/mamaearth/keyword_graph";
pub const NEGATIVE_KEYWORD: &str = "/mamaearth/negative_keyword";
pub const SUGGESTED_NEGATIVE_KEYWORD: &str = "/mamaearth/suggested-negative-keyword";
pub const AD_GROUPS: &str = "/mamaearth/adgroups";
pub const PRODUCTS: &str = "/mamaearth/products";
pub const PRODUCT_ANALYTICS: &str = "/mamaearth/product-analytics";
pub const PLACEMENT: &str = "/mamaearth/placement";
pub const OVERVIEW: &str = "/mamaearth/new-overview";
pub const WALLET_BALANCE: &str = "/mamaearth/wallet_balance";
pub const HISTORY: &str = "/mamaearth/history";
pub const WATCHTOWER: &str = "/mamaearth/watchtower";

// == Report Query ==
/// Date-range filter shared by the report endpoints.
///
/// Parameters are emitted in a fixed order (`start_date`, `end_date`,
/// `platform`, then `brand_name` when non-blank) so equal queries always map
/// to the same cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub platform: String,
    pub brand_name: Option<String>,
}

impl ReportQuery {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, platform: impl Into<String>) -> Self {
        Self {
            start_date,
            end_date,
            platform: platform.into(),
            brand_name: None,
        }
    }

    pub fn brand(mut self, brand_name: impl Into<String>) -> Self {
        self.brand_name = Some(brand_name.into());
        self
    }

    /// Ordered query parameters.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("start_date", self.start_date.format("%Y-%m-%d").to_string()),
            ("end_date", self.end_date.format("%Y-%m-%d").to_string()),
            ("platform", self.platform.clone()),
        ];
        if let Some(brand) = self.brand_name.as_deref().map(str::trim) {
            if !brand.is_empty() {
                params.push(("brand_name", brand.to_string()));
            }
        }
        params
    }
}

// == Mutations ==
/// A state-changing endpoint and the resources it makes stale.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub method: Method,
    pub path: &'static str,
    /// Resource paths whose cached reads must be dropped afterwards
    pub invalidates: &'static [&'static str],
}

impl Mutation {
    /// Matchers for every cached request under the affected resources.
    pub fn invalidation_matchers(&self) -> Vec<KeyMatch> {
        self.invalidates.iter().map(|path| KeyMatch::from(*path)).collect()
    }
}

pub const BUDGET_CHANGE: Mutation = Mutation {
    method: Method::PUT,
    path: "/budget_change",
    invalidates: &[CAMPAIGN],
};

pub const PLAY_PAUSE: Mutation = Mutation {
    method: Method::PUT,
    path: "/play-pause",
    invalidates: &[CAMPAIGN],
};

pub const BID_CHANGE: Mutation = Mutation {
    method: Method::PUT,
    path: "/bid_change",
    invalidates: &[KEYWORDS],
};

pub const TOGGLE_KEYWORD_STATE: Mutation = Mutation {
    method: Method::PUT,
    path: "/mamaearth/toggle_keyword_or_target_state",
    invalidates: &[KEYWORDS],
};

pub const TOGGLE_AD_GROUP: Mutation = Mutation {
    method: Method::PUT,
    path: "/mamaearth/toggle_ad_group",
    invalidates: &[AD_GROUPS],
};

pub const ADD_NEGATIVE_KEYWORD: Mutation = Mutation {
    method: Method::POST,
    path: "/mamaearth/add-negative-keyword",
    invalidates: &[NEGATIVE_KEYWORD, SUGGESTED_NEGATIVE_KEYWORD],
};

pub const DELETE_NEGATIVE_KEYWORD: Mutation = Mutation {
    method: Method::DELETE,
    path: "/mamaearth/delete_negative_keyword",
    invalidates: &[NEGATIVE_KEYWORD, SUGGESTED_NEGATIVE_KEYWORD],
};

fn as_pairs<'a>(params: &'a [(&'static str, String)]) -> Vec<(&'a str, &'a str)> {
    params.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

impl CachedFetcher {
    /// Builds the URL for a report endpoint; `extra` follows the standard filters.
    pub fn report_url(
        &self,
        path: &str,
        query: &ReportQuery,
        extra: &[(&str, &str)],
    ) -> FetchResult<Url> {
        let params = query.params();
        let mut pairs = as_pairs(&params);
        pairs.extend_from_slice(extra);
        self.url(path, &pairs)
    }

    /// Fetches a report endpoint through the cache.
    pub async fn report(
        &self,
        path: &str,
        query: &ReportQuery,
        extra: &[(&str, &str)],
        request: &RequestOptions,
        refresh: bool,
    ) -> FetchResult<CachedResponse> {
        let url = self.report_url(path, query, extra)?;
        let options = CacheOptions::new().ttl(REPORT_TTL).bypass_cache(refresh);
        self.fetch(&url, request, options).await
    }

    /// Campaign table for the query.
    pub async fn campaigns(
        &self,
        query: &ReportQuery,
        request: &RequestOptions,
        refresh: bool,
    ) -> FetchResult<CachedResponse> {
        self.report(CAMPAIGN, query, &[], request, refresh).await
    }

    /// Keyword table for the query.
    pub async fn keywords(
        &self,
        query: &ReportQuery,
        request: &RequestOptions,
        refresh: bool,
    ) -> FetchResult<CachedResponse> {
        self.report(KEYWORDS, query, &[], request, refresh).await
    }

    /// Placement table for the query.
    pub async fn placements(
        &self,
        query: &ReportQuery,
        request: &RequestOptions,
        refresh: bool,
    ) -> FetchResult<CachedResponse> {
        self.report(PLACEMENT, query, &[], request, refresh).await
    }

    /// Wallet balance for a platform, optionally narrowed to one brand.
    pub async fn wallet_balance(
        &self,
        platform: &str,
        brand_name: Option<&str>,
        request: &RequestOptions,
    ) -> FetchResult<CachedResponse> {
        let mut params = vec![("platform", platform)];
        if let Some(brand) = brand_name.filter(|b| !b.trim().is_empty()) {
            params.push(("brand_name", brand));
        }
        let url = self.url(WALLET_BALANCE, &params)?;
        self.fetch(&url, request, CacheOptions::new().ttl(WALLET_TTL))
            .await
    }

    /// Applies a mutation for `platform` and drops the cached reads it affects.
    ///
    /// The platform travels as a lowercase query parameter.
    pub async fn apply(
        &self,
        mutation: &Mutation,
        platform: &str,
        body: &Value,
        request: &RequestOptions,
    ) -> FetchResult<Value> {
        let platform = platform.to_lowercase();
        let url = self.url(mutation.path, &[("platform", platform.as_str())])?;
        self.mutate(
            mutation.method.clone(),
            &url,
            request,
            Some(body),
            &mutation.invalidation_matchers(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{shared, ManualClock, MemoryStorage, ResponseCache};
    use crate::config::Config;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fetcher() -> CachedFetcher {
        let cache = shared(ResponseCache::new(MemoryStorage::new(), ManualClock::new(0)));
        let config = Config {
            api_base_url: "https://api.test".to_string(),
            ..Config::default()
        };
        CachedFetcher::new(cache, &config).unwrap()
    }

    #[test]
    fn test_report_params_order() {
        let query = ReportQuery::new(date(2024, 3, 1), date(2024, 3, 31), "Zepto").brand("Mamaearth");

        assert_eq!(
            query.params(),
            vec![
                ("start_date", "2024-03-01".to_string()),
                ("end_date", "2024-03-31".to_string()),
                ("platform", "Zepto".to_string()),
                ("brand_name", "Mamaearth".to_string()),
            ]
        );
    }

    #[test]
    fn test_blank_brand_omitted() {
        let query = ReportQuery::new(date(2024, 3, 1), date(2024, 3, 2), "Blinkit").brand("   ");
        assert_eq!(query.params().len(), 3);
    }

    #[test]
    fn test_report_url() {
        let fetcher = fetcher();
        let query = ReportQuery::new(date(2024, 1, 1), date(2024, 1, 7), "Swiggy");
        let url = fetcher
            .report_url(CAMPAIGN_GRAPH, &query, &[("campaign_id", "42")])
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.test/mamaearth/campaign_graph?start_date=2024-01-01&end_date=2024-01-07&platform=Swiggy&campaign_id=42"
        );
    }

    #[test]
    fn test_date_range_changes_key() {
        let fetcher = fetcher();
        let week = ReportQuery::new(date(2024, 1, 1), date(2024, 1, 7), "Swiggy");
        let month = ReportQuery::new(date(2024, 1, 1), date(2024, 1, 31), "Swiggy");

        let a = fetcher.report_url(CAMPAIGN, &week, &[]).unwrap();
        let b = fetcher.report_url(CAMPAIGN, &month, &[]).unwrap();
        assert_ne!(fetcher.key_for(&a), fetcher.key_for(&b));
    }

    #[test]
    fn test_budget_change_invalidates_campaign_reads() {
        let matchers = BUDGET_CHANGE.invalidation_matchers();
        let campaign_key = "cache:GET:https://api.test/mamaearth/campaign?platform=Zepto";
        let keyword_key = "cache:GET:https://api.test/mamaearth/keywords?platform=Zepto";

        assert!(matchers.iter().any(|m| m.matches(campaign_key)));
        assert!(!matchers.iter().any(|m| m.matches(keyword_key)));
    }

    #[test]
    fn test_mutations_are_not_safe_methods() {
        for mutation in [
            BUDGET_CHANGE,
            PLAY_PAUSE,
            BID_CHANGE,
            TOGGLE_KEYWORD_STATE,
            TOGGLE_AD_GROUP,
            ADD_NEGATIVE_KEYWORD,
            DELETE_NEGATIVE_KEYWORD,
        ] {
            assert!(!mutation.method.is_safe(), "{} must mutate", mutation.path);
            assert!(!mutation.invalidates.is_empty());
        }
    }
}
