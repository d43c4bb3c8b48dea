//! Pulls every booking page from the upstream listing and merges them into a
//! single de-duplicated, input-ordered set.

use std::collections::HashSet;

use serde_json::Value;

use crate::{
    config::StopPolicy,
    error::{AppError, AppResult},
    models::Booking,
    services::{dates::DateRange, lodgify::LodgifyClient},
};

pub const BOOKINGS_PATH: &str = "/v2/reservations/bookings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Pull everything and filter locally; upstream range filtering is unreliable.
    All,
    /// Ask upstream to filter by the requested window.
    Filtered,
}

impl FetchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(Self::All),
            "filtered" => Some(Self::Filtered),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Filtered => "filtered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingScheme {
    PageSize,
    OffsetLimit,
}

impl PagingScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PageSize => "page_size",
            Self::OffsetLimit => "offset_limit",
        }
    }

    /// Query parameters for the zero-based `page_index`.
    pub fn params(self, page_index: u32, page_size: u32) -> Vec<(String, String)> {
        match self {
            Self::PageSize => vec![
                ("page".to_string(), (page_index + 1).to_string()),
                ("size".to_string(), page_size.to_string()),
            ],
            Self::OffsetLimit => vec![
                (
                    "offset".to_string(),
                    (u64::from(page_index) * u64::from(page_size)).to_string(),
                ),
                ("limit".to_string(), page_size.to_string()),
            ],
        }
    }

    fn fallback(self) -> Self {
        match self {
            Self::PageSize => Self::OffsetLimit,
            Self::OffsetLimit => Self::PageSize,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub mode: FetchMode,
    pub range: Option<DateRange>,
    pub page_size: u32,
    pub max_pages: u32,
    pub stop_policy: StopPolicy,
    pub primary_scheme: PagingScheme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyPage,
    ShortPage,
    TotalReached,
    NoNewItems,
    PageCeiling,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyPage => "empty_page",
            Self::ShortPage => "short_page",
            Self::TotalReached => "total_reached",
            Self::NoNewItems => "no_new_items",
            Self::PageCeiling => "page_ceiling",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingSet {
    pub bookings: Vec<Booking>,
    pub reported_total: Option<u64>,
    pub pages_fetched: u32,
    pub malformed_items: usize,
    pub stop_reason: StopReason,
}

struct Page {
    items: Vec<(String, Option<Booking>)>,
    total: Option<u64>,
}

pub async fn fetch_all_bookings(client: &LodgifyClient, fetch: &FetchConfig) -> AppResult<BookingSet> {
    let page_size = fetch.page_size.max(1);
    let mut seen = HashSet::new();
    let mut bookings = Vec::new();
    let mut reported_total = None;
    let mut malformed_items = 0;
    let mut pages_fetched = 0;
    let mut stop_reason = StopReason::PageCeiling;

    for page_index in 0..fetch.max_pages.max(1) {
        let page = fetch_page(client, fetch, page_index, page_size).await?;
        pages_fetched += 1;
        if page.total.is_some() {
            reported_total = page.total;
        }

        let batch_len = page.items.len();
        let mut added = 0;
        for (key, booking) in page.items {
            if !seen.insert(key) {
                continue;
            }
            // A new unparseable item still proves the upstream advanced.
            added += 1;
            match booking {
                Some(booking) => bookings.push(booking),
                None => malformed_items += 1,
            }
        }
        tracing::debug!(
            page = page_index + 1,
            batch = batch_len,
            added,
            distinct = seen.len(),
            "Fetched bookings page"
        );

        if let Some(reason) = stop_decision(
            fetch.stop_policy,
            batch_len,
            page_size,
            seen.len(),
            added,
            reported_total,
        ) {
            stop_reason = reason;
            break;
        }
    }

    if stop_reason == StopReason::PageCeiling {
        tracing::warn!(
            max_pages = fetch.max_pages,
            distinct = seen.len(),
            "Bookings pagination hit the page ceiling"
        );
    } else {
        tracing::info!(
            mode = fetch.mode.as_str(),
            pages = pages_fetched,
            bookings = bookings.len(),
            reported_total = ?reported_total,
            stop = stop_reason.as_str(),
            "Bookings pagination finished"
        );
    }

    Ok(BookingSet {
        bookings,
        reported_total,
        pages_fetched,
        malformed_items,
        stop_reason,
    })
}

/// Whether the loop should end after a page. `distinct` counts every unique key
/// seen so far (parsed or not), `added` only the new ones from this page
/// (again parsed or not).
fn stop_decision(
    policy: StopPolicy,
    batch_len: usize,
    page_size: u32,
    distinct: usize,
    added: usize,
    reported_total: Option<u64>,
) -> Option<StopReason> {
    if batch_len == 0 {
        return Some(StopReason::EmptyPage);
    }
    let short = batch_len < page_size as usize;
    let total_reached = reported_total.is_some_and(|total| distinct as u64 >= total);

    match policy {
        StopPolicy::FirstSignal => {
            if short {
                return Some(StopReason::ShortPage);
            }
            if total_reached {
                return Some(StopReason::TotalReached);
            }
        }
        StopPolicy::Conservative => {
            if short && total_reached {
                return Some(StopReason::TotalReached);
            }
            if short && reported_total.is_none() {
                return Some(StopReason::ShortPage);
            }
        }
    }

    // Upstream ignoring the paging parameters keeps returning the same rows.
    if added == 0 && distinct > 0 {
        return Some(StopReason::NoNewItems);
    }
    None
}

async fn fetch_page(
    client: &LodgifyClient,
    fetch: &FetchConfig,
    page_index: u32,
    page_size: u32,
) -> AppResult<Page> {
    let primary = fetch.primary_scheme;
    let primary_err = match fetch_page_with(client, fetch, primary, page_index, page_size).await {
        Ok(page) => return Ok(page),
        Err(err @ AppError::Configuration(_)) => return Err(err),
        Err(err) => err,
    };

    let secondary = primary.fallback();
    tracing::warn!(
        page = page_index + 1,
        scheme = primary.as_str(),
        fallback = secondary.as_str(),
        error = %primary_err,
        "Bookings page failed, retrying with fallback paging"
    );
    match fetch_page_with(client, fetch, secondary, page_index, page_size).await {
        Ok(page) => Ok(page),
        Err(secondary_err) => {
            tracing::error!(
                page = page_index + 1,
                error = %secondary_err,
                "Fallback paging failed as well"
            );
            Err(primary_err)
        }
    }
}

async fn fetch_page_with(
    client: &LodgifyClient,
    fetch: &FetchConfig,
    scheme: PagingScheme,
    page_index: u32,
    page_size: u32,
) -> AppResult<Page> {
    let mut query = scheme.params(page_index, page_size);
    query.push(("includeCount".to_string(), "true".to_string()));
    if fetch.mode == FetchMode::Filtered {
        if let Some(range) = fetch.range {
            query.push(("stayFilter".to_string(), "DateRange".to_string()));
            query.push(("periodStart".to_string(), range.from.to_string()));
            query.push(("periodEnd".to_string(), range.to.to_string()));
        }
    }

    let payload = client.get(BOOKINGS_PATH, query).await?;
    let (strategy, raw_items) = extract_items(&payload).ok_or_else(|| {
        AppError::Shape(format!(
            "Bookings response from {BOOKINGS_PATH} has no recognizable item list."
        ))
    })?;
    tracing::trace!(strategy, "Located bookings item list");

    let items = raw_items
        .iter()
        .map(|raw| {
            let booking = match Booking::from_value(raw) {
                Ok(booking) => Some(booking),
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping malformed booking item");
                    None
                }
            };
            (dedup_key(raw), booking)
        })
        .collect();

    Ok(Page {
        items,
        total: extract_total(&payload),
    })
}

/// Identity used for de-duplication across overlapping pages.
pub fn dedup_key(item: &Value) -> String {
    match item.get("id") {
        Some(Value::Number(number)) => format!("id:{number}"),
        Some(Value::String(text)) if !text.trim().is_empty() => format!("id:{}", text.trim()),
        _ => format!("raw:{item}"),
    }
}

type ItemsStrategy = (&'static str, fn(&Value) -> Option<&Vec<Value>>);
type TotalStrategy = fn(&Value) -> Option<u64>;

const ITEM_STRATEGIES: [ItemsStrategy; 6] = [
    ("array", items_top_level),
    ("items", items_items),
    ("data", items_data),
    ("results", items_results),
    ("bookings", items_bookings),
    ("data.items", items_data_items),
];

const TOTAL_STRATEGIES: [TotalStrategy; 6] = [
    total_count,
    total_total,
    total_total_count,
    total_camel_total_count,
    total_meta_total,
    total_pagination_total,
];

/// First item list found by the ordered strategies, with the strategy name.
pub fn extract_items(payload: &Value) -> Option<(&'static str, &Vec<Value>)> {
    ITEM_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(payload).map(|items| (*name, items)))
}

/// First total count found by the ordered strategies.
pub fn extract_total(payload: &Value) -> Option<u64> {
    TOTAL_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(payload))
}

fn items_top_level(payload: &Value) -> Option<&Vec<Value>> {
    payload.as_array()
}

fn items_items(payload: &Value) -> Option<&Vec<Value>> {
    payload.get("items").and_then(Value::as_array)
}

fn items_data(payload: &Value) -> Option<&Vec<Value>> {
    payload.get("data").and_then(Value::as_array)
}

fn items_results(payload: &Value) -> Option<&Vec<Value>> {
    payload.get("results").and_then(Value::as_array)
}

fn items_bookings(payload: &Value) -> Option<&Vec<Value>> {
    payload.get("bookings").and_then(Value::as_array)
}

fn items_data_items(payload: &Value) -> Option<&Vec<Value>> {
    payload
        .get("data")
        .and_then(|data| data.get("items"))
        .and_then(Value::as_array)
}

fn total_count(payload: &Value) -> Option<u64> {
    count_value(payload.get("count"))
}

fn total_total(payload: &Value) -> Option<u64> {
    count_value(payload.get("total"))
}

fn total_total_count(payload: &Value) -> Option<u64> {
    count_value(payload.get("total_count"))
}

fn total_camel_total_count(payload: &Value) -> Option<u64> {
    count_value(payload.get("totalCount"))
}

fn total_meta_total(payload: &Value) -> Option<u64> {
    count_value(payload.get("meta").and_then(|meta| meta.get("total")))
}

fn total_pagination_total(payload: &Value) -> Option<u64> {
    count_value(payload.get("pagination").and_then(|page| page.get("total")))
}

fn count_value(value: Option<&Value>) -> Option<u64> {
    match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64)),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> LodgifyClient {
        let config = AppConfig {
            lodgify_base_url: server.uri(),
            lodgify_api_key: Some("test-key".to_string()),
            upstream_timeout_seconds: 5,
            ..AppConfig::default()
        };
        LodgifyClient::new(&config).expect("client builds")
    }

    fn fetch_config(page_size: u32, policy: StopPolicy) -> FetchConfig {
        FetchConfig {
            mode: FetchMode::All,
            range: None,
            page_size,
            max_pages: 20,
            stop_policy: policy,
            primary_scheme: PagingScheme::PageSize,
        }
    }

    fn booking(id: i64) -> Value {
        json!({ "id": id, "arrival": "2024-03-01", "departure": "2024-03-03" })
    }

    #[test]
    fn strategies_are_tried_in_order() {
        let nested = json!({ "data": { "items": [booking(1)] }, "meta": { "total": "7" } });
        let (name, items) = extract_items(&nested).unwrap();
        assert_eq!(name, "data.items");
        assert_eq!(items.len(), 1);
        assert_eq!(extract_total(&nested), Some(7));

        let plain = json!([booking(1), booking(2)]);
        assert_eq!(extract_items(&plain).unwrap().0, "array");
        assert_eq!(extract_total(&plain), None);

        let both = json!({ "count": 3, "total": 9, "items": [] });
        assert_eq!(extract_total(&both), Some(3));

        assert!(extract_items(&json!({ "raw": "<html>" })).is_none());
    }

    #[test]
    fn dedup_key_prefers_id() {
        assert_eq!(dedup_key(&json!({ "id": 5 })), "id:5");
        assert_eq!(dedup_key(&json!({ "id": " 5 " })), "id:5");
        assert_eq!(dedup_key(&json!({ "x": 1 })), r#"raw:{"x":1}"#);
    }

    #[test]
    fn first_signal_stops_on_either_signal() {
        let policy = StopPolicy::FirstSignal;
        assert_eq!(
            stop_decision(policy, 3, 10, 23, 3, Some(100)),
            Some(StopReason::ShortPage)
        );
        assert_eq!(
            stop_decision(policy, 10, 10, 20, 10, Some(20)),
            Some(StopReason::TotalReached)
        );
        assert_eq!(stop_decision(policy, 10, 10, 20, 10, Some(40)), None);
    }

    #[test]
    fn conservative_waits_for_agreement() {
        let policy = StopPolicy::Conservative;
        assert_eq!(stop_decision(policy, 10, 10, 20, 10, Some(20)), None);
        assert_eq!(stop_decision(policy, 3, 10, 23, 3, Some(100)), None);
        assert_eq!(
            stop_decision(policy, 3, 10, 23, 3, Some(23)),
            Some(StopReason::TotalReached)
        );
        assert_eq!(
            stop_decision(policy, 3, 10, 23, 3, None),
            Some(StopReason::ShortPage)
        );
        assert_eq!(
            stop_decision(policy, 0, 10, 23, 0, Some(100)),
            Some(StopReason::EmptyPage)
        );
        assert_eq!(
            stop_decision(policy, 10, 10, 20, 0, Some(100)),
            Some(StopReason::NoNewItems)
        );
    }

    #[test]
    fn offset_limit_params_are_zero_based() {
        assert_eq!(
            PagingScheme::OffsetLimit.params(2, 25),
            vec![
                ("offset".to_string(), "50".to_string()),
                ("limit".to_string(), "25".to_string())
            ]
        );
        assert_eq!(
            PagingScheme::PageSize.params(0, 25),
            vec![
                ("page".to_string(), "1".to_string()),
                ("size".to_string(), "25".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn overlapping_pages_are_deduplicated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 4,
                "items": [booking(1), booking(2)]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 4,
                "items": [booking(2), booking(3)]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 4,
                "items": [booking(3), booking(4)]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("page", "4"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "count": 4, "items": [] })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let set = fetch_all_bookings(&client, &fetch_config(2, StopPolicy::Conservative))
            .await
            .unwrap();

        let ids = set
            .bookings
            .iter()
            .map(|b| b.id.as_ref().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        assert_eq!(set.reported_total, Some(4));
        assert_eq!(set.pages_fetched, 4);
        assert_eq!(set.stop_reason, StopReason::EmptyPage);
    }

    #[tokio::test]
    async fn repeated_identical_pages_collapse_to_distinct_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [booking(1), booking(2), booking(1)]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let set = fetch_all_bookings(&client, &fetch_config(3, StopPolicy::Conservative))
            .await
            .unwrap();
        assert_eq!(set.bookings.len(), 2);
        assert_eq!(set.pages_fetched, 2);
        assert_eq!(set.stop_reason, StopReason::NoNewItems);
    }

    #[tokio::test]
    async fn short_page_stops_without_total() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([booking(1), booking(2)])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let set = fetch_all_bookings(&client, &fetch_config(50, StopPolicy::Conservative))
            .await
            .unwrap();
        assert_eq!(set.bookings.len(), 2);
        assert_eq!(set.stop_reason, StopReason::ShortPage);
    }

    #[tokio::test]
    async fn falls_back_to_offset_limit_when_paging_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "Unknown parameter page"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "results": [booking(9)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let set = fetch_all_bookings(&client, &fetch_config(10, StopPolicy::FirstSignal))
            .await
            .unwrap();
        assert_eq!(set.bookings.len(), 1);
        assert_eq!(set.stop_reason, StopReason::ShortPage);
    }

    #[tokio::test]
    async fn both_schemes_failing_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({ "message": "Maintenance" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = fetch_all_bookings(&client, &fetch_config(10, StopPolicy::Conservative))
            .await
            .unwrap_err();
        match err {
            AppError::Upstream { status, message } => {
                assert_eq!(status, 503);
                assert!(message.contains("Maintenance"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let requests = server.received_requests().await.unwrap_or_default();
        assert_eq!(requests.len(), 2);
    }

    #[tokio::test]
    async fn page_ceiling_bounds_the_loop() {
        let server = MockServer::start().await;
        let mut next_id = 0;
        for page in 1..=3 {
            let items = (0..2)
                .map(|_| {
                    next_id += 1;
                    booking(next_id)
                })
                .collect::<Vec<_>>();
            Mock::given(method("GET"))
                .and(path(BOOKINGS_PATH))
                .and(query_param("page", page.to_string()))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({ "items": items })),
                )
                .mount(&server)
                .await;
        }

        let client = client_for(&server);
        let mut fetch = fetch_config(2, StopPolicy::Conservative);
        fetch.max_pages = 3;
        let set = fetch_all_bookings(&client, &fetch).await.unwrap();
        assert_eq!(set.bookings.len(), 6);
        assert_eq!(set.pages_fetched, 3);
        assert_eq!(set.stop_reason, StopReason::PageCeiling);
    }

    #[tokio::test]
    async fn filtered_mode_sends_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("periodStart", "2024-03-01"))
            .and(query_param("periodEnd", "2024-03-31"))
            .and(query_param("includeCount", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "items": [booking(1)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut fetch = fetch_config(10, StopPolicy::Conservative);
        fetch.mode = FetchMode::Filtered;
        fetch.range = DateRange::parse("2024-03-01", "2024-03-31");
        let set = fetch_all_bookings(&client, &fetch).await.unwrap();
        assert_eq!(set.bookings.len(), 1);
        assert_eq!(set.stop_reason, StopReason::TotalReached);
    }

    #[tokio::test]
    async fn malformed_items_are_counted_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [booking(1), { "id": 2, "rooms": "not-a-list" }, "junk"]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let set = fetch_all_bookings(&client, &fetch_config(10, StopPolicy::Conservative))
            .await
            .unwrap();
        assert_eq!(set.bookings.len(), 1);
        assert_eq!(set.malformed_items, 2);
    }

    #[tokio::test]
    async fn full_page_of_malformed_items_keeps_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "id": 1, "rooms": "x" }, { "id": 2, "guest": "y" }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "items": [booking(3)] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let set = fetch_all_bookings(&client, &fetch_config(2, StopPolicy::Conservative))
            .await
            .unwrap();
        assert_eq!(set.pages_fetched, 2);
        assert_eq!(set.malformed_items, 2);
        assert_eq!(set.bookings.len(), 1);
        assert_eq!(set.stop_reason, StopReason::ShortPage);
    }

    #[tokio::test]
    async fn non_object_items_are_skipped_without_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [booking(1), 42, "junk"]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let set = fetch_all_bookings(&client, &fetch_config(10, StopPolicy::Conservative))
            .await
            .unwrap();
        assert_eq!(set.bookings.len(), 1);
        assert_eq!(set.malformed_items, 2);
        assert_eq!(set.stop_reason, StopReason::ShortPage);
    }

    #[tokio::test]
    async fn unrecognized_payload_falls_back_to_offset_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 2,
                "data": [booking(1), booking(2)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let set = fetch_all_bookings(&client, &fetch_config(10, StopPolicy::Conservative))
            .await
            .unwrap();
        assert_eq!(set.bookings.len(), 2);
        assert_eq!(set.stop_reason, StopReason::TotalReached);
    }

    #[tokio::test]
    async fn unrecognized_payload_under_both_schemes_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BOOKINGS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "raw": "<html>" })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = fetch_all_bookings(&client, &fetch_config(10, StopPolicy::Conservative))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Shape(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
        let requests = server.received_requests().await.unwrap_or_default();
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn fetch_mode_parsing() {
        assert_eq!(FetchMode::parse("ALL"), Some(FetchMode::All));
        assert_eq!(FetchMode::parse(""), Some(FetchMode::All));
        assert_eq!(FetchMode::parse("filtered"), Some(FetchMode::Filtered));
        assert_eq!(FetchMode::parse("bogus"), None);
    }
}
