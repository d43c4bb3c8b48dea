use std::collections::HashSet;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::Booking,
    routes::otc::{checked_request, fetch_config},
    schemas::OtcQuery,
    services::{
        dates::{overlaps, DateRange},
        pagination::{fetch_all_bookings, BookingSet, FetchMode, BOOKINGS_PATH},
    },
    state::AppState,
};

const ID_SAMPLE_LIMIT: usize = 50;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/api/_ping", axum::routing::get(ping))
}

pub fn debug_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/api/bookings", axum::routing::get(raw_bookings))
        .route("/api/debug/bookings", axum::routing::get(debug_bookings))
}

/// Cheap authenticated call to confirm the key works.
async fn ping(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let data = state.lodgify.get("/v1/countries", Vec::new()).await?;
    let sample_count = data.as_array().map(Vec::len);
    Ok(Json(json!({ "ok": true, "sampleCount": sample_count })))
}

/// First upstream bookings page, untouched.
async fn raw_bookings(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let data = state.lodgify.get(BOOKINGS_PATH, Vec::new()).await?;
    Ok(Json(json!({ "ok": true, "data": data })))
}

/// Compare an unfiltered pull against an upstream-filtered one for the same window.
async fn debug_bookings(
    State(state): State<AppState>,
    query: Result<Query<OtcQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let request = checked_request(&state, query)?;

    let mut all_fetch = fetch_config(&state, &request);
    all_fetch.mode = FetchMode::All;
    let mut filtered_fetch = all_fetch.clone();
    filtered_fetch.mode = FetchMode::Filtered;

    let (all, filtered) = tokio::try_join!(
        fetch_all_bookings(&state.lodgify, &all_fetch),
        fetch_all_bookings(&state.lodgify, &filtered_fetch)
    )?;

    let all_ids = booking_ids(&all.bookings);
    let filtered_ids = booking_ids(&filtered.bookings);
    let only_in_all = all_ids
        .iter()
        .filter(|id| !filtered_ids.contains(*id))
        .take(ID_SAMPLE_LIMIT)
        .cloned()
        .collect::<Vec<_>>();
    let only_in_filtered = filtered_ids
        .iter()
        .filter(|id| !all_ids.contains(*id))
        .take(ID_SAMPLE_LIMIT)
        .cloned()
        .collect::<Vec<_>>();

    Ok(Json(json!({
        "ok": true,
        "from": request.range.from.to_string(),
        "to": request.range.to.to_string(),
        "all": pull_summary(&all, &request.range),
        "filtered": pull_summary(&filtered, &request.range),
        "onlyInAll": only_in_all,
        "onlyInFiltered": only_in_filtered,
    })))
}

fn pull_summary(set: &BookingSet, range: &DateRange) -> Value {
    json!({
        "fetched": set.bookings.len(),
        "inRange": in_range_count(&set.bookings, range),
        "reportedTotal": set.reported_total,
        "pages": set.pages_fetched,
        "malformed": set.malformed_items,
        "stopReason": set.stop_reason.as_str(),
    })
}

fn in_range_count(bookings: &[Booking], range: &DateRange) -> usize {
    bookings
        .iter()
        .filter(|booking| match (booking.arrival, booking.departure) {
            (Some(arrival), Some(departure)) => overlaps(arrival, departure, range.from, range.to),
            _ => false,
        })
        .count()
}

/// Ordered ids; bookings without an id are left out of the comparison.
fn booking_ids(bookings: &[Booking]) -> OrderedIds {
    let mut ids = OrderedIds::default();
    for booking in bookings {
        if let Some(id) = &booking.id {
            ids.insert(id.to_string());
        }
    }
    ids
}

#[derive(Default)]
struct OrderedIds {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedIds {
    fn insert(&mut self, id: String) {
        if self.seen.insert(id.clone()) {
            self.order.push(id);
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    fn iter(&self) -> std::slice::Iter<'_, String> {
        self.order.iter()
    }
}
