use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        Response, StatusCode,
    },
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::BillingRow,
    schemas::{OtcQuery, OtcRequest},
    services::{
        otc_rows::build_rows,
        pagination::{fetch_all_bookings, BookingSet, FetchConfig, PagingScheme},
        properties::fetch_property_map,
        report::{csv_filename, render_csv, OtcReport},
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/api/otc", axum::routing::get(otc_report))
        .route("/api/otc.csv", axum::routing::get(otc_report_csv))
}

async fn otc_report(
    State(state): State<AppState>,
    query: Result<Query<OtcQuery>, QueryRejection>,
) -> AppResult<Json<OtcReport>> {
    let request = checked_request(&state, query)?;
    let (bookings, rows) = run_report(&state, &request).await?;

    Ok(Json(OtcReport {
        ok: true,
        from: request.range.from.to_string(),
        to: request.range.to.to_string(),
        fetch_mode: request.fetch_mode.as_str(),
        bookings_fetched: bookings.bookings.len(),
        reported_total: bookings.reported_total,
        pages_fetched: bookings.pages_fetched,
        rows_count: rows.len(),
        rows,
    }))
}

async fn otc_report_csv(
    State(state): State<AppState>,
    query: Result<Query<OtcQuery>, QueryRejection>,
) -> AppResult<Response<Body>> {
    let request = checked_request(&state, query)?;
    let (_, rows) = run_report(&state, &request).await?;

    let csv = render_csv(&rows)?;
    let filename = csv_filename(
        &request.range.from.to_string(),
        &request.range.to.to_string(),
    );
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(csv))
        .map_err(|e| AppError::Internal(format!("Could not build CSV response: {e}")))
}

pub(crate) fn checked_request(
    state: &AppState,
    query: Result<Query<OtcQuery>, QueryRejection>,
) -> AppResult<OtcRequest> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    query.into_request(&state.config)
}

pub(crate) fn fetch_config(state: &AppState, request: &OtcRequest) -> FetchConfig {
    FetchConfig {
        mode: request.fetch_mode,
        range: Some(request.range),
        page_size: request.page_size,
        max_pages: state.config.otc_max_pages,
        stop_policy: state.config.pagination_stop_policy,
        primary_scheme: PagingScheme::PageSize,
    }
}

/// Property names and bookings are pulled concurrently, then flattened.
async fn run_report(
    state: &AppState,
    request: &OtcRequest,
) -> AppResult<(BookingSet, Vec<BillingRow>)> {
    let fetch = fetch_config(state, request);
    let (properties, bookings) = tokio::join!(
        fetch_property_map(&state.lodgify),
        fetch_all_bookings(&state.lodgify, &fetch)
    );
    let bookings = bookings?;

    let rows = build_rows(&bookings.bookings, &properties, &request.range);
    tracing::info!(
        from = %request.range.from,
        to = %request.range.to,
        mode = request.fetch_mode.as_str(),
        bookings = bookings.bookings.len(),
        malformed = bookings.malformed_items,
        rows = rows.len(),
        "OTC report built"
    );
    Ok((bookings, rows))
}
