use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{BillingRow, OTC_COLUMNS},
};

/// JSON envelope returned by `/api/otc`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtcReport {
    pub ok: bool,
    pub from: String,
    pub to: String,
    pub fetch_mode: &'static str,
    pub bookings_fetched: usize,
    pub reported_total: Option<u64>,
    pub pages_fetched: u32,
    pub rows_count: usize,
    pub rows: Vec<BillingRow>,
}

pub fn csv_filename(from: &str, to: &str) -> String {
    format!("OTCReport_{from}_to_{to}.csv")
}

/// Render rows as CSV with the fixed OTC header, quoting only where needed.
pub fn render_csv(rows: &[BillingRow]) -> AppResult<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(OTC_COLUMNS).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV buffer flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV is not UTF-8: {e}")))
}

fn csv_error(err: csv::Error) -> AppError {
    AppError::Internal(format!("CSV rendering failed: {err}"))
}
