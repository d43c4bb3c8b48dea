use serde::Deserialize;
use validator::Validate;

use crate::{
    config::AppConfig,
    error::AppError,
    services::{dates::DateRange, pagination::FetchMode},
};

pub const DATE_USAGE: &str =
    "Invalid or missing dates. Use ?from=YYYY-MM-DD&to=YYYY-MM-DD (e.g. ?from=2024-03-01&to=2024-03-31).";

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::BadRequest(format!("Validation failed: {errors}")))
}

/// Query string shared by `/api/otc`, `/api/otc.csv` and `/api/debug/bookings`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OtcQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    #[validate(range(min = 1, max = 10000))]
    pub limit: Option<u32>,
    #[validate(range(min = 1, max = 10000))]
    pub size: Option<u32>,
    #[serde(rename = "fetchMode")]
    pub fetch_mode: Option<String>,
}

/// Checked form of [`OtcQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtcRequest {
    pub range: DateRange,
    pub page_size: u32,
    pub fetch_mode: FetchMode,
}

impl OtcQuery {
    pub fn into_request(self, config: &AppConfig) -> Result<OtcRequest, AppError> {
        let range = DateRange::parse(
            self.from.as_deref().unwrap_or_default(),
            self.to.as_deref().unwrap_or_default(),
        )
        .ok_or_else(|| AppError::BadRequest(DATE_USAGE.to_string()))?;

        validate_input(&self)?;
        let page_size = self
            .limit
            .or(self.size)
            .unwrap_or_else(|| config.default_page_size());
        if page_size > config.otc_max_page_size {
            return Err(AppError::BadRequest(format!(
                "limit/size must be between 1 and {}.",
                config.otc_max_page_size
            )));
        }

        let fetch_mode = FetchMode::parse(self.fetch_mode.as_deref().unwrap_or_default())
            .ok_or_else(|| {
                AppError::BadRequest("fetchMode must be 'all' or 'filtered'.".to_string())
            })?;

        Ok(OtcRequest {
            range,
            page_size,
            fetch_mode,
        })
    }
}
