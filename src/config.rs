use std::env;

/// How the pagination loop reconciles "short page" against "reported total".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// Stop on whichever signal shows up first.
    FirstSignal,
    /// Stop only when the signals agree, or on an empty page.
    Conservative,
}

impl StopPolicy {
    fn from_env(value: Option<String>) -> Self {
        match value
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "first_signal" | "first-signal" | "either" => Self::FirstSignal,
            _ => Self::Conservative,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstSignal => "first_signal",
            Self::Conservative => "conservative",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub lodgify_base_url: String,
    pub lodgify_api_key: Option<String>,
    pub upstream_timeout_seconds: u64,
    pub otc_page_size: u32,
    pub otc_max_page_size: u32,
    pub otc_max_pages: u32,
    pub pagination_stop_policy: StopPolicy,
    pub debug_routes_enabled: bool,
    pub static_dir: String,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            app_name: env_or("APP_NAME", "OTC Report API"),
            environment: env_or("ENVIRONMENT", "development"),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse_or("PORT", 8080),
            cors_origins: parse_csv(&env_or("CORS_ORIGINS", "*")),
            lodgify_base_url: normalize_base_url(&env_or(
                "LODGIFY_BASE_URL",
                "https://api.lodgify.com",
            )),
            // Some deployments only set the lowercase variant.
            lodgify_api_key: env_opt("LODGIFY_API_KEY").or_else(|| env_opt("lodgify_api_key")),
            upstream_timeout_seconds: env_parse_or("UPSTREAM_TIMEOUT_SECONDS", 30),
            otc_page_size: env_parse_or("OTC_PAGE_SIZE", 50),
            otc_max_page_size: env_parse_or("OTC_MAX_PAGE_SIZE", 500),
            otc_max_pages: env_parse_or("OTC_MAX_PAGES", 200),
            pagination_stop_policy: StopPolicy::from_env(env_opt("PAGINATION_STOP_POLICY")),
            debug_routes_enabled: env_parse_bool_or("DEBUG_ROUTES_ENABLED", true),
            static_dir: env_or("STATIC_DIR", "public"),
            rate_limit_enabled: env_parse_bool_or("RATE_LIMIT_ENABLED", true),
            rate_limit_per_second: env_parse_or("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst_size: env_parse_or("RATE_LIMIT_BURST_SIZE", 100),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    pub fn debug_routes_enabled_runtime(&self) -> bool {
        if self.is_production() {
            return false;
        }
        self.debug_routes_enabled
    }

    /// Page size used when the request carries neither `limit` nor `size`.
    pub fn default_page_size(&self) -> u32 {
        self.otc_page_size.clamp(1, self.otc_max_page_size.max(1))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "OTC Report API".to_string(),
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            lodgify_base_url: "https://api.lodgify.com".to_string(),
            lodgify_api_key: None,
            upstream_timeout_seconds: 30,
            otc_page_size: 50,
            otc_max_page_size: 500,
            otc_max_pages: 200,
            pagination_stop_policy: StopPolicy::Conservative,
            debug_routes_enabled: true,
            static_dir: "public".to_string(),
            rate_limit_enabled: true,
            rate_limit_per_second: 10,
            rate_limit_burst_size: 100,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase) {
        Some(value) if value == "1" || value == "true" || value == "yes" || value == "on" => true,
        Some(value) if value == "0" || value == "false" || value == "no" || value == "off" => false,
        Some(_) => default,
        None => default,
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn normalize_base_url(raw: &str) -> String {
    let mut base = raw.trim().to_string();
    while base.ends_with('/') {
        base.pop();
    }
    base
}
