use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    services::dates::parse_calendar_date,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BookingId {
    Number(i64),
    Text(String),
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// A reservation as returned by the upstream bookings listing.
///
/// Parsing is lenient about scalar encodings (numbers sent as strings, dates with
/// a time suffix) but strict about structure: a `guest` that is not an object or
/// `rooms` that is not a list rejects the whole item.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Booking {
    #[serde(deserialize_with = "de_opt_id")]
    pub id: Option<BookingId>,
    #[serde(
        alias = "date_arrival",
        alias = "arrival_date",
        deserialize_with = "de_opt_date"
    )]
    pub arrival: Option<NaiveDate>,
    #[serde(
        alias = "date_departure",
        alias = "departure_date",
        deserialize_with = "de_opt_date"
    )]
    pub departure: Option<NaiveDate>,
    #[serde(deserialize_with = "de_opt_text")]
    pub status: Option<String>,
    #[serde(
        alias = "cancelled_at",
        alias = "date_cancelled",
        deserialize_with = "de_opt_date"
    )]
    pub canceled_at: Option<NaiveDate>,
    #[serde(alias = "house_id", deserialize_with = "de_opt_int")]
    pub property_id: Option<i64>,
    #[serde(deserialize_with = "de_opt_text")]
    pub source: Option<String>,
    #[serde(deserialize_with = "de_opt_text")]
    pub source_text: Option<String>,
    #[serde(
        alias = "external_code",
        alias = "channel_booking_id",
        deserialize_with = "de_opt_text"
    )]
    pub channel_booking: Option<String>,
    pub guest: Option<Guest>,
    pub rooms: Option<Vec<BookingRoom>>,
    pub guest_breakdown: Option<GuestBreakdown>,
    #[serde(deserialize_with = "de_opt_count")]
    pub people: Option<u32>,
    #[serde(alias = "currency", deserialize_with = "de_opt_text")]
    pub currency_code: Option<String>,
    #[serde(alias = "amount", deserialize_with = "de_opt_amount")]
    pub total_amount: Option<f64>,
    pub subtotals: Option<Subtotals>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Guest {
    #[serde(deserialize_with = "de_opt_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "de_opt_text")]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "de_opt_text")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "de_opt_text")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookingRoom {
    #[serde(deserialize_with = "de_opt_int")]
    pub room_type_id: Option<i64>,
    #[serde(alias = "room_type_name", deserialize_with = "de_opt_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "de_opt_count")]
    pub people: Option<u32>,
    pub guest_breakdown: Option<GuestBreakdown>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GuestBreakdown {
    #[serde(deserialize_with = "de_opt_count")]
    pub adults: Option<u32>,
    #[serde(deserialize_with = "de_opt_count")]
    pub children: Option<u32>,
    #[serde(deserialize_with = "de_opt_count")]
    pub infants: Option<u32>,
    #[serde(deserialize_with = "de_opt_count")]
    pub pets: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Subtotals {
    #[serde(deserialize_with = "de_opt_amount")]
    pub stay: Option<f64>,
    #[serde(deserialize_with = "de_opt_amount")]
    pub fees: Option<f64>,
    #[serde(deserialize_with = "de_opt_amount")]
    pub taxes: Option<f64>,
    #[serde(deserialize_with = "de_opt_amount")]
    pub addons: Option<f64>,
    #[serde(deserialize_with = "de_opt_amount")]
    pub promotions: Option<f64>,
    #[serde(deserialize_with = "de_opt_amount")]
    pub vat: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuestCounts {
    pub total: u32,
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
    pub pets: u32,
}

impl Booking {
    pub fn from_value(value: &Value) -> AppResult<Self> {
        if !value.is_object() {
            return Err(AppError::Shape(format!(
                "Booking item is not an object: {}",
                preview(value)
            )));
        }
        Booking::deserialize(value).map_err(|e| {
            AppError::Shape(format!("Booking item has an unexpected structure: {e}"))
        })
    }

    pub fn guest_name(&self) -> String {
        let Some(guest) = &self.guest else {
            return String::new();
        };
        if let Some(name) = &guest.name {
            return name.clone();
        }
        [guest.first_name.as_deref(), guest.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn guest_email(&self) -> String {
        self.guest
            .as_ref()
            .and_then(|guest| guest.email.clone())
            .unwrap_or_default()
    }

    pub fn rooms(&self) -> &[BookingRoom] {
        self.rooms.as_deref().unwrap_or_default()
    }

    /// Per-room breakdowns win over the booking-level one when any room has one.
    pub fn guest_counts(&self) -> GuestCounts {
        let room_breakdowns = self
            .rooms()
            .iter()
            .filter_map(|room| room.guest_breakdown.as_ref())
            .collect::<Vec<_>>();
        let breakdowns = if room_breakdowns.is_empty() {
            self.guest_breakdown.iter().collect::<Vec<_>>()
        } else {
            room_breakdowns
        };

        let mut counts = GuestCounts::default();
        for breakdown in breakdowns {
            counts.adults = counts.adults.saturating_add(breakdown.adults.unwrap_or(0));
            counts.children = counts.children.saturating_add(breakdown.children.unwrap_or(0));
            counts.infants = counts.infants.saturating_add(breakdown.infants.unwrap_or(0));
            counts.pets = counts.pets.saturating_add(breakdown.pets.unwrap_or(0));
        }

        let room_people = self
            .rooms()
            .iter()
            .filter_map(|room| room.people)
            .collect::<Vec<_>>();
        counts.total = if !room_people.is_empty() {
            room_people
                .iter()
                .fold(0u32, |sum, people| sum.saturating_add(*people))
        } else if let Some(people) = self.people {
            people
        } else {
            counts
                .adults
                .saturating_add(counts.children)
                .saturating_add(counts.infants)
        };
        counts
    }
}

fn preview(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 80 {
        format!("{}...", text.chars().take(80).collect::<String>())
    } else {
        text
    }
}

fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<BookingId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_i64().map(BookingId::Number),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                None
            } else if let Ok(number) = text.parse::<i64>() {
                Some(BookingId::Number(number))
            } else {
                Some(BookingId::Text(text.to_string()))
            }
        }
        _ => None,
    })
}

fn de_opt_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        _ => None,
    })
}

fn de_opt_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(text)) => text.trim().parse::<u32>().ok(),
        _ => None,
    })
}

fn de_opt_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let amount = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(amount.filter(|amount| amount.is_finite()))
}

fn de_opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(leading_calendar_date))
}

/// Accepts `YYYY-MM-DD` optionally followed by a `T`/space time part.
fn leading_calendar_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    match text.char_indices().nth(10) {
        None => parse_calendar_date(text),
        Some((idx, 'T' | ' ')) => parse_calendar_date(&text[..idx]),
        Some(_) => None,
    }
}
