pub mod billing_row;
pub mod booking;

pub use billing_row::{BillingRow, LineItemKind, OTC_COLUMNS};
pub use booking::Booking;
