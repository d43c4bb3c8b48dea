use serde::{Deserialize, Serialize};

/// Column order of the OTC export. Field order below must match.
pub const OTC_COLUMNS: [&str; 26] = [
    "Id",
    "Source",
    "SourceText",
    "ChannelBooking",
    "Status",
    "DateCancelled",
    "DateArrival",
    "DateDeparture",
    "Nights",
    "HouseName",
    "HouseId",
    "RoomTypeNames",
    "RoomTypeIds",
    "GuestName",
    "GuestEmail",
    "NumberOfGuests",
    "Adults",
    "Children",
    "Infants",
    "Pets",
    "Currency",
    "LineItem",
    "LineItemDescription",
    "GrossAmount",
    "NetAmount",
    "VatAmount",
];

/// Charge categories, in the order they are emitted for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemKind {
    Stay,
    Fees,
    Taxes,
    Addons,
    Promotions,
    Vat,
    Total,
}

impl LineItemKind {
    pub const SUBTOTAL_ORDER: [LineItemKind; 6] = [
        Self::Stay,
        Self::Fees,
        Self::Taxes,
        Self::Addons,
        Self::Promotions,
        Self::Vat,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Stay => "Stay",
            Self::Fees => "Fees",
            Self::Taxes => "Taxes",
            Self::Addons => "Addons",
            Self::Promotions => "Promotions",
            Self::Vat => "VAT",
            Self::Total => "Total",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Stay => "Accommodation",
            Self::Fees => "Fees",
            Self::Taxes => "Taxes",
            Self::Addons => "Add-ons",
            Self::Promotions => "Promotions",
            Self::Vat => "VAT",
            Self::Total => "Booking total",
        }
    }
}

/// One line of the OTC report: booking metadata plus a single charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BillingRow {
    pub id: String,
    pub source: String,
    pub source_text: String,
    pub channel_booking: String,
    pub status: String,
    pub date_cancelled: String,
    pub date_arrival: String,
    pub date_departure: String,
    pub nights: i64,
    pub house_name: String,
    pub house_id: String,
    pub room_type_names: String,
    pub room_type_ids: String,
    pub guest_name: String,
    pub guest_email: String,
    pub number_of_guests: u32,
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
    pub pets: u32,
    pub currency: String,
    pub line_item: String,
    pub line_item_description: String,
    pub gross_amount: f64,
    pub net_amount: f64,
    pub vat_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::{BillingRow, OTC_COLUMNS};

    #[test]
    fn json_keys_follow_column_contract() {
        let row = BillingRow {
            id: "1".to_string(),
            source: String::new(),
            source_text: String::new(),
            channel_booking: String::new(),
            status: String::new(),
            date_cancelled: String::new(),
            date_arrival: String::new(),
            date_departure: String::new(),
            nights: 0,
            house_name: String::new(),
            house_id: String::new(),
            room_type_names: String::new(),
            room_type_ids: String::new(),
            guest_name: String::new(),
            guest_email: String::new(),
            number_of_guests: 0,
            adults: 0,
            children: 0,
            infants: 0,
            pets: 0,
            currency: String::new(),
            line_item: String::new(),
            line_item_description: String::new(),
            gross_amount: 0.0,
            net_amount: 0.0,
            vat_amount: 0.0,
        };
        let value = serde_json::to_value(&row).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), OTC_COLUMNS.len());
        for column in OTC_COLUMNS {
            assert!(object.contains_key(column), "missing {column}");
        }
    }
}
