use crate::{
    models::{booking::Subtotals, BillingRow, Booking, LineItemKind},
    services::{
        dates::{
            clamped_nights_in_range, format_display_date, night_count, overlaps, DateRange,
        },
        properties::PropertyMap,
    },
};

struct LineItem {
    kind: LineItemKind,
    amount: f64,
}

/// Flatten bookings into OTC rows for `range`, prorating charges by the share
/// of nights that fall inside it. Order follows `bookings`, then category order.
pub fn build_rows(bookings: &[Booking], properties: &PropertyMap, range: &DateRange) -> Vec<BillingRow> {
    let mut rows = Vec::new();

    for booking in bookings {
        let (Some(arrival), Some(departure)) = (booking.arrival, booking.departure) else {
            tracing::debug!(id = ?booking.id, "Skipping booking without stay dates");
            continue;
        };
        if !overlaps(arrival, departure, range.from, range.to) {
            continue;
        }

        let total_nights = night_count(arrival, departure);
        let nights_in_range = clamped_nights_in_range(arrival, departure, range.from, range.to);
        if nights_in_range == 0 || total_nights == 0 {
            continue;
        }
        let ratio = nights_in_range as f64 / total_nights as f64;

        let line_items = line_items(booking, ratio);
        if line_items.is_empty() {
            tracing::debug!(id = ?booking.id, "Booking has no billable amounts in range");
            continue;
        }

        let counts = booking.guest_counts();
        let rooms = booking.rooms();
        let room_type_ids = rooms
            .iter()
            .filter_map(|room| room.room_type_id)
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let room_type_names = rooms
            .iter()
            .filter_map(|room| {
                room.name.clone().or_else(|| {
                    room.room_type_id.map(|id| {
                        properties
                            .room_type_name(id)
                            .map(ToOwned::to_owned)
                            .unwrap_or_else(|| id.to_string())
                    })
                })
            })
            .collect::<Vec<_>>()
            .join(", ");

        for item in line_items {
            rows.push(BillingRow {
                id: booking.id.as_ref().map(ToString::to_string).unwrap_or_default(),
                source: booking.source.clone().unwrap_or_default(),
                source_text: booking.source_text.clone().unwrap_or_default(),
                channel_booking: booking.channel_booking.clone().unwrap_or_default(),
                status: booking.status.clone().unwrap_or_default(),
                date_cancelled: booking
                    .canceled_at
                    .map(format_display_date)
                    .unwrap_or_default(),
                date_arrival: format_display_date(arrival),
                date_departure: format_display_date(departure),
                nights: nights_in_range,
                house_name: properties.house_name(booking.property_id),
                house_id: booking
                    .property_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                room_type_names: room_type_names.clone(),
                room_type_ids: room_type_ids.clone(),
                guest_name: booking.guest_name(),
                guest_email: booking.guest_email(),
                number_of_guests: counts.total,
                adults: counts.adults,
                children: counts.children,
                infants: counts.infants,
                pets: counts.pets,
                currency: booking.currency_code.clone().unwrap_or_default(),
                line_item: item.kind.tag().to_string(),
                line_item_description: format!(
                    "{} ({} of {} nights)",
                    item.kind.label(),
                    nights_in_range,
                    total_nights
                ),
                gross_amount: item.amount,
                // Net mirrors gross and VAT stays zero even for the VAT line.
                // Pending product confirmation before splitting VAT out.
                net_amount: item.amount,
                vat_amount: 0.0,
            });
        }
    }

    rows
}

fn line_items(booking: &Booking, ratio: f64) -> Vec<LineItem> {
    let mut items = Vec::new();
    if let Some(subtotals) = &booking.subtotals {
        for kind in LineItemKind::SUBTOTAL_ORDER {
            let Some(amount) = subtotal(subtotals, kind) else {
                continue;
            };
            let prorated = round2(amount * ratio);
            if prorated != 0.0 {
                items.push(LineItem {
                    kind,
                    amount: prorated,
                });
            }
        }
    }

    if items.is_empty() {
        if let Some(total) = booking.total_amount {
            let prorated = round2(total * ratio);
            if prorated != 0.0 {
                items.push(LineItem {
                    kind: LineItemKind::Total,
                    amount: prorated,
                });
            }
        }
    }
    items
}

fn subtotal(subtotals: &Subtotals, kind: LineItemKind) -> Option<f64> {
    match kind {
        LineItemKind::Stay => subtotals.stay,
        LineItemKind::Fees => subtotals.fees,
        LineItemKind::Taxes => subtotals.taxes,
        LineItemKind::Addons => subtotals.addons,
        LineItemKind::Promotions => subtotals.promotions,
        LineItemKind::Vat => subtotals.vat,
        LineItemKind::Total => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
