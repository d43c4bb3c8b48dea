use std::collections::HashMap;

use serde_json::Value;

use crate::services::{lodgify::LodgifyClient, pagination::extract_items};

const PROPERTY_SOURCES: [(&str, &[(&str, &str)]); 2] = [
    ("/v2/properties", &[("page", "1"), ("size", "200")]),
    ("/v1/properties", &[]),
];

/// Display names for houses and room types, scoped to one report request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    pub houses: HashMap<i64, String>,
    pub room_types: HashMap<i64, String>,
}

impl PropertyMap {
    pub fn is_empty(&self) -> bool {
        self.houses.is_empty()
    }

    /// House display name, or the stringified id when the house is unknown.
    pub fn house_name(&self, property_id: Option<i64>) -> String {
        let Some(id) = property_id else {
            return String::new();
        };
        self.houses
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    pub fn room_type_name(&self, room_type_id: i64) -> Option<&str> {
        self.room_types.get(&room_type_id).map(String::as_str)
    }
}

/// Fetch the id→name property mapping. Never fails: every problem degrades to
/// an empty map so the report still renders with numeric house ids.
pub async fn fetch_property_map(client: &LodgifyClient) -> PropertyMap {
    for (path, params) in PROPERTY_SOURCES {
        let query = params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        match client.get(path, query).await {
            Ok(payload) => {
                let map = parse_property_map(&payload);
                if !map.is_empty() {
                    tracing::debug!(path, houses = map.houses.len(), "Loaded property names");
                    return map;
                }
                tracing::warn!(path, "Property listing returned no usable entries");
            }
            Err(err) => {
                tracing::warn!(path, error = %err, "Property listing failed");
            }
        }
    }

    tracing::warn!("No property names available, falling back to house ids");
    PropertyMap::default()
}

pub fn parse_property_map(payload: &Value) -> PropertyMap {
    let mut map = PropertyMap::default();
    let Some((_, items)) = extract_items(payload) else {
        return map;
    };

    for item in items {
        let Some(id) = int_value(item.get("id")) else {
            continue;
        };
        if let Some(name) = text_value(item.get("name")).or_else(|| text_value(item.get("internal_name"))) {
            map.houses.insert(id, name);
        }

        for key in ["rooms", "room_types"] {
            let Some(rooms) = item.get(key).and_then(Value::as_array) else {
                continue;
            };
            for room in rooms {
                if let (Some(room_id), Some(room_name)) =
                    (int_value(room.get("id")), text_value(room.get("name")))
                {
                    map.room_types.insert(room_id, room_name);
                }
            }
        }
    }
    map
}

fn int_value(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn text_value(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}
