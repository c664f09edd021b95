use serde::Deserialize;
use serde_json::Value as JsonValue;

use minimart_infra::Page;
use minimart_inventory::RawAdjustment;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /inventory/adjust`.
///
/// The typed fields are kept loose so a wrong JSON type gets the same message
/// as a missing or out-of-range value.
#[derive(Debug, Default, Deserialize)]
pub struct AdjustStockRequest {
    pub product_id: Option<JsonValue>,
    pub direction: Option<JsonValue>,
    pub quantity: Option<JsonValue>,
    pub movement_type: Option<JsonValue>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl AdjustStockRequest {
    pub fn into_raw(self) -> Result<RawAdjustment, String> {
        Ok(RawAdjustment {
            product_id: integer_field(self.product_id, "product_id must be an integer")?,
            direction: string_field(self.direction, "direction must be IN or OUT")?,
            quantity: integer_field(self.quantity, "quantity must be a positive integer")?,
            movement_type: string_field(
                self.movement_type,
                "movement_type must be one of IN, OUT, ADJUST",
            )?,
            reason: self.reason,
            notes: self.notes,
        })
    }
}

fn integer_field(value: Option<JsonValue>, message: &str) -> Result<Option<i64>, String> {
    match value {
        None => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| message.to_string()),
    }
}

fn string_field(value: Option<JsonValue>, message: &str) -> Result<Option<String>, String> {
    match value {
        None => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(_) => Err(message.to_string()),
    }
}

/// Query string of `GET /inventory/movements`.
#[derive(Debug, Default, Deserialize)]
pub struct MovementsQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<MovementsQuery> for Page {
    fn from(q: MovementsQuery) -> Self {
        Page::new(q.limit, q.offset.unwrap_or(0))
    }
}
