use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use minimart_core::{DomainError, MovementId, ProductId, UserId};

/// `reference_type` recorded for operator-entered adjustments.
pub const MANUAL_REFERENCE: &str = "MANUAL";

/// Which way a movement moves stock. Decides the sign applied to `quantity`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }

    /// Apply this direction's sign to a magnitude.
    pub fn signed(&self, quantity: Quantity) -> i64 {
        match self {
            Direction::In => quantity.get(),
            Direction::Out => -quantity.get(),
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = DomainError;

    /// Exact match only: `"in"` or `" IN"` are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(Direction::In),
            "OUT" => Ok(Direction::Out),
            _ => Err(DomainError::validation("direction must be IN or OUT")),
        }
    }
}

/// Descriptive classification of a movement.
///
/// Closed set; it never affects the sign (that is `Direction`'s job).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementType {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
    #[default]
    #[serde(rename = "ADJUST")]
    Adjust,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjust => "ADJUST",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(MovementType::In),
            "OUT" => Ok(MovementType::Out),
            "ADJUST" => Ok(MovementType::Adjust),
            _ => Err(DomainError::validation(
                "movement_type must be one of IN, OUT, ADJUST",
            )),
        }
    }
}

/// Strictly positive movement magnitude.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value <= 0 {
            return Err(DomainError::validation("quantity must be a positive integer"));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A movement ready to be appended (not yet assigned an id or timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub direction: Direction,
    pub quantity: Quantity,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<i64>,
    pub created_by: Option<UserId>,
}

impl NewMovement {
    /// Stamp the store-assigned identity onto the movement.
    pub fn into_stored(self, id: MovementId, created_at: DateTime<Utc>) -> StockMovement {
        StockMovement {
            id,
            product_id: self.product_id,
            movement_type: self.movement_type,
            direction: self.direction,
            quantity: self.quantity,
            reason: self.reason,
            notes: self.notes,
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            created_by: self.created_by,
            created_at,
            deleted_at: None,
        }
    }
}

/// One row of the append-only stock ledger.
///
/// Never mutated after creation; `deleted_at` is the only field a correction
/// workflow may ever set, and this workspace never sets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub direction: Direction,
    pub quantity: Quantity,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<i64>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl StockMovement {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Contribution of this row to the product's stock (0 once soft-deleted).
    pub fn signed_quantity(&self) -> i64 {
        if self.is_deleted() {
            0
        } else {
            self.direction.signed(self.quantity)
        }
    }
}

/// Signed sum of a movement history (IN positive, OUT negative, deleted rows skipped).
///
/// An empty history yields 0. No clamping at zero: a negative total is reported
/// as-is. The running sum saturates at the `i64` bounds instead of overflowing.
pub fn stock_from_movements<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> i64 {
    movements
        .into_iter()
        .map(StockMovement::signed_quantity)
        .fold(0, i64::saturating_add)
}
