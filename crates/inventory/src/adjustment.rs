//! Manual stock adjustment: input validation and the non-negative stock decision.

use serde::{Deserialize, Serialize};

use minimart_core::{DomainError, MovementId, ProductId, UserId};

use crate::movement::{Direction, MANUAL_REFERENCE, MovementType, NewMovement, Quantity};

/// Audit action recorded for every successful adjustment.
pub const ADJUST_ACTION: &str = "inventory.adjust";

const MAX_REASON_LEN: usize = 255;

/// Adjustment request exactly as the caller sent it (nothing validated yet).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAdjustment {
    pub product_id: Option<i64>,
    pub direction: Option<String>,
    pub quantity: Option<i64>,
    pub movement_type: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Command: AdjustStock (validated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub direction: Direction,
    pub quantity: Quantity,
    pub movement_type: MovementType,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub acting_user: Option<UserId>,
}

impl AdjustStock {
    /// Validate a raw request. Fails fast on the first bad field, in the order
    /// product, direction, quantity, movement type.
    pub fn parse(raw: RawAdjustment, acting_user: Option<UserId>) -> Result<Self, DomainError> {
        let product_id = raw
            .product_id
            .ok_or_else(|| DomainError::validation("product_id must be an integer"))?;
        let product_id = ProductId::new(product_id)
            .map_err(|_| DomainError::validation("product_id must be a positive integer"))?;

        let direction: Direction = raw
            .direction
            .as_deref()
            .ok_or_else(|| DomainError::validation("direction must be IN or OUT"))?
            .parse()?;

        let quantity = raw
            .quantity
            .ok_or_else(|| DomainError::validation("quantity must be a positive integer"))?;
        let quantity = Quantity::new(quantity)?;

        let movement_type = match raw.movement_type.as_deref() {
            None => MovementType::default(),
            Some(s) => s.parse()?,
        };

        if let Some(reason) = &raw.reason {
            if reason.chars().count() > MAX_REASON_LEN {
                return Err(DomainError::validation(format!(
                    "reason must be at most {MAX_REASON_LEN} characters"
                )));
            }
        }

        Ok(Self {
            product_id,
            direction,
            quantity,
            movement_type,
            reason: raw.reason,
            notes: raw.notes,
            acting_user,
        })
    }
}

/// Outcome of a successful decision: the row to append and the stock snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentDecision {
    pub before: i64,
    pub after: i64,
    pub movement: NewMovement,
}

/// Decide whether `command` may be applied on top of `before`.
///
/// Pure; the caller is responsible for reading `before` under the same lock it
/// will append under. An IN that would push stock past `i64::MAX` is rejected
/// as invalid input.
pub fn decide(before: i64, command: &AdjustStock) -> Result<AdjustmentDecision, DomainError> {
    let after = before.checked_add(command.direction.signed(command.quantity));
    let after = match (command.direction, after) {
        (Direction::Out, Some(after)) if after >= 0 => after,
        (Direction::Out, _) => {
            return Err(DomainError::insufficient_stock(
                command.quantity.get(),
                before,
            ));
        }
        (Direction::In, Some(after)) => after,
        (Direction::In, None) => {
            return Err(DomainError::validation(
                "quantity would overflow the stock level",
            ));
        }
    };

    Ok(AdjustmentDecision {
        before,
        after,
        movement: NewMovement {
            product_id: command.product_id,
            movement_type: command.movement_type,
            direction: command.direction,
            quantity: command.quantity,
            reason: command.reason.clone(),
            notes: command.notes.clone(),
            reference_type: Some(MANUAL_REFERENCE.to_string()),
            reference_id: None,
            created_by: command.acting_user,
        },
    })
}

/// Audit payload for `inventory.adjust`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRecorded {
    pub product_id: ProductId,
    pub movement_id: MovementId,
    pub movement_type: MovementType,
    pub direction: Direction,
    pub quantity: Quantity,
    pub before: i64,
    pub after: i64,
    pub reason: Option<String>,
}
