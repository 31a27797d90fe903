use chrono::{DateTime, Datelike, SubsecRound, Utc};

use super::errors::ValidationError;
use super::value_objects::Order;

// ============================================================================
// Order Validation
// ============================================================================
//
// Runs on every decoded order before the storage write. A rejected order is
// left untouched. An accepted one has its delivery phone normalized and its
// creation time cut to microseconds, the precision TIMESTAMPTZ stores, so the
// cached copy equals what storage reads back.
//
// ============================================================================

/// Validate `order`, normalizing the delivery phone when it is accepted.
pub fn validate(order: &mut Order) -> bool {
    validate_order(order).is_ok()
}

/// Same decision as [`validate`], carrying the first rule that failed.
pub fn validate_order(order: &mut Order) -> Result<(), ValidationError> {
    check(order)?;

    if let Some(stripped) = order.delivery.phone.strip_prefix('+') {
        order.delivery.phone = stripped.to_string();
    }
    order.date_created = order.date_created.trunc_subsecs(6);

    Ok(())
}

fn check(order: &Order) -> Result<(), ValidationError> {
    if order.order_uid.is_empty() {
        return Err(ValidationError::MissingOrderUid);
    }
    if order.track_number.is_empty() {
        return Err(ValidationError::MissingTrackNumber);
    }
    // A bare "+" normalizes to nothing.
    let phone = order.delivery.phone.as_str();
    if phone.strip_prefix('+').unwrap_or(phone).is_empty() {
        return Err(ValidationError::MissingPhone);
    }
    if order.payment.transaction.is_empty() {
        return Err(ValidationError::MissingTransaction);
    }
    if order.items.is_empty() {
        return Err(ValidationError::EmptyItems);
    }
    if is_unset(&order.date_created) {
        return Err(ValidationError::UnsetCreationDate);
    }
    Ok(())
}

/// A missing field decodes to the epoch; some producers send year-1 "zero time".
fn is_unset(timestamp: &DateTime<Utc>) -> bool {
    *timestamp == DateTime::<Utc>::default() || timestamp.year() <= 1
}

// ============================================================================
// Unit Tests
// ============================================================================
