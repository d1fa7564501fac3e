//! Exception flag manager
//!
//! The flag is an overlay on a shipment. It never reads or writes `status` or
//! `status_history`.
use crate::shipment::{ExceptionFlag, ShipmentOrder, TimeStamp};

/// Raises or clears the exception flag.
///
/// Raising an already raised flag keeps the original `raised_at`/`raised_by`
/// and only replaces the notes. Clearing always drops the notes.
pub fn set_exception(
    order: &ShipmentOrder,
    flagged: bool,
    notes: Option<String>,
    at: &TimeStamp,
    actor: &str,
) -> ShipmentOrder {
    let mut next = order.clone();

    next.exception = if flagged {
        let notes = notes.filter(|n| !n.trim().is_empty());
        if order.exception.flagged {
            ExceptionFlag {
                notes,
                ..order.exception.clone()
            }
        } else {
            ExceptionFlag {
                flagged: true,
                raised_at: Some(at.clone()),
                raised_by: Some(actor.to_string()),
                notes,
            }
        }
    } else {
        ExceptionFlag::default()
    };

    if next.exception != order.exception {
        next.updated_at = Some(at.clone());
        tracing::info!(
            shipment_id = %order.id,
            flagged,
            "exception flag updated"
        );
    }

    next
}
