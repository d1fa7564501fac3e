//! Status transition engine
//!
//! Pure functions over a record snapshot. Every successful call returns a new
//! record whose `status` and appended history entry were produced together;
//! a rejected call returns the error and leaves the input untouched.
use crate::error::TransitionError;
use crate::shipment::{HistoryEntry, ShipmentOrder, TimeStamp, TransitionKind};
use crate::status::StatusCode;

/// Who performs a change, when, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionContext {
    pub at: TimeStamp,
    pub actor: String,
    pub note: Option<String>,
}

impl TransitionContext {
    pub fn new(at: TimeStamp, actor: impl Into<String>) -> Self {
        Self {
            at,
            actor: actor.into(),
            note: None,
        }
    }
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move to the next step of the path.
    Advance,
    /// Skip ahead to any later step of the path.
    Jump { target: StatusCode },
    /// Move back to any earlier step of the path.
    Revert { target: StatusCode },
    Cancel,
}

impl Transition {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Transition::Advance => TransitionKind::Advance,
            Transition::Jump { .. } => TransitionKind::Jump,
            Transition::Revert { .. } => TransitionKind::Revert,
            Transition::Cancel => TransitionKind::Cancel,
        }
    }

    /// Classifies a requested target status into the operation that reaches it.
    ///
    /// Moving more than one step ahead is only accepted when `allow_jump` is set.
    pub fn towards(
        order: &ShipmentOrder,
        target: StatusCode,
        allow_jump: bool,
    ) -> Result<Transition, TransitionError> {
        ensure_mutable(order)?;

        if target == StatusCode::Cancelled {
            return Ok(Transition::Cancel);
        }

        let path = order.path();
        let index = path.index_of(target).ok_or(TransitionError::NotOnPath {
            status: target,
            path: path.kind(),
        })?;
        let position = order.current_position();

        if index == position + 1 {
            Ok(Transition::Advance)
        } else if index > position {
            if allow_jump {
                Ok(Transition::Jump { target })
            } else {
                Err(TransitionError::JumpNotAllowed { target })
            }
        } else if index < position || (index == position && is_off_path(order)) {
            Ok(Transition::Revert { target })
        } else {
            Err(TransitionError::NotForward {
                current: order.status,
                target,
            })
        }
    }
}

fn ensure_mutable(order: &ShipmentOrder) -> Result<(), TransitionError> {
    if order.is_cancelled() {
        return Err(TransitionError::Cancelled);
    }
    if order.is_completed() {
        return Err(TransitionError::Terminal);
    }
    Ok(())
}

// A path status left behind by an incoterm change. Its position is the step
// before it, which stays reachable by a revert.
fn is_off_path(order: &ShipmentOrder) -> bool {
    !order.status.is_side_status() && !order.path().contains(order.status)
}

fn append(order: &ShipmentOrder, entry: HistoryEntry, at: &TimeStamp) -> ShipmentOrder {
    let mut next = order.clone();
    next.status = entry.status;
    next.status_history.push(entry);
    next.updated_at = Some(at.clone());
    next
}

/// Executes `transition` against `order`.
pub fn apply_transition(
    order: &ShipmentOrder,
    transition: Transition,
    ctx: &TransitionContext,
) -> Result<ShipmentOrder, TransitionError> {
    ensure_mutable(order)?;

    let path = order.path();
    let position = order.current_position();

    let entry = match transition {
        Transition::Advance => {
            if position >= path.last_index() {
                return Err(TransitionError::EndOfPath);
            }
            let next = path.steps()[position + 1];
            HistoryEntry::new(
                next,
                TransitionKind::Advance,
                ctx.at.clone(),
                ctx.actor.clone(),
                ctx.note.clone(),
            )
        }
        Transition::Jump { target } => {
            let index = path.index_of(target).ok_or(TransitionError::NotOnPath {
                status: target,
                path: path.kind(),
            })?;
            if index <= position {
                return Err(TransitionError::NotForward {
                    current: order.status,
                    target,
                });
            }
            HistoryEntry::new(
                target,
                TransitionKind::Jump,
                ctx.at.clone(),
                ctx.actor.clone(),
                ctx.note.clone(),
            )
        }
        Transition::Revert { target } => {
            let index = path.index_of(target).ok_or(TransitionError::NotOnPath {
                status: target,
                path: path.kind(),
            })?;
            let off_path = is_off_path(order);
            if index > position || (index == position && !off_path) {
                return Err(TransitionError::NotBackward {
                    current: order.status,
                    target,
                });
            }

            let mut undone = path.steps()[index + 1..=position].to_vec();
            if off_path {
                undone.push(order.status);
            }
            let summary = format!(
                "Reverted from {} to {}, undone: {}",
                order.status,
                target,
                undone
                    .iter()
                    .map(|s| s.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            let note = match &ctx.note {
                Some(reason) => format!("{summary} ({reason})"),
                None => summary,
            };

            let mut entry = HistoryEntry::new(
                target,
                TransitionKind::Revert,
                ctx.at.clone(),
                ctx.actor.clone(),
                Some(note),
            );
            entry.reverted = true;
            entry.reverted_from = Some(order.status);
            entry.undone_steps = undone;
            entry
        }
        Transition::Cancel => HistoryEntry::new(
            StatusCode::Cancelled,
            TransitionKind::Cancel,
            ctx.at.clone(),
            ctx.actor.clone(),
            ctx.note.clone(),
        ),
    };

    tracing::info!(
        shipment_id = %order.id,
        from = %order.status,
        to = %entry.status,
        kind = ?entry.kind,
        "status changed"
    );

    Ok(append(order, entry, &ctx.at))
}

/// Transitions legal from the record's current state, for presentation.
pub fn available_transitions(order: &ShipmentOrder) -> Vec<Transition> {
    if ensure_mutable(order).is_err() {
        return vec![];
    }

    let path = order.path();
    let position = order.current_position();
    let mut actions = vec![];

    if position < path.last_index() {
        actions.push(Transition::Advance);
    }
    for target in path.steps().iter().skip(position + 2) {
        actions.push(Transition::Jump { target: *target });
    }
    let reverts = if is_off_path(order) { position + 1 } else { position };
    for target in path.steps().iter().take(reverts) {
        actions.push(Transition::Revert { target: *target });
    }
    actions.push(Transition::Cancel);

    actions
}

/// Toggles the invoice marker; only a completed shipment can be invoiced.
pub fn set_issued_invoice(
    order: &ShipmentOrder,
    issued: bool,
    at: &TimeStamp,
) -> Result<ShipmentOrder, TransitionError> {
    if !order.is_completed() {
        return Err(TransitionError::InvoiceBeforeCompletion);
    }

    let mut next = order.clone();
    next.issued_invoice = issued;
    next.updated_at = Some(at.clone());
    Ok(next)
}
