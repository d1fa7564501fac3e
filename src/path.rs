//! Status path selection
//!
//! A shipment follows one of two fixed progressions. Path A includes the
//! freight booking sub-steps and applies when the operator owns the booking
//! for the `(incoterm, direction)` pair; every other pair follows Path B.
use crate::error::ParseCodeError;
use crate::shipment::{ShipmentOrder, TransactionDirection};
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Incoterm {
    Exw,
    Fca,
    Fas,
    Fob,
    Cfr,
    Cif,
    Cnf,
    Cpt,
    Cip,
    Dap,
    Dpu,
    Ddp,
}

impl FromStr for Incoterm {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        let term = match code.as_str() {
            "EXW" => Incoterm::Exw,
            "FCA" => Incoterm::Fca,
            "FAS" => Incoterm::Fas,
            "FOB" => Incoterm::Fob,
            "CFR" => Incoterm::Cfr,
            "CIF" => Incoterm::Cif,
            "CNF" | "C&F" => Incoterm::Cnf,
            "CPT" => Incoterm::Cpt,
            "CIP" => Incoterm::Cip,
            "DAP" => Incoterm::Dap,
            "DPU" => Incoterm::Dpu,
            "DDP" => Incoterm::Ddp,
            _ => {
                return Err(ParseCodeError {
                    kind: "incoterm",
                    value: s.to_string(),
                });
            }
        };
        Ok(term)
    }
}

// Pairs where the operator arranges the main carriage booking.
const BOOKING_OWNED: &[(Incoterm, TransactionDirection)] = &[
    (Incoterm::Exw, TransactionDirection::Import),
    (Incoterm::Fca, TransactionDirection::Import),
    (Incoterm::Fca, TransactionDirection::Export),
    (Incoterm::Fob, TransactionDirection::Export),
    (Incoterm::Cfr, TransactionDirection::Export),
    (Incoterm::Cif, TransactionDirection::Export),
    (Incoterm::Cnf, TransactionDirection::Export),
    (Incoterm::Cpt, TransactionDirection::Export),
    (Incoterm::Cip, TransactionDirection::Export),
    (Incoterm::Dap, TransactionDirection::Export),
    (Incoterm::Dpu, TransactionDirection::Export),
    (Incoterm::Ddp, TransactionDirection::Export),
];

const PATH_A: &[StatusCode] = &[
    StatusCode::Draft,
    StatusCode::PendingReview,
    StatusCode::Confirmed,
    StatusCode::BookingPending,
    StatusCode::BookingConfirmed,
    StatusCode::Departed,
    StatusCode::Arrived,
    StatusCode::Completed,
];

const PATH_B: &[StatusCode] = &[
    StatusCode::Draft,
    StatusCode::PendingReview,
    StatusCode::Confirmed,
    StatusCode::Departed,
    StatusCode::Arrived,
    StatusCode::Completed,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathKind {
    /// Operator owns the freight booking.
    A,
    B,
}

/// An ordered, resolved status progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPath {
    kind: PathKind,
    steps: &'static [StatusCode],
}

impl StatusPath {
    pub fn of(kind: PathKind) -> Self {
        let steps = match kind {
            PathKind::A => PATH_A,
            PathKind::B => PATH_B,
        };
        Self { kind, steps }
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn steps(&self) -> &'static [StatusCode] {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn final_status(&self) -> StatusCode {
        self.steps[self.last_index()]
    }

    pub fn status_at(&self, index: usize) -> Option<StatusCode> {
        self.steps.get(index).copied()
    }

    pub fn index_of(&self, status: StatusCode) -> Option<usize> {
        self.steps.iter().position(|s| *s == status)
    }

    pub fn contains(&self, status: StatusCode) -> bool {
        self.index_of(status).is_some()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.label()).collect()
    }
}

impl fmt::Display for StatusPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.labels().join(" -> "))
    }
}

/// Selects the path for an `(incoterm, direction)` pair.
///
/// Missing inputs resolve to Path A; present pairs resolve to Path A only on
/// an exact allow-list match.
pub fn resolve_path(
    incoterm: Option<Incoterm>,
    direction: Option<TransactionDirection>,
) -> StatusPath {
    match (incoterm, direction) {
        (Some(term), Some(dir)) if BOOKING_OWNED.contains(&(term, dir)) => {
            StatusPath::of(PathKind::A)
        }
        (Some(_), Some(_)) => StatusPath::of(PathKind::B),
        _ => StatusPath::of(PathKind::A),
    }
}

/// Resolves the path of a stored record whose incoterm is a free-form code.
///
/// A blank incoterm counts as missing. A present but unrecognised code cannot
/// be on the allow-list and resolves to Path B, unless the direction is missing.
pub fn resolve_for(order: &ShipmentOrder) -> StatusPath {
    let raw = order
        .incoterm
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty());

    let path = match raw {
        None => resolve_path(None, order.transaction_direction),
        Some(code) => match code.parse::<Incoterm>() {
            Ok(term) => resolve_path(Some(term), order.transaction_direction),
            Err(_) if order.transaction_direction.is_none() => StatusPath::of(PathKind::A),
            Err(_) => StatusPath::of(PathKind::B),
        },
    };

    tracing::debug!(shipment_id = %order.id, path = ?path.kind(), "resolved status path");
    path
}

/// Index of the record's status within its resolved path.
///
/// Side statuses take the position of the most recent path status found in
/// the history, or 0 when there is none. A path status that is not on the
/// current path (the incoterm changed after it was reached) takes the
/// position of the last step that precedes it in canonical order.
pub fn current_position(order: &ShipmentOrder) -> usize {
    let path = resolve_for(order);

    if let Some(index) = path.index_of(order.status) {
        return index;
    }

    if order.status.is_side_status() {
        return order
            .status_history
            .iter()
            .rev()
            .find_map(|entry| path.index_of(entry.status))
            .unwrap_or(0);
    }

    path.steps()
        .iter()
        .rposition(|step| *step < order.status)
        .unwrap_or(0)
}
