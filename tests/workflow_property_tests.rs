//! Property-based tests for path selection and the transition engine
//!
//! The engine is pure, so these tests drive it directly with generated
//! operation sequences and check the invariants that every record must keep
//! no matter how it got there:
//!
// 1. Path selection - allow-listed pairs get eight steps, everything else six
// 2. Position bounds - the derived position always indexes the resolved path
// 3. Append-only history - one entry per successful operation, none on failure
// 4. Cancellation is final - every later operation is rejected
// 5. Revert then re-advance - the status reached again matches the original
// 6. Exception overlay - flagging never touches status, history or position
// 7. Legacy assembly is total - any combination of codes assembles
//
// What these tests DON'T cover (deliberately):
//
// - Persistence and compare-and-swap (see scenarios.rs)
//

use proptest::prelude::*;
use shipment_workflow::{
    assembler::assemble,
    exception::set_exception,
    path::{Incoterm, PathKind, StatusPath, resolve_path},
    raw::{LegacyAuxiliaries, LegacyShipment, RawOrder},
    shipment::{LEGACY_SCHEMA, OrderType, ShipmentOrder, TimeStamp, TransactionDirection},
    status::StatusCode,
    transition::{Transition, TransitionContext, apply_transition},
    TransitionError,
};

const INCOTERMS: &[&str] = &[
    "EXW", "FCA", "FAS", "FOB", "CFR", "CIF", "CNF", "CPT", "CIP", "DAP", "DPU", "DDP",
];

const BOOKING_OWNED: &[(&str, TransactionDirection)] = &[
    ("EXW", TransactionDirection::Import),
    ("FCA", TransactionDirection::Import),
    ("FCA", TransactionDirection::Export),
    ("FOB", TransactionDirection::Export),
    ("CFR", TransactionDirection::Export),
    ("CIF", TransactionDirection::Export),
    ("CNF", TransactionDirection::Export),
    ("CPT", TransactionDirection::Export),
    ("CIP", TransactionDirection::Export),
    ("DAP", TransactionDirection::Export),
    ("DPU", TransactionDirection::Export),
    ("DDP", TransactionDirection::Export),
];

#[derive(Debug, Clone)]
enum Op {
    Advance,
    /// Target picked by index into the path, wrapped to its length.
    Jump(usize),
    Revert(usize),
    Cancel,
    Flag(bool),
}

fn incoterm_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(INCOTERMS)
}

fn direction_strategy() -> impl Strategy<Value = TransactionDirection> {
    prop_oneof![
        Just(TransactionDirection::Import),
        Just(TransactionDirection::Export),
        Just(TransactionDirection::Domestic),
    ]
}

/// Strategy to generate an operation, weighted towards forward progress
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Advance),
        2 => (0usize..8).prop_map(Op::Jump),
        2 => (0usize..8).prop_map(Op::Revert),
        1 => Just(Op::Cancel),
        1 => any::<bool>().prop_map(Op::Flag),
    ]
}

fn draft(incoterm: &str, direction: TransactionDirection) -> ShipmentOrder {
    ShipmentOrder::new_draft(
        "shp_prop".to_string(),
        OrderType::SeaFcl,
        Some(direction),
        Some(incoterm.to_string()),
        TimeStamp::new(),
        "ops".to_string(),
    )
}

fn ctx() -> TransitionContext {
    TransitionContext::new(TimeStamp::new(), "ops")
}

fn target(path: &StatusPath, index: usize) -> StatusCode {
    path.steps()[index % path.len()]
}

proptest! {
    /// Property: the allow-list alone decides between the two paths
    #[test]
    fn path_length_follows_allow_list(
        incoterm in incoterm_strategy(),
        direction in direction_strategy(),
    ) {
        let term = incoterm.parse::<Incoterm>().unwrap();
        let path = resolve_path(Some(term), Some(direction));

        if BOOKING_OWNED.contains(&(incoterm, direction)) {
            prop_assert_eq!(path.kind(), PathKind::A);
            prop_assert_eq!(path.len(), 8);
        } else {
            prop_assert_eq!(path.kind(), PathKind::B);
            prop_assert_eq!(path.len(), 6);
        }
    }

    /// Property: a missing input always selects the booking path
    #[test]
    fn missing_input_selects_path_a(
        incoterm in prop::option::of(incoterm_strategy()),
        direction in prop::option::of(direction_strategy()),
    ) {
        prop_assume!(incoterm.is_none() || direction.is_none());
        let term = incoterm.map(|t| t.parse::<Incoterm>().unwrap());

        prop_assert_eq!(resolve_path(term, direction).kind(), PathKind::A);
    }

    /// Property: whatever sequence of operations is applied, the position
    /// stays inside the path and history only grows by appending
    #[test]
    fn operations_keep_record_consistent(
        incoterm in incoterm_strategy(),
        direction in direction_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..=20),
    ) {
        let mut order = draft(incoterm, direction);
        let path = order.path();

        for op in ops {
            let before = order.clone();
            let result = match op {
                Op::Advance => apply_transition(&order, Transition::Advance, &ctx()),
                Op::Jump(i) => apply_transition(&order, Transition::Jump { target: target(&path, i) }, &ctx()),
                Op::Revert(i) => apply_transition(&order, Transition::Revert { target: target(&path, i) }, &ctx()),
                Op::Cancel => apply_transition(&order, Transition::Cancel, &ctx()),
                Op::Flag(flagged) => Ok(set_exception(&order, flagged, None, &TimeStamp::new(), "ops")),
            };

            match (op, result) {
                (Op::Flag(_), Ok(next)) => {
                    prop_assert_eq!(next.status, before.status);
                    prop_assert_eq!(&next.status_history, &before.status_history);
                    order = next;
                }
                (_, Ok(next)) => {
                    prop_assert_eq!(next.status_history.len(), before.status_history.len() + 1);
                    prop_assert_eq!(&next.status_history[..before.status_history.len()], &before.status_history[..]);
                    prop_assert_eq!(next.status_history.last().map(|e| e.status), Some(next.status));
                    order = next;
                }
                (_, Err(err)) => {
                    if before.is_cancelled() {
                        prop_assert_eq!(err, TransitionError::Cancelled);
                    }
                    prop_assert_eq!(&order, &before);
                }
            }

            prop_assert!(order.current_position() < path.len());
        }
    }

    /// Property: after cancellation no transition is accepted
    #[test]
    fn cancellation_is_final(
        incoterm in incoterm_strategy(),
        direction in direction_strategy(),
        advances in 0usize..5,
        ops in prop::collection::vec(op_strategy(), 1..=10),
    ) {
        let mut order = draft(incoterm, direction);
        for _ in 0..advances {
            order = apply_transition(&order, Transition::Advance, &ctx()).unwrap();
        }
        let position = order.current_position();
        let cancelled = apply_transition(&order, Transition::Cancel, &ctx()).unwrap();
        let path = cancelled.path();

        prop_assert_eq!(cancelled.current_position(), position);
        for op in ops {
            let transition = match op {
                Op::Advance => Transition::Advance,
                Op::Jump(i) => Transition::Jump { target: target(&path, i) },
                Op::Revert(i) => Transition::Revert { target: target(&path, i) },
                Op::Cancel | Op::Flag(_) => Transition::Cancel,
            };
            prop_assert_eq!(
                apply_transition(&cancelled, transition, &ctx()),
                Err(TransitionError::Cancelled)
            );
        }
    }

    /// Property: reverting and advancing back lands on the original status
    /// with exactly one history entry per operation
    #[test]
    fn revert_then_readvance_returns(
        incoterm in incoterm_strategy(),
        direction in direction_strategy(),
        from in 1usize..8,
        to in 0usize..8,
    ) {
        let order = draft(incoterm, direction);
        let path = order.path();
        let from = from % path.len();
        prop_assume!(from > 0 && to < from);

        let reached = apply_transition(&order, Transition::Jump { target: path.steps()[from] }, &ctx()).unwrap();
        let mut current = apply_transition(&reached, Transition::Revert { target: path.steps()[to] }, &ctx()).unwrap();
        prop_assert_eq!(current.status_history.last().map(|e| e.undone_steps.len()), Some(from - to));

        for _ in to..from {
            current = apply_transition(&current, Transition::Advance, &ctx()).unwrap();
        }

        prop_assert_eq!(current.status, reached.status);
        prop_assert_eq!(current.status_history.len(), reached.status_history.len() + 1 + (from - to));
    }

    /// Property: the exception overlay leaves the workflow untouched
    #[test]
    fn exception_flag_is_orthogonal(
        incoterm in incoterm_strategy(),
        direction in direction_strategy(),
        advances in 0usize..5,
        toggles in prop::collection::vec(any::<bool>(), 1..=6),
    ) {
        let mut order = draft(incoterm, direction);
        for _ in 0..advances {
            order = apply_transition(&order, Transition::Advance, &ctx()).unwrap();
        }

        let mut flagged = order.clone();
        for toggle in toggles {
            flagged = set_exception(&flagged, toggle, Some("Customs hold".to_string()), &TimeStamp::new(), "ops");
            prop_assert_eq!(flagged.exception.flagged, toggle);
            prop_assert_eq!(flagged.status, order.status);
            prop_assert_eq!(&flagged.status_history, &order.status_history);
            prop_assert_eq!(flagged.current_position(), order.current_position());
        }
    }

    /// Property: legacy assembly never fails for a document with an id
    #[test]
    fn legacy_assembly_is_total(
        quotation_status in prop::option::of(any::<i64>()),
        shipment_status in prop::option::of(prop_oneof![any::<i64>(), Just(4110i64), Just(4190i64)]),
        quotation_type in prop::option::of("[a-z_]{0,12}"),
        incoterm in prop::option::of("[A-Z&]{0,4}"),
        direction in prop::option::of("[a-z]{0,8}"),
    ) {
        let primary = RawOrder {
            id: "Q-prop".to_string(),
            status: quotation_status,
            quotation_type,
            incoterm,
            transaction_direction: direction,
            ..RawOrder::default()
        };
        let aux = LegacyAuxiliaries {
            shipment: shipment_status.map(|status| LegacyShipment {
                status: Some(status),
                ..LegacyShipment::default()
            }),
            ..LegacyAuxiliaries::default()
        };

        let order = assemble(&primary, &aux).unwrap();
        prop_assert_eq!(order.schema_version, LEGACY_SCHEMA);
        prop_assert!(order.current_position() < order.path().len());
    }
}
