use crate::path::PathKind;
use crate::status::StatusCode;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unrecognised {kind} code '{value}'")]
pub struct ParseCodeError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Shipment is cancelled and cannot change status")]
    Cancelled,
    #[error("Shipment is completed, no further status changes are allowed")]
    Terminal,
    #[error("{status} is not a step of path {path:?}")]
    NotOnPath { status: StatusCode, path: PathKind },
    #[error("Shipment is already at the last step of its path")]
    EndOfPath,
    #[error("Cannot move forward to {target}, it is not ahead of {current}")]
    NotForward {
        current: StatusCode,
        target: StatusCode,
    },
    #[error("Cannot revert to {target}, it is not behind {current}")]
    NotBackward {
        current: StatusCode,
        target: StatusCode,
    },
    #[error("Skipping ahead to {target} requires the allow-jump flag")]
    JumpNotAllowed { target: StatusCode },
    #[error("Invoice can only be issued once the shipment is completed")]
    InvoiceBeforeCompletion,
}

#[derive(thiserror::Error, Debug)]
pub enum AssemblyError {
    #[error("Shipment order {0} was not found")]
    PrimaryNotFound(String),
    #[error("Shipment order document has no identifier")]
    MissingIdentifier,
    #[error("Malformed document in {collection}: {reason}")]
    MalformedDocument {
        collection: &'static str,
        reason: String,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Shipment {id} was modified by someone else, reload and retry")]
    ConcurrentModification { id: String },
    #[error("Failed to encode shipment snapshot: {0}")]
    Encoding(String),
    #[error("Failed to decode shipment snapshot: {0}")]
    Decoding(String),
}
