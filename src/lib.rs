//! Shipment order status workflow.
//!
//! Resolves the status path of a shipment from its incoterm and direction,
//! executes status transitions against it, manages the exception overlay and
//! assembles canonical records from native or legacy stored documents.

pub mod assembler;
pub mod config;
pub mod error;
pub mod exception;
pub mod path;
pub mod raw;
pub mod service;
pub mod shipment;
pub mod status;
pub mod transition;
pub mod utils;

pub use assembler::{PartySource, assemble};
pub use error::{AssemblyError, StoreError, TransitionError};
pub use exception::set_exception;
pub use path::{Incoterm, PathKind, StatusPath, current_position, resolve_path};
pub use shipment::{ShipmentOrder, TimeStamp};
pub use status::StatusCode;
pub use transition::{Transition, TransitionContext, apply_transition};
