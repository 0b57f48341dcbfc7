//! In-memory stores backing the coordinator
//!
//! Each store is an independent keyed map mutated through single-row
//! upserts; no operation spans two stores transactionally. Device,
//! assignment, and command rows are updated independently and
//! idempotently.

mod assignments;
mod commands;
mod devices;
mod presentations;

pub use assignments::{AssignmentRecord, AssignmentStore};
pub use commands::{AckDisposition, CommandError, CommandQueue, CommandRecord, CommandStatus};
pub use devices::{DeviceRecord, DeviceRegistry, DeviceView};
pub use presentations::PresentationStore;
