//! Repository Layer
//!
//! MongoDB repositories for all domain entities. Every capacity, stock,
//! membership, attendance, and decision mutation is a single conditional
//! update whose filter encodes the precondition, so check and write happen
//! as one server-side step.

pub mod event;
pub mod ticket;
pub mod team;
pub mod indexes;

pub use event::EventRepository;
pub use ticket::TicketRepository;
pub use team::TeamRepository;
pub use indexes::ensure_indexes;

/// Detect a unique-index violation so callers can translate the storage
/// rejection into a precise ConflictError.
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_err)) => write_err.code == 11000,
        ErrorKind::Command(command_err) => command_err.code == 11000,
        _ => false,
    }
}
