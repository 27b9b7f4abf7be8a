//! Domain entities and value types
//!
//! Pure business logic with no I/O. Everything here is exercised by the
//! local store and the sync engine through the port traits.

pub mod errors;
pub mod mutation;
pub mod newtypes;
pub mod record;
pub mod status;
pub mod token;

pub use errors::DomainError;
pub use mutation::{Mutation, MutationAction, MutationStatus, DEFAULT_RETRY_CEILING};
pub use newtypes::{EntityKind, RecordId, Scope};
pub use record::{Record, RecordDraft};
pub use status::SyncStatus;
pub use token::CachedToken;
