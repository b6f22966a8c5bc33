//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per entity; all public functions are re-exported here.

mod appointment;
mod doctor;
mod message;
mod notification;
mod rating;
mod user;

pub use appointment::*;
pub use doctor::*;
pub use message::*;
pub use notification::*;
pub use rating::*;
pub use user::*;

/// Map an enum-parse failure inside a `query_map` closure to a rusqlite error
/// so it propagates through the row iterator.
pub(crate) fn column_parse_error(
    idx: usize,
    err: crate::db::DatabaseError,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}
