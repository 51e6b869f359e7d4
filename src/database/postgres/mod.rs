//! Postgres implementations of the storage traits.

mod authors;
mod books;
mod named;
mod persons;
mod users;

pub use authors::AuthorsPg;
pub use books::BooksPg;
pub use named::NamedRepository;
pub use persons::PersonsPg;
pub use users::UsersPg;

use crate::error::{Error, InternalError};

pub(crate) const UNIQUE_VIOLATION: &str = "23505";
pub(crate) const CHECK_VIOLATION: &str = "23514";
pub(crate) const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Translates a constraint violation into its domain error. Anything not
/// listed in `mapping` passes through as a database error.
pub(crate) fn map_violation(err: sqlx::Error, mapping: &[(&str, InternalError)]) -> Error {
    let code = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned());

    if let Some(code) = code {
        if let Some((_, kind)) = mapping.iter().find(|(c, _)| *c == code) {
            return kind.clone().into();
        }
    }
    err.into()
}
