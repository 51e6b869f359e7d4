use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Person;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Author {
    pub id: Uuid,
    pub person_id: Option<Uuid>,
    pub pseudonym: String,
    /// Read-time copy of the linked person, filled only when expansion is requested.
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub person: Option<Person>,
}

impl Author {
    /// An author must resolve to a human identity: a linked person or a
    /// non-blank pseudonym.
    pub fn has_identity(&self) -> bool {
        has_identity(self.person_id, &self.pseudonym)
    }
}

pub fn has_identity(person_id: Option<Uuid>, pseudonym: &str) -> bool {
    person_id.is_some() || !pseudonym.trim().is_empty()
}
