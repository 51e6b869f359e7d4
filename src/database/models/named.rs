use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{
    InternalError, GENRE_ALREADY_EXISTS, GENRE_NOT_FOUND, PUBLISHER_ALREADY_EXISTS, PUBLISHER_NOT_FOUND,
    TAG_ALREADY_EXISTS, TAG_NOT_FOUND,
};

/// Entities that are nothing more than a unique name.
pub trait Named {
    /// Lower-case entity name used in log and error context.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    const NOT_FOUND: InternalError;
    const ALREADY_EXISTS: InternalError;

    fn new(id: Uuid, name: String) -> Self;
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
}

macro_rules! named_entity {
    ($(#[$meta:meta])* $name:ident, $entity:literal, $table:literal, $not_found:ident, $exists:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
        pub struct $name {
            pub id: Uuid,
            pub name: String,
        }

        impl Named for $name {
            const ENTITY: &'static str = $entity;
            const TABLE: &'static str = $table;
            const NOT_FOUND: InternalError = $not_found;
            const ALREADY_EXISTS: InternalError = $exists;

            fn new(id: Uuid, name: String) -> Self {
                Self { id, name }
            }

            fn id(&self) -> Uuid {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn set_name(&mut self, name: String) {
                self.name = name;
            }
        }
    };
}

named_entity!(Publisher, "publisher", "publishers", PUBLISHER_NOT_FOUND, PUBLISHER_ALREADY_EXISTS);
named_entity!(Tag, "tag", "tags", TAG_NOT_FOUND, TAG_ALREADY_EXISTS);
named_entity!(
    /// Same shape as a tag; not attached to books yet.
    Genre,
    "genre",
    "genres",
    GENRE_NOT_FOUND,
    GENRE_ALREADY_EXISTS
);
