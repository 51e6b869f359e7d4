/// Shared types used across the codebase

use serde::{Deserialize, Deserializer};

/// A field of a partial update.
///
/// `Unset` means "leave the stored value alone"; `Set` carries the new value,
/// which for list fields may be empty ("clear all") and for nullable fields
/// may be `None` ("unlink").
///
/// Deserializes from a present JSON field as `Set`; combine with
/// `#[serde(default)]` so a missing field becomes `Unset`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unset,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Unset => None,
        }
    }

    pub fn into_set(self) -> Option<T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Unset => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Set(value) => Patch::Set(f(value)),
            Patch::Unset => Patch::Unset,
        }
    }

    /// Overwrites `target` when set.
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Set(value) = self {
            *target = value;
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Set(value),
            None => Patch::Unset,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

/// `deserialize_with` helper for non-nullable fields: `null` means the same
/// as an absent field.
pub fn null_as_unset<'de, D, T>(deserializer: D) -> Result<Patch<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Patch::from)
}

pub const EXPAND_PERSON: &str = "person";
pub const EXPAND_AUTHORS: &str = "authors";
pub const EXPAND_TAGS: &str = "tags";
pub const EXPAND_PUBLISHER: &str = "publisher";

/// Which referenced entities to resolve and attach on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expand {
    pub person: bool,
    pub authors: bool,
    pub tags: bool,
    pub publisher: bool,
}

impl Expand {
    /// Parses a comma-separated `expand` value. Unknown tokens are ignored.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut expand = Expand::default();
        for token in raw.unwrap_or_default().split(',').map(str::trim) {
            match token {
                EXPAND_PERSON => expand.person = true,
                EXPAND_AUTHORS => expand.authors = true,
                EXPAND_TAGS => expand.tags = true,
                EXPAND_PUBLISHER => expand.publisher = true,
                _ => {}
            }
        }
        expand
    }

    pub fn all() -> Self {
        Self {
            person: true,
            authors: true,
            tags: true,
            publisher: true,
        }
    }

    pub fn any_book_relation(&self) -> bool {
        self.authors || self.tags || self.publisher
    }
}
