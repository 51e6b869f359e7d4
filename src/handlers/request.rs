//! Request decoding and field validation shared by every handler.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::InternalError;
use crate::types::{Expand, Patch};

pub const NAME_MAX_LEN: usize = 50;
pub const PERSON_NAME_MAX_LEN: usize = 100;
pub const PSEUDONYM_MAX_LEN: usize = 100;
pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 1000;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const MARK_MAX: i16 = 10;

pub fn parse_id(raw: &str, entity: &str) -> Result<Uuid, InternalError> {
    Uuid::parse_str(raw.trim()).map_err(|_| InternalError::bad_request(format!("invalid {entity} id")))
}

/// Field-level checks run after a body has been decoded.
pub trait Validate {
    fn validate(&self) -> Result<(), InternalError>;
}

fn field_error(field: &str, tag: &str) -> InternalError {
    InternalError::bad_request(format!(
        "failed to validate field '{field}', because of tag '{tag}'"
    ))
}

pub fn required(field: &str, value: &str) -> Result<(), InternalError> {
    if value.trim().is_empty() {
        return Err(field_error(field, "required"));
    }
    Ok(())
}

pub fn max_len(field: &str, value: &str, max: usize) -> Result<(), InternalError> {
    if value.chars().count() > max {
        return Err(field_error(field, &format!("max:{max}")));
    }
    Ok(())
}

pub fn min_len(field: &str, value: &str, min: usize) -> Result<(), InternalError> {
    if value.chars().count() < min {
        return Err(field_error(field, &format!("min:{min}")));
    }
    Ok(())
}

/// Checks a set patch value; unset fields always pass.
pub fn patch_max_len(field: &str, value: &Patch<String>, max: usize) -> Result<(), InternalError> {
    match value.as_set() {
        Some(value) => max_len(field, value, max),
        None => Ok(()),
    }
}

pub fn range(field: &str, value: i16, min: i16, max: i16) -> Result<(), InternalError> {
    if value < min {
        return Err(field_error(field, &format!("gte:{min}")));
    }
    if value > max {
        return Err(field_error(field, &format!("lte:{max}")));
    }
    Ok(())
}

pub fn non_negative(field: &str, value: f64) -> Result<(), InternalError> {
    if !value.is_finite() || value < 0.0 {
        return Err(field_error(field, "gte:0"));
    }
    Ok(())
}

/// Shape check only: one `@`, a non-empty local part and a dotted domain.
pub fn email(field: &str, value: &str) -> Result<(), InternalError> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
                && domain.contains('.')
                && domain.split('.').all(|label| !label.is_empty())
        }
        None => false,
    };
    if !valid {
        return Err(field_error(field, "email"));
    }
    Ok(())
}

/// JSON body extractor that also runs [`Validate`]. Decoding and validation
/// failures both answer 400 `{code, message}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = InternalError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                tracing::error!(err = %rejection.body_text(), "failed to decode the request");
                InternalError::bad_request(rejection.body_text())
            })?;
        value.validate().inspect_err(|err| {
            tracing::error!(err = %err, "failed to validate the request");
        })?;
        Ok(Self(value))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpandQuery {
    pub expand: Option<String>,
}

impl ExpandQuery {
    pub fn expand(&self) -> Expand {
        Expand::parse(self.expand.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBooksQuery {
    pub expand: Option<String>,
    pub author_id: Option<String>,
}

impl ListBooksQuery {
    pub fn expand(&self) -> Expand {
        Expand::parse(self.expand.as_deref())
    }

    /// Comma-separated author ids; blanks are skipped, duplicates collapsed.
    pub fn authors_ids(&self) -> Result<Vec<Uuid>, InternalError> {
        let mut ids = Vec::new();
        for part in self.author_id.as_deref().unwrap_or_default().split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let id = Uuid::parse_str(part).map_err(|_| InternalError::bad_request("invalid author_id"))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}
