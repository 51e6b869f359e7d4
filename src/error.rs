// Error taxonomy shared by storages, services and handlers
use std::borrow::Cow;
use std::fmt;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Domain error carrying an HTTP-style status code and a client-safe message.
///
/// Every kind the core can report is one of the constants below; comparisons
/// are done by value, so wrapping with context never changes the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalError {
    code: u16,
    message: Cow<'static, str>,
}

impl InternalError {
    pub const fn new(code: u16, message: &'static str) -> Self {
        Self {
            code,
            message: Cow::Borrowed(message),
        }
    }

    pub fn with_message(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Cow::Owned(message.into()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(400, message)
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for InternalError {}

pub const PERSON_NOT_FOUND: InternalError = InternalError::new(404, "person not found");
pub const PERSON_ALREADY_EXISTS: InternalError = InternalError::new(409, "person already exists");

pub const AUTHOR_INVALID_FIELDS: InternalError =
    InternalError::new(400, "author must have person or pseudonym");
pub const AUTHOR_ALREADY_EXISTS: InternalError = InternalError::new(409, "author already exists");
pub const AUTHOR_NOT_FOUND: InternalError = InternalError::new(404, "author not found");

pub const PUBLISHER_ALREADY_EXISTS: InternalError =
    InternalError::new(409, "publisher already exists");
pub const PUBLISHER_NOT_FOUND: InternalError = InternalError::new(404, "publisher not found");

pub const TAG_ALREADY_EXISTS: InternalError = InternalError::new(409, "tag already exists");
pub const TAG_NOT_FOUND: InternalError = InternalError::new(404, "tag not found");

pub const GENRE_ALREADY_EXISTS: InternalError = InternalError::new(409, "genre already exists");
pub const GENRE_NOT_FOUND: InternalError = InternalError::new(404, "genre not found");

pub const BOOK_ALREADY_EXISTS: InternalError = InternalError::new(409, "book already exists");
pub const BOOK_NOT_FOUND: InternalError = InternalError::new(404, "book not found");
pub const BOOK_INVALID_FIELDS: InternalError = InternalError::new(400, "book invalid fields");

pub const USER_NOT_FOUND: InternalError = InternalError::new(404, "user not found");
pub const USER_NOT_EXISTS: InternalError = InternalError::new(401, "user with this email does not exist");
pub const USER_ALREADY_EXISTS: InternalError = InternalError::new(409, "user already exists");
pub const USER_ROLE_HAS_NO_ACCESS: InternalError =
    InternalError::new(403, "user role has no access");

pub const PASSWORD_TOO_SHORT: InternalError =
    InternalError::new(400, "password must be at least 8 characters long");
pub const PASSWORD_NO_UPPER_CASE: InternalError =
    InternalError::new(400, "password must contain an uppercase letter");
pub const PASSWORD_NO_LOWER_CASE: InternalError =
    InternalError::new(400, "password must contain a lowercase letter");
pub const PASSWORD_NO_NUMBER: InternalError =
    InternalError::new(400, "password must contain a number");
pub const PASSWORD_NO_LETTER: InternalError =
    InternalError::new(400, "password must contain a letter");
pub const PASSWORD_NOT_CORRECT: InternalError = InternalError::new(401, "password is not correct");

pub const TOKEN_NOT_FOUND: InternalError = InternalError::new(401, "token not found");
pub const TOKEN_SIGNATURE_INVALID: InternalError =
    InternalError::new(401, "token signature is invalid");
pub const TOKEN_EXPIRED: InternalError = InternalError::new(401, "token expired");
pub const TOKEN_VERIFICATION: InternalError = InternalError::new(401, "token verification failed");
pub const TOKEN_DECRYPTION: InternalError = InternalError::new(401, "token decryption failed");
pub const TOKEN_PARSE_CLAIMS: InternalError = InternalError::new(401, "failed to parse token claims");

pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Crate-wide error. Storage and service code returns this and wraps it with
/// operation context on the way up.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Internal(InternalError),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Error::Internal(err)
    }
}

impl Error {
    /// The domain error at the bottom of the context chain, if there is one.
    pub fn internal(&self) -> Option<&InternalError> {
        match self {
            Error::Internal(err) => Some(err),
            Error::Context { source, .. } => source.internal(),
            _ => None,
        }
    }

    pub fn is(&self, kind: &InternalError) -> bool {
        self.internal() == Some(kind)
    }

    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Annotates a failing result with the operation that produced it.
pub trait ResultExt<T> {
    fn context(self, context: &'static str) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.into().context(f()))
    }
}

pub fn error_body(code: u16, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "code": code, "message": message })))
}

impl IntoResponse for InternalError {
    fn into_response(self) -> axum::response::Response {
        error_body(self.code, &self.message).into_response()
    }
}

// Only recognised domain errors reach the client; everything else is logged
// and collapsed into a generic 500.
impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match self.internal() {
            Some(err) => error_body(err.code, &err.message).into_response(),
            None => {
                tracing::error!(err = %self, "unhandled error");
                error_body(500, INTERNAL_ERROR_MESSAGE).into_response()
            }
        }
    }
}
