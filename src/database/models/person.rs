use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A real individual that authors may be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Person {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
}
