use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::models::Person;
use crate::error::{Result, ResultExt};
use crate::types::Patch;

#[async_trait]
pub trait PersonsStorage: Send + Sync {
    async fn add_person(&self, first_name: &str, last_name: &str, middle_name: &str) -> Result<Uuid>;
    async fn get_person(&self, id: Uuid) -> Result<Person>;
    async fn update_person(&self, id: Uuid, person: &Person) -> Result<()>;
    async fn remove_person(&self, id: Uuid) -> Result<()>;
    async fn list_persons(&self) -> Result<Vec<Person>>;
}

/// Name changes for a person. Blank values are treated as "no change"
/// because every name column is required.
#[derive(Debug, Clone, Default)]
pub struct PersonPatch {
    pub first_name: Patch<String>,
    pub last_name: Patch<String>,
    pub middle_name: Patch<String>,
}

pub struct PersonsService {
    storage: Arc<dyn PersonsStorage>,
}

impl PersonsService {
    pub fn new(storage: Arc<dyn PersonsStorage>) -> Self {
        Self { storage }
    }

    pub async fn add_person(&self, first_name: &str, last_name: &str, middle_name: &str) -> Result<Uuid> {
        self.storage
            .add_person(first_name.trim(), last_name.trim(), middle_name.trim())
            .await
            .context("failed to add person to storage")
    }

    pub async fn get_person(&self, id: Uuid) -> Result<Person> {
        self.storage
            .get_person(id)
            .await
            .context("failed to get person from storage")
    }

    pub async fn update_person(&self, id: Uuid, patch: PersonPatch) -> Result<()> {
        let mut person = self
            .storage
            .get_person(id)
            .await
            .context("failed to get person from storage")?;

        non_blank(patch.first_name).apply_to(&mut person.first_name);
        non_blank(patch.last_name).apply_to(&mut person.last_name);
        non_blank(patch.middle_name).apply_to(&mut person.middle_name);

        self.storage
            .update_person(id, &person)
            .await
            .context("failed to update person in storage")
    }

    pub async fn remove_person(&self, id: Uuid) -> Result<()> {
        self.storage
            .remove_person(id)
            .await
            .context("failed to remove person from storage")
    }

    pub async fn list_persons(&self) -> Result<Vec<Person>> {
        self.storage
            .list_persons()
            .await
            .context("failed to list persons from storage")
    }
}

fn non_blank(value: Patch<String>) -> Patch<String> {
    match value {
        Patch::Set(v) if !v.trim().is_empty() => Patch::Set(v.trim().to_string()),
        _ => Patch::Unset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PERSON_NOT_FOUND;
    use crate::testing::MemoryCatalog;

    fn service() -> PersonsService {
        PersonsService::new(Arc::new(MemoryCatalog::new()))
    }

    #[tokio::test]
    async fn update_keeps_omitted_and_blank_names() {
        let persons = service();
        let id = persons.add_person("Samuel", "Clemens", "Langhorne").await.unwrap();

        persons
            .update_person(
                id,
                PersonPatch {
                    first_name: Patch::Set("Sam".into()),
                    last_name: Patch::Set("   ".into()),
                    middle_name: Patch::Unset,
                },
            )
            .await
            .unwrap();

        let person = persons.get_person(id).await.unwrap();
        assert_eq!(person.first_name, "Sam");
        assert_eq!(person.last_name, "Clemens");
        assert_eq!(person.middle_name, "Langhorne");
    }

    #[tokio::test]
    async fn missing_person_is_not_found() {
        let persons = service();
        let err = persons.get_person(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is(&PERSON_NOT_FOUND));

        let err = persons.remove_person(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is(&PERSON_NOT_FOUND));
    }
}
