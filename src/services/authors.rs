use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::models::author::has_identity;
use crate::database::models::Author;
use crate::error::{Result, ResultExt, AUTHOR_INVALID_FIELDS, PERSON_NOT_FOUND};
use crate::services::persons::PersonsService;
use crate::types::Patch;

#[async_trait]
pub trait AuthorsStorage: Send + Sync {
    async fn add_author(&self, person_id: Option<Uuid>, pseudonym: &str) -> Result<Uuid>;
    async fn get_author(&self, id: Uuid) -> Result<Author>;
    async fn update_author(&self, id: Uuid, author: &Author) -> Result<()>;
    async fn remove_author(&self, id: Uuid) -> Result<()>;
    async fn list_authors(&self) -> Result<Vec<Author>>;
}

/// `person_id: Set(None)` unlinks the person, `pseudonym: Set("")` clears
/// the pseudonym; either is rejected if it leaves the author without an identity.
#[derive(Debug, Clone, Default)]
pub struct AuthorPatch {
    pub person_id: Patch<Option<Uuid>>,
    pub pseudonym: Patch<String>,
}

pub struct AuthorsService {
    storage: Arc<dyn AuthorsStorage>,
    persons: Arc<PersonsService>,
}

impl AuthorsService {
    pub fn new(storage: Arc<dyn AuthorsStorage>, persons: Arc<PersonsService>) -> Self {
        Self { storage, persons }
    }

    /// A person id that does not resolve is tolerated only when a usable
    /// pseudonym is given; the dangling link is then not stored.
    pub async fn add_author(&self, person_id: Option<Uuid>, pseudonym: &str) -> Result<Uuid> {
        let pseudonym = pseudonym.trim();

        let person_id = match person_id {
            Some(id) => match self.persons.get_person(id).await {
                Ok(_) => Some(id),
                Err(err) if err.is(&PERSON_NOT_FOUND) && !pseudonym.is_empty() => {
                    tracing::warn!(person_id = %id, "person not found, storing author by pseudonym only");
                    None
                }
                Err(err) if err.is(&PERSON_NOT_FOUND) => return Err(AUTHOR_INVALID_FIELDS.into()),
                Err(err) => return Err(err),
            },
            None => None,
        };

        if !has_identity(person_id, pseudonym) {
            return Err(AUTHOR_INVALID_FIELDS.into());
        }

        self.storage
            .add_author(person_id, pseudonym)
            .await
            .context("failed to add author to storage")
    }

    pub async fn get_author(&self, id: Uuid, expand_person: bool) -> Result<Author> {
        let mut author = self
            .storage
            .get_author(id)
            .await
            .context("failed to get author from storage")?;
        if expand_person {
            self.attach_person(&mut author).await?;
        }
        Ok(author)
    }

    pub async fn update_author(&self, id: Uuid, patch: AuthorPatch) -> Result<()> {
        let mut author = self
            .storage
            .get_author(id)
            .await
            .context("failed to get author from storage")?;

        if let Patch::Set(Some(person_id)) = patch.person_id {
            self.persons
                .get_person(person_id)
                .await
                .with_context(|| format!("failed to validate person {person_id}"))?;
        }

        patch.person_id.apply_to(&mut author.person_id);
        patch
            .pseudonym
            .map(|p| p.trim().to_string())
            .apply_to(&mut author.pseudonym);

        if !author.has_identity() {
            return Err(AUTHOR_INVALID_FIELDS.into());
        }

        self.storage
            .update_author(id, &author)
            .await
            .context("failed to update author in storage")
    }

    /// Book associations that point at the removed author are left in place.
    pub async fn remove_author(&self, id: Uuid) -> Result<()> {
        self.storage
            .remove_author(id)
            .await
            .context("failed to remove author from storage")
    }

    pub async fn list_authors(&self, expand_person: bool) -> Result<Vec<Author>> {
        let mut authors = self
            .storage
            .list_authors()
            .await
            .context("failed to list authors from storage")?;
        if expand_person {
            for author in authors.iter_mut() {
                self.attach_person(author).await?;
            }
        }
        Ok(authors)
    }

    async fn attach_person(&self, author: &mut Author) -> Result<()> {
        if let Some(person_id) = author.person_id {
            let person = self
                .persons
                .get_person(person_id)
                .await
                .with_context(|| format!("failed to expand person {person_id}"))?;
            author.person = Some(person);
        }
        Ok(())
    }
}
