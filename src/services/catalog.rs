//! Usecase for entities that are just a unique name: publishers, tags and genres.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::models::{Genre, Named, Publisher, Tag};
use crate::error::{Result, ResultExt};

#[async_trait]
pub trait NamedStorage<T>: Send + Sync {
    async fn add(&self, name: &str) -> Result<Uuid>;
    async fn get(&self, id: Uuid) -> Result<T>;
    async fn update(&self, id: Uuid, entity: &T) -> Result<()>;
    async fn remove(&self, id: Uuid) -> Result<()>;
    async fn list(&self) -> Result<Vec<T>>;
}

pub struct NamedService<T> {
    storage: Arc<dyn NamedStorage<T>>,
}

pub type PublishersService = NamedService<Publisher>;
pub type TagsService = NamedService<Tag>;
pub type GenresService = NamedService<Genre>;

impl<T> NamedService<T>
where
    T: Named + Send + Sync + 'static,
{
    pub fn new(storage: Arc<dyn NamedStorage<T>>) -> Self {
        Self { storage }
    }

    pub async fn add(&self, name: &str) -> Result<Uuid> {
        self.storage
            .add(name.trim())
            .await
            .with_context(|| format!("failed to add {} to storage", T::ENTITY))
    }

    pub async fn get(&self, id: Uuid) -> Result<T> {
        self.storage
            .get(id)
            .await
            .with_context(|| format!("failed to get {} from storage", T::ENTITY))
    }

    pub async fn update(&self, id: Uuid, name: &str) -> Result<()> {
        let mut entity = self.get(id).await?;
        entity.set_name(name.trim().to_string());
        self.storage
            .update(id, &entity)
            .await
            .with_context(|| format!("failed to update {} in storage", T::ENTITY))
    }

    pub async fn remove(&self, id: Uuid) -> Result<()> {
        self.storage
            .remove(id)
            .await
            .with_context(|| format!("failed to remove {} from storage", T::ENTITY))
    }

    pub async fn list(&self) -> Result<Vec<T>> {
        self.storage
            .list()
            .await
            .with_context(|| format!("failed to list {}s from storage", T::ENTITY))
    }
}
