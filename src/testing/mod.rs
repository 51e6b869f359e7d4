//! Test doubles: an in-memory catalog that implements every storage trait,
//! and helpers to build tokens and application state around it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::AuthorizationConfig;
use crate::database::models::author::has_identity;
use crate::database::models::{Author, Book, Genre, Named, Person, Publisher, Role, Tag, User};
use crate::error::{
    Result, AUTHOR_INVALID_FIELDS, AUTHOR_NOT_FOUND, BOOK_INVALID_FIELDS, BOOK_NOT_FOUND, PERSON_NOT_FOUND,
    USER_ALREADY_EXISTS, USER_NOT_EXISTS, USER_NOT_FOUND,
};
use crate::services::{
    BooksStorage, CreateBookInput, ListBookParameters, NamedStorage, PersonsStorage, TokenProvider, TokenService,
    UpdateBookPatch, UsersStorage,
};
use crate::services::authors::AuthorsStorage;
use crate::router::{AppState, Storages};

pub const PRIMARY_KEY: &str = include_str!("keys/primary.key.pem");
pub const PRIMARY_PUB: &str = include_str!("keys/primary.pub.pem");

pub fn authorization_config() -> AuthorizationConfig {
    AuthorizationConfig {
        private_key: PRIMARY_KEY.to_string(),
        public_key: PRIMARY_PUB.to_string(),
        token_ttl_secs: 3600,
        password_hash_cost: 4,
    }
}

pub fn token_service() -> TokenService {
    TokenService::new(&authorization_config()).unwrap()
}

/// Issues `token-<uuid>` strings so tests can read the user id back.
pub struct FixedTokens;

impl FixedTokens {
    pub fn token_for(user_id: Uuid) -> String {
        format!("token-{user_id}")
    }

    pub fn user_from(token: &str) -> Option<Uuid> {
        token.strip_prefix("token-")?.parse().ok()
    }
}

impl TokenProvider for FixedTokens {
    fn generate_user_token(&self, user_id: Uuid) -> Result<String> {
        Ok(Self::token_for(user_id))
    }
}

#[derive(Default)]
pub struct Tables {
    persons: Vec<Person>,
    authors: Vec<Author>,
    publishers: Vec<Publisher>,
    tags: Vec<Tag>,
    genres: Vec<Genre>,
    books: Vec<Book>,
    users: Vec<User>,
    credentials: Vec<Credentials>,
    grants: Vec<(Uuid, Role)>,
}

struct Credentials {
    user_id: Uuid,
    email: String,
    pass_hash: String,
}

/// Lists keep insertion order. Foreign keys are not enforced, matching the
/// window between reference validation and the write.
#[derive(Default)]
pub struct MemoryCatalog {
    tables: Mutex<Tables>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn author_count(&self) -> usize {
        self.lock().authors.len()
    }

    pub fn book_count(&self) -> usize {
        self.lock().books.len()
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    /// Adds a credential-less user holding exactly `roles`.
    pub fn add_user_with_roles(&self, roles: &[Role]) -> Uuid {
        let mut tables = self.lock();
        let id = Uuid::new_v4();
        tables.users.push(User {
            id,
            email: None,
            created_at: Utc::now(),
        });
        tables.grants.extend(roles.iter().map(|role| (id, *role)));
        id
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

#[async_trait]
impl PersonsStorage for MemoryCatalog {
    async fn add_person(&self, first_name: &str, last_name: &str, middle_name: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.lock().persons.push(Person {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            middle_name: middle_name.to_string(),
        });
        Ok(id)
    }

    async fn get_person(&self, id: Uuid) -> Result<Person> {
        self.lock()
            .persons
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| PERSON_NOT_FOUND.into())
    }

    async fn update_person(&self, id: Uuid, person: &Person) -> Result<()> {
        let mut tables = self.lock();
        let stored = tables.persons.iter_mut().find(|p| p.id == id).ok_or(PERSON_NOT_FOUND)?;
        *stored = Person { id, ..person.clone() };
        Ok(())
    }

    async fn remove_person(&self, id: Uuid) -> Result<()> {
        let mut tables = self.lock();
        let before = tables.persons.len();
        tables.persons.retain(|p| p.id != id);
        if tables.persons.len() == before {
            return Err(PERSON_NOT_FOUND.into());
        }
        Ok(())
    }

    async fn list_persons(&self) -> Result<Vec<Person>> {
        Ok(self.lock().persons.clone())
    }
}

#[async_trait]
impl AuthorsStorage for MemoryCatalog {
    async fn add_author(&self, person_id: Option<Uuid>, pseudonym: &str) -> Result<Uuid> {
        if !has_identity(person_id, pseudonym) {
            return Err(AUTHOR_INVALID_FIELDS.into());
        }
        let id = Uuid::new_v4();
        self.lock().authors.push(Author {
            id,
            person_id,
            pseudonym: pseudonym.to_string(),
            person: None,
        });
        Ok(id)
    }

    async fn get_author(&self, id: Uuid) -> Result<Author> {
        self.lock()
            .authors
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| AUTHOR_NOT_FOUND.into())
    }

    async fn update_author(&self, id: Uuid, author: &Author) -> Result<()> {
        if !author.has_identity() {
            return Err(AUTHOR_INVALID_FIELDS.into());
        }
        let mut tables = self.lock();
        let stored = tables.authors.iter_mut().find(|a| a.id == id).ok_or(AUTHOR_NOT_FOUND)?;
        stored.person_id = author.person_id;
        stored.pseudonym = author.pseudonym.clone();
        Ok(())
    }

    async fn remove_author(&self, id: Uuid) -> Result<()> {
        let mut tables = self.lock();
        let before = tables.authors.len();
        tables.authors.retain(|a| a.id != id);
        if tables.authors.len() == before {
            return Err(AUTHOR_NOT_FOUND.into());
        }
        Ok(())
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        Ok(self.lock().authors.clone())
    }
}

/// Maps a named entity type to its in-memory table.
pub trait MemoryTable: Named + Clone + Send + Sync + 'static {
    fn rows(tables: &mut Tables) -> &mut Vec<Self>;
}

impl MemoryTable for Publisher {
    fn rows(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.publishers
    }
}

impl MemoryTable for Tag {
    fn rows(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.tags
    }
}

impl MemoryTable for Genre {
    fn rows(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.genres
    }
}

#[async_trait]
impl<T: MemoryTable> NamedStorage<T> for MemoryCatalog {
    async fn add(&self, name: &str) -> Result<Uuid> {
        let mut tables = self.lock();
        let rows = T::rows(&mut tables);
        if rows.iter().any(|r| r.name() == name) {
            return Err(T::ALREADY_EXISTS.into());
        }
        let id = Uuid::new_v4();
        rows.push(T::new(id, name.to_string()));
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<T> {
        let mut tables = self.lock();
        T::rows(&mut tables)
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| T::NOT_FOUND.into())
    }

    async fn update(&self, id: Uuid, entity: &T) -> Result<()> {
        let mut tables = self.lock();
        let rows = T::rows(&mut tables);
        if rows.iter().any(|r| r.id() != id && r.name() == entity.name()) {
            return Err(T::ALREADY_EXISTS.into());
        }
        let stored = rows.iter_mut().find(|r| r.id() == id).ok_or(T::NOT_FOUND)?;
        stored.set_name(entity.name().to_string());
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        let mut tables = self.lock();
        let rows = T::rows(&mut tables);
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        if rows.len() == before {
            return Err(T::NOT_FOUND.into());
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<T>> {
        let mut tables = self.lock();
        Ok(T::rows(&mut tables).clone())
    }
}

#[async_trait]
impl BooksStorage for MemoryCatalog {
    async fn add_book(&self, input: &CreateBookInput) -> Result<Uuid> {
        if input.title.trim().is_empty() {
            return Err(BOOK_INVALID_FIELDS.into());
        }
        let id = Uuid::new_v4();
        self.lock().books.push(Book {
            id,
            publisher_id: input.publisher_id,
            published_at: input.published_at,
            title: input.title.clone(),
            description: input.description.clone(),
            price: input.price,
            mark: input.mark,
            authors_ids: dedup(&input.authors_ids),
            tags_ids: dedup(&input.tags_ids),
            publisher: None,
            authors: None,
            tags: None,
        });
        Ok(id)
    }

    async fn get_book(&self, id: Uuid) -> Result<Book> {
        self.lock()
            .books
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| BOOK_NOT_FOUND.into())
    }

    async fn update_book(&self, id: Uuid, patch: &UpdateBookPatch) -> Result<()> {
        if matches!(patch.title.as_set(), Some(t) if t.trim().is_empty()) {
            return Err(BOOK_INVALID_FIELDS.into());
        }
        let mut tables = self.lock();
        let book = tables.books.iter_mut().find(|b| b.id == id).ok_or(BOOK_NOT_FOUND)?;

        patch.title.clone().apply_to(&mut book.title);
        patch.publisher_id.clone().apply_to(&mut book.publisher_id);
        patch.published_at.clone().apply_to(&mut book.published_at);
        patch.description.clone().apply_to(&mut book.description);
        patch.price.clone().apply_to(&mut book.price);
        patch.mark.clone().apply_to(&mut book.mark);
        if let Some(ids) = patch.authors_ids.as_set() {
            book.authors_ids = dedup(ids);
        }
        if let Some(ids) = patch.tags_ids.as_set() {
            book.tags_ids = dedup(ids);
        }
        Ok(())
    }

    async fn remove_book(&self, id: Uuid) -> Result<()> {
        let mut tables = self.lock();
        let before = tables.books.len();
        tables.books.retain(|b| b.id != id);
        if tables.books.len() == before {
            return Err(BOOK_NOT_FOUND.into());
        }
        Ok(())
    }

    async fn list_books(&self, params: &ListBookParameters) -> Result<Vec<Book>> {
        Ok(self
            .lock()
            .books
            .iter()
            .filter(|b| params.authors_ids.iter().all(|a| b.authors_ids.contains(a)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UsersStorage for MemoryCatalog {
    async fn create_user_by_email(&self, email: &str, pass_hash: &str) -> Result<Uuid> {
        let mut tables = self.lock();
        if tables.credentials.iter().any(|c| c.email == email) {
            return Err(USER_ALREADY_EXISTS.into());
        }
        let id = Uuid::new_v4();
        tables.users.push(User {
            id,
            email: Some(email.to_string()),
            created_at: Utc::now(),
        });
        tables.credentials.push(Credentials {
            user_id: id,
            email: email.to_string(),
            pass_hash: pass_hash.to_string(),
        });
        tables.grants.push((id, Role::User));
        Ok(id)
    }

    async fn get_id_and_pass_hash(&self, email: &str) -> Result<(Uuid, String)> {
        self.lock()
            .credentials
            .iter()
            .find(|c| c.email == email)
            .map(|c| (c.user_id, c.pass_hash.clone()))
            .ok_or_else(|| USER_NOT_EXISTS.into())
    }

    async fn create_anonymous_user(&self) -> Result<Uuid> {
        Ok(self.add_user_with_roles(&[]))
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<User> {
        self.lock()
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| USER_NOT_FOUND.into())
    }

    async fn get_user_roles_by_id(&self, id: Uuid) -> Result<Vec<Role>> {
        Ok(self
            .lock()
            .grants
            .iter()
            .filter(|(user_id, _)| *user_id == id)
            .map(|(_, role)| *role)
            .collect())
    }
}

/// Pool that never connects; lets router tests run without Postgres.
pub fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://bookshelf@127.0.0.1:1/bookshelf")
        .unwrap()
}

/// Services wired to one shared in-memory catalog and the test key pair.
pub fn app_state() -> (Arc<MemoryCatalog>, AppState) {
    let catalog = Arc::new(MemoryCatalog::new());
    let state = AppState::new(
        Storages::shared(catalog.clone()),
        Arc::new(token_service()),
        unreachable_pool(),
        4,
    );
    (catalog, state)
}
