use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RouterConfig;
use crate::database::models::{Genre, Publisher, Role, Tag};
use crate::database::postgres::{AuthorsPg, BooksPg, NamedRepository, PersonsPg, UsersPg};
use crate::handlers::{authors, books, catalog, health, persons, users};
use crate::middleware::{handle_panic, log_request_edges, require_any_role, require_auth, RoleGate};
use crate::services::{
    AuthorsService, AuthorsStorage, BooksService, BooksStorage, GenresService, NamedStorage, PersonsService,
    PersonsStorage, PublishersService, TagsService, TokenProvider, TokenService, UsersService, UsersStorage,
};

const READ_ROLES: &[Role] = &[Role::User, Role::Admin];
const WRITE_ROLES: &[Role] = &[Role::Admin];

/// Storage backends behind every service.
pub struct Storages {
    pub persons: Arc<dyn PersonsStorage>,
    pub authors: Arc<dyn AuthorsStorage>,
    pub publishers: Arc<dyn NamedStorage<Publisher>>,
    pub tags: Arc<dyn NamedStorage<Tag>>,
    pub genres: Arc<dyn NamedStorage<Genre>>,
    pub books: Arc<dyn BooksStorage>,
    pub users: Arc<dyn UsersStorage>,
}

impl Storages {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            persons: Arc::new(PersonsPg::new(pool.clone())),
            authors: Arc::new(AuthorsPg::new(pool.clone())),
            publishers: Arc::new(NamedRepository::<Publisher>::new(pool.clone())),
            tags: Arc::new(NamedRepository::<Tag>::new(pool.clone())),
            genres: Arc::new(NamedRepository::<Genre>::new(pool.clone())),
            books: Arc::new(BooksPg::new(pool.clone())),
            users: Arc::new(UsersPg::new(pool)),
        }
    }

    /// One value serving every storage trait, e.g. an in-memory catalog.
    pub fn shared<S>(storage: Arc<S>) -> Self
    where
        S: PersonsStorage
            + AuthorsStorage
            + NamedStorage<Publisher>
            + NamedStorage<Tag>
            + NamedStorage<Genre>
            + BooksStorage
            + UsersStorage
            + 'static,
    {
        Self {
            persons: storage.clone(),
            authors: storage.clone(),
            publishers: storage.clone(),
            tags: storage.clone(),
            genres: storage.clone(),
            books: storage.clone(),
            users: storage,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub persons: Arc<PersonsService>,
    pub authors: Arc<AuthorsService>,
    pub publishers: Arc<PublishersService>,
    pub tags: Arc<TagsService>,
    pub genres: Arc<GenresService>,
    pub books: Arc<BooksService>,
    pub users: Arc<UsersService>,
    pub tokens: Arc<TokenService>,
    pub pool: PgPool,
}

impl AppState {
    pub fn new(storages: Storages, tokens: Arc<TokenService>, pool: PgPool, password_hash_cost: u32) -> Self {
        let persons = Arc::new(PersonsService::new(storages.persons));
        let authors = Arc::new(AuthorsService::new(storages.authors, persons.clone()));
        let publishers = Arc::new(PublishersService::new(storages.publishers));
        let tags = Arc::new(TagsService::new(storages.tags));
        let genres = Arc::new(GenresService::new(storages.genres));
        let books = Arc::new(BooksService::new(
            storages.books,
            authors.clone(),
            publishers.clone(),
            tags.clone(),
        ));
        let provider: Arc<dyn TokenProvider> = tokens.clone();
        let users = Arc::new(UsersService::new(storages.users, provider).with_hash_cost(password_hash_cost));

        Self {
            persons,
            authors,
            publishers,
            tags,
            genres,
            books,
            users,
            tokens,
            pool,
        }
    }
}

pub fn router(state: AppState, config: &RouterConfig) -> Router {
    let public = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/user", get(users::get_user_info))
        .route("/user/register/email", post(users::register_by_email))
        .route("/user/token/email", post(users::token_by_email))
        .route("/user/anonymous", post(users::create_anonymous));

    let reads = Router::new()
        .route("/persons", get(persons::list_persons))
        .route("/persons/:id", get(persons::get_person))
        .route("/authors", get(authors::list_authors))
        .route("/authors/:id", get(authors::get_author))
        .route("/publishers", get(catalog::list::<Publisher>))
        .route("/publishers/:id", get(catalog::get::<Publisher>))
        .route("/tags", get(catalog::list::<Tag>))
        .route("/tags/:id", get(catalog::get::<Tag>))
        .route("/genres", get(catalog::list::<Genre>))
        .route("/genres/:id", get(catalog::get::<Genre>))
        .route("/books", get(books::list_books))
        .route("/books/:id", get(books::get_book))
        .route_layer(from_fn_with_state(
            RoleGate::new(state.users.clone(), READ_ROLES),
            require_any_role,
        ));

    let writes = Router::new()
        .route("/persons", post(persons::add_person))
        .route(
            "/persons/:id",
            axum::routing::put(persons::update_person).delete(persons::remove_person),
        )
        .route("/authors", post(authors::add_author))
        .route(
            "/authors/:id",
            axum::routing::put(authors::update_author).delete(authors::remove_author),
        )
        .route("/publishers", post(catalog::add::<Publisher>))
        .route(
            "/publishers/:id",
            axum::routing::put(catalog::update::<Publisher>).delete(catalog::remove::<Publisher>),
        )
        .route("/tags", post(catalog::add::<Tag>))
        .route(
            "/tags/:id",
            axum::routing::put(catalog::update::<Tag>).delete(catalog::remove::<Tag>),
        )
        .route("/genres", post(catalog::add::<Genre>))
        .route(
            "/genres/:id",
            axum::routing::put(catalog::update::<Genre>).delete(catalog::remove::<Genre>),
        )
        .route("/books", post(books::add_book))
        .route(
            "/books/:id",
            axum::routing::put(books::update_book).delete(books::remove_book),
        )
        .route_layer(from_fn_with_state(
            RoleGate::new(state.users.clone(), WRITE_ROLES),
            require_any_role,
        ));

    let private = reads
        .merge(writes)
        .route_layer(from_fn_with_state(state.tokens.clone(), require_auth));

    // Last layer added runs first.
    Router::new()
        .merge(public)
        .merge(private)
        .layer(CorsLayer::permissive())
        .layer(from_fn(log_request_edges))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.api_timeout()))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}
