pub mod authors;
pub mod books;
pub mod catalog;
pub mod persons;
pub mod token;
pub mod users;

pub use authors::{AuthorPatch, AuthorsService, AuthorsStorage};
pub use books::{BooksService, BooksStorage, CreateBookInput, ListBookParameters, UpdateBookPatch};
pub use catalog::{GenresService, NamedService, NamedStorage, PublishersService, TagsService};
pub use persons::{PersonPatch, PersonsService, PersonsStorage};
pub use token::{TokenProvider, TokenService};
pub use users::{UsersService, UsersStorage};
