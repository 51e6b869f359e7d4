pub mod author;
pub mod book;
pub mod named;
pub mod person;
pub mod user;

pub use author::Author;
pub use book::Book;
pub use named::{Genre, Named, Publisher, Tag};
pub use person::Person;
pub use user::{Role, User};
