//! HTTP handlers, one module per resource. Handlers decode and validate the
//! request, call a service and map the result onto the wire.

pub mod authors;
pub mod books;
pub mod catalog;
pub mod health;
pub mod persons;
pub mod request;
pub mod users;
