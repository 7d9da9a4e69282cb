//! Chat session domain model.

pub mod message;
pub mod record;
pub mod repository;

pub use message::{Role, Turn};
pub use record::SessionRecord;
pub use repository::SessionStore;
