pub mod filename;
pub mod store;

pub use store::{SessionId, SessionStore, StoredFile};
