pub mod repository;
pub mod store;

pub use repository::InMemorySessionStore;
pub use store::SessionStore;
#[cfg(test)]
pub use store::MockSessionStore;
