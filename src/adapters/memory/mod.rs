//! In-memory adapters for tests and local runs.

mod user_repository;

pub use user_repository::InMemoryUserRepository;
