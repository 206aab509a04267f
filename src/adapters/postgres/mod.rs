//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresUserRepository` - plan state on the `users` table

mod user_repository;

pub use user_repository::PostgresUserRepository;
