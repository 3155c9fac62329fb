pub mod connection;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;


pub use connection::{establish_connection, run_migrations, DatabasePool};
pub use memory::InMemoryRepository;
pub use models::CurrencyMetadata;
pub use postgres::PgRepository;
pub use repository::{PersistenceError, Repository};
