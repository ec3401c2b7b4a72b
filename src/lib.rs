pub mod account;
pub mod atm_engine;
pub mod config;
pub mod console;
pub mod credential;
pub mod error;
pub mod file_store;
pub mod security_log;
pub mod session;
pub mod store;
pub mod transaction;
pub mod transaction_log;

pub use account::Account;
pub use atm_engine::AtmEngine;
pub use config::Config;
pub use error::LedgerError;
pub use error::ValidationError;
pub use file_store::FileAccountStore;
pub use store::AccountStore;
pub use store::MemoryAccountStore;
