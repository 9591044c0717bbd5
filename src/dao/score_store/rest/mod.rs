//! Relational backend reached through a PostgREST gateway (Supabase layout).

mod config;
mod error;
mod models;
mod store;

pub use config::RestConfig;
pub use error::RestDaoError;
pub use store::RestScoreStore;

use crate::dao::storage::StorageError;

impl From<RestDaoError> for StorageError {
    fn from(err: RestDaoError) -> Self {
        match err {
            RestDaoError::UsernameTaken { username } => {
                StorageError::conflict(format!("username `{username}` is already taken"))
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
