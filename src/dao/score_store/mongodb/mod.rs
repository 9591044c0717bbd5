mod config;
mod connection;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoScoreStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::UsernameTaken { username } => {
                StorageError::conflict(format!("username `{username}` is already taken"))
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
