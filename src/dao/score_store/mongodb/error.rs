//! Error types of the MongoDB storage implementation.

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

/// Result alias of the MongoDB score store.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11_000;

/// Failures of the MongoDB score store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string did not parse.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Rejected URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver rejected the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// No ping succeeded while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings tried.
        attempts: u32,
        /// Last driver error.
        #[source]
        source: MongoError,
    },
    /// A periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created at startup.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection name.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading a score document failed.
    #[error("failed to load score `{id}`")]
    LoadScore {
        /// Score document id.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Writing a score document failed.
    #[error("failed to save score `{id}`")]
    SaveScore {
        /// Score document id.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The leaderboard query failed.
    #[error("failed to list scores for mode `{mode}`")]
    ListScores {
        /// Mode queried.
        mode: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading profiles failed.
    #[error("failed to load profile(s)")]
    LoadProfiles {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Writing a profile failed.
    #[error("failed to save profile `{user_id}`")]
    SaveProfile {
        /// Profile owner.
        user_id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The unique username index rejected a profile write.
    #[error("username `{username}` is already taken")]
    UsernameTaken {
        /// Requested name.
        username: String,
    },
}

/// Whether the driver error is a unique index violation.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY_CODE,
        // findAndModify reports index violations as command errors
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}
