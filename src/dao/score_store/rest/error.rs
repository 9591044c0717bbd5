//! Error types shared by the PostgREST storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`RestDaoError`] failures.
pub type RestResult<T> = Result<T, RestDaoError>;

/// Failures that can occur while talking to the PostgREST gateway.
#[derive(Debug, Error)]
pub enum RestDaoError {
    /// Required environment variable is missing.
    #[error("missing REST store environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build REST store client")]
    ClientBuilder {
        /// Client builder failure.
        #[source]
        source: reqwest::Error,
    },
    /// A request to a table endpoint could not be sent.
    #[error("failed to send REST store request to `{path}`")]
    RequestSend {
        /// Table the request targeted.
        path: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The gateway returned an unexpected status code.
    #[error("unexpected REST store response status {status} for `{path}`")]
    RequestStatus {
        /// Table the request targeted.
        path: String,
        /// Status returned by the gateway.
        status: StatusCode,
    },
    /// Response payload could not be parsed into the expected rows.
    #[error("failed to decode REST store response for `{path}`")]
    DecodeResponse {
        /// Table the rows came from.
        path: String,
        /// Body decoding failure.
        #[source]
        source: reqwest::Error,
    },
    /// A timestamp column did not hold RFC 3339 text.
    #[error("invalid timestamp `{value}` in REST store row")]
    InvalidTimestamp {
        /// Offending column value.
        value: String,
        /// Parse failure.
        #[source]
        source: time::error::Parse,
    },
    /// A timestamp could not be rendered for a write.
    #[error("failed to format timestamp for REST store write")]
    FormatTimestamp {
        /// Formatting failure.
        #[source]
        source: time::error::Format,
    },
    /// The unique username constraint rejected a profile write.
    #[error("username `{username}` is already taken")]
    UsernameTaken {
        /// Requested name.
        username: String,
    },
}
