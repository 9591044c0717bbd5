use super::error::{RestDaoError, RestResult};

/// Runtime configuration describing how to reach the PostgREST gateway.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL; table endpoints live under `/rest/v1`.
    pub base_url: String,
    /// Key sent as `apikey` and bearer token.
    pub api_key: String,
}

impl RestConfig {
    /// Construct a configuration from an explicit project URL and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> RestResult<Self> {
        let base_url = std::env::var("SCORES_REST_URL").map_err(|_| RestDaoError::MissingEnvVar {
            var: "SCORES_REST_URL",
        })?;
        let api_key = std::env::var("SCORES_REST_KEY").map_err(|_| RestDaoError::MissingEnvVar {
            var: "SCORES_REST_KEY",
        })?;

        Ok(Self::new(base_url, api_key))
    }
}
