//! Client construction for the MongoDB score store.

use std::time::Duration;

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::warn;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

/// Pings tried per connection; the storage supervisor retries on top of this.
const CONNECT_PINGS: u32 = 3;
const FIRST_PING_RETRY: Duration = Duration::from_millis(200);
const MAX_PING_RETRY: Duration = Duration::from_secs(2);

/// Pause after the `attempt`-th failed ping (1-based).
fn ping_backoff(attempt: u32) -> Duration {
    let doublings = attempt.saturating_sub(1).min(16);
    FIRST_PING_RETRY
        .saturating_mul(1 << doublings)
        .min(MAX_PING_RETRY)
}

/// Open the configured database once the server answers a ping.
pub async fn connect_database(config: &MongoConfig) -> MongoResult<Database> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut attempt = 1;
    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => return Ok(database),
            Err(source) if attempt >= CONNECT_PINGS => {
                return Err(MongoDaoError::InitialPing {
                    attempts: attempt,
                    source,
                });
            }
            Err(err) => {
                warn!(
                    attempt,
                    database = %config.database_name,
                    error = %err,
                    "MongoDB ping failed; retrying"
                );
                sleep(ping_backoff(attempt)).await;
                attempt += 1;
            }
        }
    }
}
