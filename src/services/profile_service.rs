use std::time::SystemTime;

use tracing::info;

use crate::{
    dao::models::ProfileEntity,
    dto::profile::{ProfileResponse, UpsertProfileRequest},
    error::ServiceError,
    state::{SharedState, identity::PlayerIdentity},
};

/// Create or rename the caller's profile.
///
/// Registered players get a stored profile keeping its original creation
/// time. Guests get their name echoed back unsaved.
pub async fn save_profile(
    state: &SharedState,
    player: &PlayerIdentity,
    request: UpsertProfileRequest,
) -> Result<ProfileResponse, ServiceError> {
    let username = request.normalized_username().to_owned();

    match player {
        PlayerIdentity::Anonymous => Err(ServiceError::Unauthorized(
            "a player id is required to pick a username".into(),
        )),
        PlayerIdentity::Guest(user_id) => Ok(ProfileResponse::new(
            ProfileEntity {
                user_id: user_id.clone(),
                username,
                created_at: SystemTime::now(),
            },
            false,
        )),
        PlayerIdentity::Registered(user_id) => {
            let store = state.require_score_store().await?;
            let created_at = store
                .find_profile(user_id.clone())
                .await?
                .map(|existing| existing.created_at)
                .unwrap_or_else(SystemTime::now);

            let saved = store
                .save_profile(ProfileEntity {
                    user_id: user_id.clone(),
                    username,
                    created_at,
                })
                .await?;
            info!(user_id, username = %saved.username, "profile saved");
            Ok(ProfileResponse::new(saved, true))
        }
    }
}

/// Stored profile of the caller.
pub async fn my_profile(
    state: &SharedState,
    player: &PlayerIdentity,
) -> Result<ProfileResponse, ServiceError> {
    let Some(user_id) = player.persistence_key() else {
        return Err(ServiceError::NotFound(
            "guest and anonymous players have no stored profile".into(),
        ));
    };

    let store = state.require_score_store().await?;
    store
        .find_profile(user_id.to_owned())
        .await?
        .map(|profile| ProfileResponse::new(profile, true))
        .ok_or_else(|| ServiceError::NotFound(format!("no profile for `{user_id}`")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::score_store::MemoryScoreStore, state::AppState};

    async fn ready_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_score_store(Arc::new(MemoryScoreStore::new()))
            .await;
        state
    }

    fn request(username: &str) -> UpsertProfileRequest {
        UpsertProfileRequest {
            username: username.into(),
        }
    }

    #[tokio::test]
    async fn rename_keeps_creation_time() {
        let state = ready_state().await;
        let player = PlayerIdentity::Registered("u1".into());

        let first = save_profile(&state, &player, request(" Neo ")).await.unwrap();
        let renamed = save_profile(&state, &player, request("Trinity")).await.unwrap();

        assert_eq!(first.username, "Neo");
        assert_eq!(renamed.username, "Trinity");
        assert_eq!(first.created_at, renamed.created_at);
        assert!(renamed.persisted);
        assert_eq!(my_profile(&state, &player).await.unwrap().username, "Trinity");
    }

    #[tokio::test]
    async fn taken_usernames_conflict() {
        let state = ready_state().await;
        save_profile(&state, &PlayerIdentity::Registered("u1".into()), request("Neo"))
            .await
            .unwrap();

        let err = save_profile(&state, &PlayerIdentity::Registered("u2".into()), request("Neo"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn guests_are_echoed_without_storage() {
        let state = AppState::new(AppConfig::default());
        let guest = PlayerIdentity::Guest("guest-7".into());

        let profile = save_profile(&state, &guest, request("Morpheus")).await.unwrap();

        assert!(!profile.persisted);
        assert!(matches!(
            my_profile(&state, &guest).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn anonymous_callers_are_rejected() {
        let state = ready_state().await;
        assert!(matches!(
            save_profile(&state, &PlayerIdentity::Anonymous, request("Neo")).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
