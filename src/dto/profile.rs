use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::ProfileEntity,
    dto::{format_system_time, validation::validate_username},
};

/// Display name chosen by the caller.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertProfileRequest {
    /// 1 to 15 characters; surrounding whitespace is dropped.
    pub username: String,
}

impl UpsertProfileRequest {
    /// Name as it will be stored.
    pub fn normalized_username(&self) -> &str {
        self.username.trim()
    }
}

impl Validate for UpsertProfileRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_username(&self.username) {
            errors.add("username", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A player's profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: String,
    pub username: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// False for guests, whose name only lives on their device.
    pub persisted: bool,
}

impl ProfileResponse {
    /// View of a stored or guest-local profile.
    pub fn new(profile: ProfileEntity, persisted: bool) -> Self {
        Self {
            user_id: profile.user_id,
            username: profile.username,
            created_at: format_system_time(profile.created_at),
            persisted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_trimmed_and_validated() {
        let request = UpsertProfileRequest {
            username: "  Neo  ".into(),
        };
        assert!(request.validate().is_ok());
        assert_eq!(request.normalized_username(), "Neo");

        let too_long = UpsertProfileRequest {
            username: "x".repeat(16),
        };
        let errors = too_long.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }
}
