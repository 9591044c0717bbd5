//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name, counted in characters after trimming.
pub const USERNAME_MAX_CHARS: usize = 15;

/// Validates a display name: 1 to 15 characters once surrounding whitespace is
/// trimmed, and no control characters.
///
/// # Examples
///
/// ```ignore
/// validate_username("Neo")               // Ok
/// validate_username("   ")               // Err - empty after trim
/// validate_username("ThisNameIsWayTooLong") // Err - too long
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let trimmed = username.trim();
    let length = trimmed.chars().count();

    if length == 0 {
        let mut err = ValidationError::new("username_empty");
        err.message = Some("Username must not be empty".into());
        return Err(err);
    }

    if length > USERNAME_MAX_CHARS {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!("Username must be at most {USERNAME_MAX_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("username_format");
        err.message = Some("Username must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a card identifier sent by a client.
pub fn validate_card_id(card_id: &str) -> Result<(), ValidationError> {
    if card_id.is_empty() || card_id.len() > 32 {
        let mut err = ValidationError::new("card_id_length");
        err.message = Some("Card ID must be between 1 and 32 bytes".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_valid() {
        assert!(validate_username("Neo").is_ok());
        assert!(validate_username("  Trinity  ").is_ok());
        assert!(validate_username("Agent_Smith_007").is_ok()); // exactly 15
        assert!(validate_username("ÉlodieNéon").is_ok());
    }

    #[test]
    fn test_validate_username_invalid_length() {
        assert!(validate_username("").is_err());
        assert!(validate_username("    ").is_err());
        assert!(validate_username("Agent_Smith_0070").is_err()); // 16
    }

    #[test]
    fn test_validate_username_counts_characters_not_bytes() {
        assert!(validate_username(&"é".repeat(15)).is_ok()); // 30 bytes
        assert!(validate_username(&"é".repeat(16)).is_err());
    }

    #[test]
    fn test_validate_username_invalid_format() {
        assert!(validate_username("bad\nname").is_err());
    }

    #[test]
    fn test_validate_card_id() {
        assert!(validate_card_id("card-3-a").is_ok());
        assert!(validate_card_id("").is_err());
        assert!(validate_card_id(&"x".repeat(33)).is_err());
    }
}
