//! Form-level checks applied by the request layer before calling a repo.

use crate::error::{AppError, Result};
use crate::models::UserUpdate;

pub const CONTENT_MIN: usize = 3;
pub const CONTENT_MAX: usize = 100;

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.trim().chars().count();
    if len < min {
        return Err(AppError::ValidationError(format!(
            "{field} must contain at least {min} characters"
        )));
    }
    if len > max {
        return Err(AppError::ValidationError(format!(
            "{field} cannot be more than {max} characters long"
        )));
    }
    Ok(())
}

/// Thread and comment bodies.
pub fn validate_content(content: &str) -> Result<()> {
    check_len("content", content, CONTENT_MIN, CONTENT_MAX)
}

/// Onboarding / profile edit form.
pub fn validate_profile(update: &UserUpdate) -> Result<()> {
    check_len("name", &update.name, 3, 30)?;
    check_len("username", &update.username, 3, 30)?;
    if let Some(bio) = &update.bio {
        check_len("bio", bio, 10, 100)?;
    }
    if let Some(image) = &update.image {
        if !(image.starts_with("https://") || image.starts_with("http://")) {
            return Err(AppError::ValidationError("image must be an http(s) URL".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserUpdate {
        UserUpdate {
            user_id: "user_1".into(),
            name: "Ada Lovelace".into(),
            username: "ada".into(),
            bio: Some("Writes the first programs".into()),
            image: Some("https://img.example.com/ada.png".into()),
        }
    }

    #[test]
    fn content_bounds() {
        assert!(validate_content("Hi").is_err());
        assert!(validate_content("   Hi   ").is_err());
        assert!(validate_content("Hey").is_ok());
        assert!(validate_content(&"x".repeat(100)).is_ok());
        assert!(validate_content(&"x".repeat(101)).is_err());
    }

    #[test]
    fn content_counts_characters_not_bytes() {
        assert!(validate_content(&"é".repeat(100)).is_ok());
    }

    #[test]
    fn profile_rules() {
        assert!(validate_profile(&profile()).is_ok());

        let mut short_bio = profile();
        short_bio.bio = Some("short".into());
        assert!(validate_profile(&short_bio).is_err());

        let mut bad_image = profile();
        bad_image.image = Some("data:image/png;base64,AAAA".into());
        assert!(validate_profile(&bad_image).is_err());

        let mut no_optional = profile();
        no_optional.bio = None;
        no_optional.image = None;
        assert!(validate_profile(&no_optional).is_ok());
    }
}
