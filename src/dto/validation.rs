//! Validation helpers for command payloads.

use validator::ValidationError;

use crate::dao::models::Region;

/// Validates that a riot name is 1 to 16 visible characters.
pub fn validate_riot_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 16 {
        let mut err = ValidationError::new("riot_name");
        err.message = Some("riot name must be 1 to 16 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a tag line is 3 to 5 alphanumeric characters.
pub fn validate_riot_tag(tag: &str) -> Result<(), ValidationError> {
    if !(3..=5).contains(&tag.chars().count()) {
        let mut err = ValidationError::new("riot_tag_length");
        err.message = Some(format!("tag must be 3 to 5 characters (got {})", tag.len()).into());
        return Err(err);
    }

    if !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("riot_tag_format");
        err.message = Some("tag must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a region code is one of the supported shards.
pub fn validate_region(region: &str) -> Result<(), ValidationError> {
    region.parse::<Region>().map(|_| ()).map_err(|parse_err| {
        let mut err = ValidationError::new("region");
        err.message = Some(parse_err.to_string().into());
        err
    })
}
