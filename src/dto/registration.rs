use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::RegistrationEntity,
    dto::{
        format_system_time,
        validation::{validate_region, validate_riot_name, validate_riot_tag},
    },
};

/// Payload registering a Riot account for tracking in one guild.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Riot account name (the part before the `#`).
    pub riot_name: String,
    /// Riot tag line (the part after the `#`).
    pub riot_tag: String,
    /// Shard to query: na, eu, ap, or kr. Defaults to na.
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "na".into()
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_riot_name(&self.riot_name) {
            errors.add("riot_name", e);
        }
        if let Err(e) = validate_riot_tag(&self.riot_tag) {
            errors.add("riot_tag", e);
        }
        if let Err(e) = validate_region(&self.region) {
            errors.add("region", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Summary returned once a registration is accepted.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationSummary {
    /// Registered riot name.
    pub riot_name: String,
    /// Registered tag line.
    pub riot_tag: String,
    /// Shard the account is queried on.
    pub region: String,
    /// RFC 3339 creation timestamp.
    pub registered_at: String,
}

impl From<RegistrationEntity> for RegistrationSummary {
    fn from(entity: RegistrationEntity) -> Self {
        Self {
            riot_name: entity.riot_name,
            riot_tag: entity.riot_tag,
            region: entity.region.to_string(),
            registered_at: format_system_time(entity.registered_at),
        }
    }
}
