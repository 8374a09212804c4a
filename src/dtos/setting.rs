use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// `PUT /settings`：按键覆盖，未出现的键保持不变
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(custom(function = "validate_keys"))]
    pub values: BTreeMap<String, String>,
}

fn validate_keys(values: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::new("empty").with_message("No settings provided".into()));
    }
    let valid_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.';
    let bad_key = values
        .keys()
        .any(|k| k.is_empty() || k.len() > 100 || !k.chars().all(valid_char));
    if bad_key {
        return Err(ValidationError::new("key")
            .with_message("Setting keys must be 1-100 chars of [A-Za-z0-9_.]".into()));
    }
    Ok(())
}
