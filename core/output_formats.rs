use crate::error::{AppError, Result};
use crate::rules::{Rule, parse_rule};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct DefaultIgnores {
    #[serde(default)]
    pub rules: Vec<String>,
}

static DEFAULT_IGNORES: Lazy<DefaultIgnores> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/default_ignores.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/default_ignores.yaml")
});

static DEFAULT_IGNORE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    DEFAULT_IGNORES
        .rules
        .iter()
        .map(|text| {
            parse_rule(text).unwrap_or_else(|e| {
                panic!("Invalid rule '{}' in embedded data/default_ignores.yaml: {}", text, e)
            })
        })
        .collect()
});

/// The default rule texts as written in the embedded data file.
pub fn get_default_ignore_patterns() -> &'static DefaultIgnores {
    &DEFAULT_IGNORES
}

pub fn get_default_ignore_rules() -> &'static [Rule] {
    &DEFAULT_IGNORE_RULES
}

pub fn serialize_to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, AppError> {
    if pretty {
        serde_json::to_string_pretty(value).map_err(AppError::JsonSerialize)
    } else {
        serde_json::to_string(value).map_err(AppError::JsonSerialize)
    }
}

pub fn serialize_to_yaml<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_yml::to_string(value).map_err(AppError::YamlError)
}
