use crate::assertion::Precondition;
use crate::types::{ComponentConfig, TestStep};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_config(json: &str) -> Result<ComponentConfig, ParseError> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_preconditions(json: &str) -> Result<Vec<Precondition>, ParseError> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_test_case(json: &str) -> Result<Vec<TestStep>, ParseError> {
    Ok(serde_json::from_str(json)?)
}
