use std::str::FromStr;

use crate::backends::BackendType;
use crate::core::errors::ApiError;

pub fn parse_backend_type(raw: &str) -> Result<BackendType, ApiError> {
    BackendType::from_str(raw)
}

pub fn require_non_blank(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} cannot be empty", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend_type_accepts_aliases() {
        assert_eq!(parse_backend_type("light-rag").unwrap(), BackendType::LightRag);
        assert!(matches!(
            parse_backend_type("graphdb"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn require_non_blank_rejects_whitespace() {
        assert!(require_non_blank("source_id", "  ").is_err());
        assert!(require_non_blank("source_id", "a").is_ok());
    }
}
