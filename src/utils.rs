use serde::{Serialize, de::DeserializeOwned};

use crate::{error::CustomError, ledger::model::ErrorResponse};

pub fn des_from_str<T: DeserializeOwned>(string: &str) -> Result<T, CustomError> {
    serde_json::from_str(string)
        .map_err(|_| CustomError::Validation("Invalid request body".to_string()))
}

pub fn ser_to_str<T: Serialize>(t: &T) -> Result<String, CustomError> {
    serde_json::to_string(t).map_err(CustomError::Serialization)
}

/// `{"error": ...}` body for a failed request.
pub fn error_body(err: &CustomError) -> String {
    let response = ErrorResponse {
        error: err.public_message(),
    };
    ser_to_str(&response).unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::model::TransferRequest;

    #[test]
    fn error_body_carries_public_message_only() {
        assert_eq!(
            error_body(&CustomError::InsufficientBalance),
            r#"{"error":"Operation denied. Insufficient balance."}"#
        );
        assert_eq!(
            error_body(&CustomError::DBError(sqlx::Error::PoolClosed)),
            r#"{"error":"Internal server error"}"#
        );
    }

    #[test]
    fn des_from_str_rejects_garbage() {
        let parsed: Result<TransferRequest, _> = des_from_str("{");
        assert!(matches!(parsed, Err(CustomError::Validation(_))));
    }
}
