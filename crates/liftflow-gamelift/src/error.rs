//! GameLift provider error types

use liftflow_cloud::CloudError;
use thiserror::Error;

/// Error code returned for malformed or currently-impossible requests
pub const INVALID_REQUEST: &str = "InvalidRequestException";

/// Error code returned when the addressed resource does not exist
pub const NOT_FOUND: &str = "NotFoundException";

#[derive(Error, Debug)]
pub enum GameLiftError {
    #[error("{operation} failed: {code}: {message}")]
    Api {
        operation: String,
        code: String,
        message: String,
    },

    #[error("GameLift fleet not found: {0}")]
    FleetNotFound(String),

    #[error("GameLift scaling policy not found: {0}")]
    ScalingPolicyNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unexpected response from {0}")]
    UnexpectedResponse(String),

    #[error("Cloud error: {0}")]
    Cloud(#[from] CloudError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GameLiftError {
    pub fn api(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        GameLiftError::Api {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Remote error code, if this came from the API
    pub fn code(&self) -> Option<&str> {
        match self {
            GameLiftError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_code(&self, expected: &str) -> bool {
        self.code() == Some(expected)
    }

    /// True when the API returned `code` and the message contains `needle`
    pub fn message_contains(&self, expected: &str, needle: &str) -> bool {
        match self {
            GameLiftError::Api { code, message, .. } => code == expected && message.contains(needle),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GameLiftError::FleetNotFound(_) | GameLiftError::ScalingPolicyNotFound(_)
        ) || self.is_code(NOT_FOUND)
            || matches!(self, GameLiftError::Cloud(CloudError::ResourceNotFound(_)))
    }
}

impl From<GameLiftError> for CloudError {
    fn from(err: GameLiftError) -> Self {
        match err {
            GameLiftError::Cloud(inner) => inner,
            GameLiftError::FleetNotFound(id) | GameLiftError::ScalingPolicyNotFound(id) => {
                CloudError::ResourceNotFound(id)
            }
            GameLiftError::InvalidConfig(msg) => CloudError::InvalidConfig(msg),
            GameLiftError::Json(e) => CloudError::Json(e),
            other => CloudError::ApiError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GameLiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_contains() {
        let err = GameLiftError::api(
            "CreateFleet",
            INVALID_REQUEST,
            "GameLift is not authorized to perform: iam:PassRole",
        );
        assert!(err.message_contains(INVALID_REQUEST, "GameLift is not authorized to perform"));
        assert!(!err.message_contains(NOT_FOUND, "GameLift is not authorized to perform"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_variants() {
        assert!(GameLiftError::api("DeleteFleet", NOT_FOUND, "gone").is_not_found());
        assert!(GameLiftError::FleetNotFound("fleet-1".to_string()).is_not_found());
        assert!(!GameLiftError::InvalidConfig("x".to_string()).is_not_found());
    }

    #[test]
    fn test_into_cloud_error() {
        let cloud: CloudError = GameLiftError::FleetNotFound("fleet-1".to_string()).into();
        assert!(matches!(cloud, CloudError::ResourceNotFound(id) if id == "fleet-1"));

        let cloud: CloudError =
            GameLiftError::Cloud(CloudError::Timeout {
                resource: "fleet-1".to_string(),
                last_status: "ACTIVATING".to_string(),
            })
            .into();
        assert!(cloud.is_timeout());

        let cloud: CloudError = GameLiftError::api("ListFleets", "ThrottlingException", "slow down").into();
        assert!(matches!(cloud, CloudError::ApiError(msg) if msg.contains("ThrottlingException")));
    }
}
