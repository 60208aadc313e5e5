//! Path existence check results
//!
//! When a path fails an existence check the reason matters: clients show
//! different text for a missing bucket, a missing object, and a permissions
//! problem, so the three are never folded together.

use serde::{Deserialize, Serialize};

/// Why an existence check came back negative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    ObjectNotFound,
    BucketNotFound,
    AccessDenied,
}

/// Outcome of validating a cloud path against the object store.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, utoipa::ToSchema)]
pub struct PathCheck {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<MissingReason>,
}

impl PathCheck {
    pub fn found() -> Self {
        PathCheck {
            exists: true,
            reason: None,
        }
    }

    pub fn missing(reason: MissingReason) -> Self {
        PathCheck {
            exists: false,
            reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasons_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&MissingReason::ObjectNotFound).unwrap(),
            "\"object_not_found\""
        );
        assert_eq!(
            serde_json::to_string(&MissingReason::BucketNotFound).unwrap(),
            "\"bucket_not_found\""
        );
        assert_eq!(
            serde_json::to_string(&MissingReason::AccessDenied).unwrap(),
            "\"access_denied\""
        );
    }

    #[test]
    fn test_found_check_omits_reason() {
        let json = serde_json::to_value(PathCheck::found()).unwrap();
        assert_eq!(json.get("exists"), Some(&serde_json::Value::Bool(true)));
        assert!(json.get("reason").is_none());
    }
}
