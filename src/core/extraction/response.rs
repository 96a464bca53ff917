use serde::Serialize;

use super::error::ExtractionError;
use super::merge::{AggregatedResult, MissingCategory};
use super::resource::Payload;

/// 视图层响应
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResponse {
    pub status: bool,
    pub message: String,
    #[serde(rename = "imageData")]
    pub image_data: Option<Payload>,
    pub requested_type: String,
    pub data_keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<MissingCategory>,
}

pub fn format_response_for_view(result: AggregatedResult, requested_type: &str) -> ViewResponse {
    if result.is_empty() {
        return ViewResponse {
            status: false,
            message: format!("No data available for type: {}", requested_type),
            image_data: None,
            requested_type: requested_type.to_string(),
            data_keys: None,
            missing: result.missing,
        };
    }

    ViewResponse {
        status: true,
        message: format!("Thermal data extracted successfully ({})", requested_type),
        image_data: Some(result.image_data),
        requested_type: requested_type.to_string(),
        data_keys: Some(result.data_keys),
        missing: result.missing,
    }
}

pub fn format_error_response(err: &ExtractionError, requested_type: &str) -> ViewResponse {
    ViewResponse {
        status: false,
        message: format!("Failed to extract {} data: {}", requested_type, err),
        image_data: None,
        requested_type: requested_type.to_string(),
        data_keys: None,
        missing: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extraction::merge::{merge, OutcomeMap};
    use crate::core::extraction::outcome::ExtractionOutcome;
    use serde_json::json;

    #[test]
    fn test_success_response() {
        let mut payload = Payload::new();
        payload.insert("Statistics".into(), json!({ "Max": 40.0 }));
        let mut outcomes = OutcomeMap::new();
        outcomes.insert("statistics".into(), ExtractionOutcome::Success(payload));
        outcomes.insert("gas".into(), ExtractionOutcome::TimedOut);

        let response = format_response_for_view(merge(outcomes), "statistics,gas");
        assert!(response.status);
        assert_eq!(response.data_keys, Some(vec!["Statistics".to_string()]));
        assert_eq!(response.missing.len(), 1);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["imageData"]["Statistics"]["Max"], json!(40.0));
        assert_eq!(value["missing"][0]["reason"], json!("timed_out"));
    }

    #[test]
    fn test_empty_response() {
        let response = format_response_for_view(AggregatedResult::empty(), "gps");
        assert!(!response.status);
        assert!(response.image_data.is_none());
        assert!(response.message.contains("gps"));
    }

    #[test]
    fn test_error_response() {
        let err = ExtractionError::InvalidConfig("workers must be at least 1".into());
        let response = format_error_response(&err, "complete");
        assert!(!response.status);
        assert!(response.message.contains("workers must be at least 1"));
    }
}
