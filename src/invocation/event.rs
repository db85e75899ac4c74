//! Inbound event parsing.
//!
//! Two shapes are accepted:
//! - an alarm envelope: `{"Records": [{"EventSource": "aws:sns", "Sns": {"Message": "<json>"}}]}`
//! - a direct call: `{"failure_type": "...", "context": {...}}`

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::error::RecoveryError;
use crate::recovery::FailureType;

const ALARM_EVENT_SOURCE: &str = "aws:sns";

/// What to recover and with which context.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub failure_type: FailureType,
    pub context: Value,
}

/// Failure type implied by an alarm name.
pub fn failure_type_for_alarm(alarm_name: &str) -> FailureType {
    if alarm_name.contains("pipeline-failure-rate") {
        FailureType::PipelineFailure
    } else if alarm_name.contains("performance-regression") || alarm_name.contains("duration-high") {
        FailureType::PerformanceRegression
    } else {
        FailureType::Unknown("unknown".to_string())
    }
}

/// Parse an invocation event. `now` stamps alarm-triggered contexts.
pub fn parse_event(event: &Value, now: DateTime<Utc>) -> Result<InvocationRequest, RecoveryError> {
    let object = event
        .as_object()
        .ok_or_else(|| RecoveryError::InvalidEvent("event must be a JSON object".to_string()))?;

    match object.get("Records").or_else(|| object.get("records")) {
        Some(records) => parse_alarm_records(records, now),
        None => parse_direct_call(object),
    }
}

fn parse_alarm_records(records: &Value, now: DateTime<Utc>) -> Result<InvocationRequest, RecoveryError> {
    let records = records
        .as_array()
        .ok_or_else(|| RecoveryError::InvalidEvent("records must be an array".to_string()))?;

    let mut request = None;
    // The last alarm record wins.
    for record in records {
        if record.get("EventSource").and_then(Value::as_str) != Some(ALARM_EVENT_SOURCE) {
            continue;
        }

        let raw = record
            .pointer("/Sns/Message")
            .and_then(Value::as_str)
            .ok_or_else(|| RecoveryError::InvalidEvent("alarm record has no message".to_string()))?;
        let message: Value = serde_json::from_str(raw)
            .map_err(|e| RecoveryError::InvalidEvent(format!("alarm message is not JSON: {}", e)))?;
        let alarm_name = message
            .get("AlarmName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        tracing::debug!(alarm = %alarm_name, "Parsed alarm notification");
        request = Some(InvocationRequest {
            failure_type: failure_type_for_alarm(&alarm_name),
            context: json!({
                "alarm_name": alarm_name,
                "alarm_data": message,
                "trigger_time": now.to_rfc3339(),
            }),
        });
    }

    request.ok_or_else(|| RecoveryError::InvalidEvent("no alarm notification in records".to_string()))
}

fn parse_direct_call(object: &Map<String, Value>) -> Result<InvocationRequest, RecoveryError> {
    let failure_type = match object.get("failure_type") {
        None | Some(Value::Null) => FailureType::ManualRecovery,
        Some(Value::String(name)) => FailureType::parse(name),
        Some(_) => {
            return Err(RecoveryError::InvalidEvent(
                "failure_type must be a string".to_string(),
            ))
        }
    };

    let context = match object.get("context") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value @ Value::Object(_)) => value.clone(),
        Some(_) => {
            return Err(RecoveryError::InvalidEvent(
                "context must be a JSON object".to_string(),
            ))
        }
    };

    Ok(InvocationRequest {
        failure_type,
        context,
    })
}
