use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::OperationFailed;

/// The answer of the management endpoint to one operation.
///
/// Together with the `Err` case of the `Result` it is returned in, this forms
/// a tri-state:
/// - `Ok(ModelResult::Success(_))`: executed; the value may be absent
///   (`None`) or present but undefined (`Some(Value::Null)`)
/// - `Ok(ModelResult::Failed { .. })`: executed, and the endpoint reported a
///   failure such as a duplicate resource
/// - `Err(_)`: the round trip itself did not complete
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResult {
    Success(Option<Value>),
    Failed { description: String },
}

impl ModelResult {
    pub fn success(value: impl Into<Value>) -> Self {
        ModelResult::Success(Some(value.into()))
    }

    pub fn success_without_value() -> Self {
        ModelResult::Success(None)
    }

    pub fn failed(description: impl Into<String>) -> Self {
        ModelResult::Failed {
            description: description.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ModelResult::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        !self.is_success()
    }

    /// Successful and carrying a value other than undefined.
    pub fn is_defined(&self) -> bool {
        matches!(self, ModelResult::Success(Some(v)) if !v.is_null())
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            ModelResult::Success(v) => v.as_ref(),
            ModelResult::Failed { .. } => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }

    pub fn bool_value(&self) -> Option<bool> {
        self.value().and_then(Value::as_bool)
    }

    pub fn int_value(&self) -> Option<i64> {
        self.value().and_then(Value::as_i64)
    }

    pub fn string_list_value(&self) -> Option<Vec<String>> {
        self.value()
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
    }

    pub fn failure_description(&self) -> Option<&str> {
        match self {
            ModelResult::Success(_) => None,
            ModelResult::Failed { description } => Some(description),
        }
    }

    /// Turns a reported failure into an [`OperationFailed`] error.
    pub fn assert_success(self) -> Result<ModelResult> {
        match self {
            ModelResult::Success(_) => Ok(self),
            ModelResult::Failed { description } => Err(OperationFailed { description }.into()),
        }
    }

    /// Like [`ModelResult::assert_success`], and requires a defined value.
    pub fn assert_defined(self) -> Result<Value> {
        match self.assert_success()? {
            ModelResult::Success(Some(v)) if !v.is_null() => Ok(v),
            _ => bail!("operation returned no defined value"),
        }
    }
}

/// Wire format, in the raw form used by (de)serialization.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawResult {
    outcome: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_description: Option<Value>,
}

/// Distinguishes `"result": null` (`Some(Null)`) from a missing key (`None`).
fn deserialize_present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl Serialize for ModelResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = match self {
            ModelResult::Success(v) => RawResult {
                outcome: "success".to_string(),
                result: v.clone(),
                failure_description: None,
            },
            ModelResult::Failed { description } => RawResult {
                outcome: "failed".to_string(),
                result: None,
                failure_description: Some(Value::String(description.clone())),
            },
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ModelResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawResult::deserialize(deserializer)?;
        match raw.outcome.as_str() {
            "success" => Ok(ModelResult::Success(raw.result)),
            "failed" | "cancelled" => {
                let description = match raw.failure_description {
                    Some(Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => format!("operation {}", raw.outcome),
                };
                Ok(ModelResult::Failed { description })
            }
            other => Err(serde::de::Error::custom(format!(
                "unknown operation outcome: {}",
                other
            ))),
        }
    }
}
