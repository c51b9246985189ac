use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Raw ingestion payload as posted by the upstream detector.
///
/// `vaga_id` and `placa` are accepted as aliases so existing producers keep
/// working unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DetectRequest {
    #[serde(alias = "vaga_id")]
    pub spot_id: Option<SpotIdInput>,
    pub bbox: Option<Vec<f64>>,
    pub confidence: Option<f64>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    #[serde(alias = "placa")]
    pub plate: Option<String>,
    #[serde(rename = "ts")]
    pub sent_at: Option<f64>,
}

/// Spot identifier as sent on the wire. Older detectors post a bare number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SpotIdInput {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl fmt::Display for SpotIdInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for SpotIdInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetectResponse {
    pub msg: String,
    pub id: i64,
    pub spot_id: String,
    pub plate: String,
}
