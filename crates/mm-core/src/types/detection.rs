use crate::types::ids::SpotId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Pixel-space box as emitted by the detector.
///
/// Coordinates are kept exactly as received; `xmin < xmax` is not checked.
/// On the wire the box is a four-element array `[xmin, ymin, xmax, ymax]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([xmin, ymin, xmax, ymax]: [f64; 4]) -> Self {
        Self::new(xmin, ymin, xmax, ymax)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(value: BoundingBox) -> Self {
        [value.xmin, value.ymin, value.xmax, value.ymax]
    }
}

/// A persisted detection event. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Detection {
    pub id: i64,
    pub spot_id: SpotId,
    #[schema(value_type = Vec<f64>)]
    pub bbox: BoundingBox,
    pub confidence: f64,
    #[serde(rename = "class")]
    pub class_name: String,
    pub plate: Option<String>,
    pub sent_at: Option<f64>,
    pub received_at: DateTime<Utc>,
}

/// A detection that has not been assigned an id or a receive time yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDetection {
    pub spot_id: SpotId,
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub class_name: String,
    pub plate: Option<String>,
    pub sent_at: Option<f64>,
}

impl NewDetection {
    pub fn new(spot_id: impl Into<SpotId>, bbox: BoundingBox) -> Self {
        Self {
            spot_id: spot_id.into(),
            bbox,
            confidence: 0.0,
            class_name: String::new(),
            plate: None,
            sent_at: None,
        }
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn plate(mut self, plate: impl Into<String>) -> Self {
        self.plate = Some(plate.into());
        self
    }

    pub fn sent_at(mut self, sent_at: f64) -> Self {
        self.sent_at = Some(sent_at);
        self
    }

    /// Plate text if the recognizer produced one. Empty or blank text means
    /// the plate was not identified.
    pub fn identified_plate(&self) -> Option<&str> {
        self.plate
            .as_deref()
            .filter(|plate| !plate.trim().is_empty())
    }

    pub fn into_detection(self, id: i64, received_at: DateTime<Utc>) -> Detection {
        let plate = self.identified_plate().map(str::to_string);
        Detection {
            id,
            spot_id: self.spot_id,
            bbox: self.bbox,
            confidence: self.confidence,
            class_name: self.class_name,
            plate,
            sent_at: self.sent_at,
            received_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlateReading {
    pub plate: String,
    pub confidence: f64,
    pub received_at: DateTime<Utc>,
}
