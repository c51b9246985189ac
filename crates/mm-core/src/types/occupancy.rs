use crate::types::detection::{BoundingBox, Detection, PlateReading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const PLATE_NOT_IDENTIFIED: &str = "not identified";

/// Occupancy of one spot, derived from its most recent detection.
///
/// A spot that was ever detected stays `occupied` until the store is
/// cleared; there is no vacancy timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OccupancyView {
    #[schema(value_type = Vec<f64>)]
    pub bbox: BoundingBox,
    pub confidence: f64,
    #[serde(rename = "class")]
    pub class_name: String,
    pub plate: String,
    pub timestamp: DateTime<Utc>,
    pub occupied: bool,
}

impl From<Detection> for OccupancyView {
    fn from(detection: Detection) -> Self {
        Self {
            bbox: detection.bbox,
            confidence: detection.confidence,
            class_name: detection.class_name,
            plate: plate_or_fallback(detection.plate),
            timestamp: detection.received_at,
            occupied: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SpotStatus {
    pub occupied: bool,
    pub plate: String,
    pub timestamp: DateTime<Utc>,
}

impl From<OccupancyView> for SpotStatus {
    fn from(view: OccupancyView) -> Self {
        Self {
            occupied: view.occupied,
            plate: view.plate,
            timestamp: view.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatsView {
    pub total_detections: u64,
    pub detections_with_plate: u64,
    pub occupied_spots: u64,
    pub total_spots: u32,
    pub recent_plates: Vec<PlateReading>,
}

fn plate_or_fallback(plate: Option<String>) -> String {
    plate
        .filter(|plate| !plate.trim().is_empty())
        .unwrap_or_else(|| PLATE_NOT_IDENTIFIED.to_string())
}
