use crate::error::StoreError;
use crate::types::{Detection, NewDetection, PlateReading, SpotId};

/// Append-only log of detection events.
///
/// Ids are assigned by the implementation at append time and are strictly
/// increasing. Nothing is ever updated; `clear_all` is the only deletion.
pub trait DetectionRepository {
    fn append(&self, detection: NewDetection) -> Result<Detection, StoreError>;
    /// Most recently appended events, newest first.
    fn recent(&self, limit: u32) -> Result<Vec<Detection>, StoreError>;
    /// The highest-id event of every spot ever seen.
    fn latest_per_spot(&self) -> Result<Vec<Detection>, StoreError>;
    fn latest_for_spot(&self, spot_id: &SpotId) -> Result<Option<Detection>, StoreError>;
    fn clear_all(&self) -> Result<(), StoreError>;
    fn count_all(&self) -> Result<u64, StoreError>;
    fn count_with_plate(&self) -> Result<u64, StoreError>;
    fn count_distinct_spots(&self) -> Result<u64, StoreError>;
    fn recent_plates(&self, limit: u32) -> Result<Vec<PlateReading>, StoreError>;
}
