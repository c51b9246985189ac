use crate::config::OccupancySettings;
use crate::detections::DetectionRepository;
use crate::error::{MotomapError, StoreError};
use crate::store::Store;
use crate::types::{Detection, NewDetection, OccupancyView, SpotId, SpotStatus, StatsView};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Entry point for callers of the detection log.
///
/// Every read is recomputed from the store on each call; nothing is cached
/// here.
pub struct Motomap<S: Store> {
    store: S,
    occupancy: OccupancySettings,
}

impl<S: Store> Motomap<S> {
    pub fn new(store: S, occupancy: OccupancySettings) -> Self {
        Self { store, occupancy }
    }

    pub fn detections(&self) -> DetectionsApi<'_, S> {
        DetectionsApi { core: self }
    }

    pub fn occupancy(&self) -> OccupancyApi<'_, S> {
        OccupancyApi { core: self }
    }

    fn repo(&self) -> Result<S::Detections<'_>, MotomapError> {
        self.store.detections().map_err(logged)
    }
}

pub struct DetectionsApi<'a, S: Store> {
    core: &'a Motomap<S>,
}

impl<S: Store> DetectionsApi<'_, S> {
    pub fn ingest(&self, detection: NewDetection) -> Result<Detection, MotomapError> {
        let detection = self.core.repo()?.append(detection).map_err(logged)?;
        info!(
            id = detection.id,
            spot_id = %detection.spot_id,
            plate = detection.plate.as_deref().unwrap_or("-"),
            "detection stored"
        );
        Ok(detection)
    }

    pub fn recent(&self, limit: u32) -> Result<Vec<Detection>, MotomapError> {
        self.core.repo()?.recent(limit).map_err(logged)
    }

    pub fn clear_all(&self) -> Result<(), MotomapError> {
        self.core.repo()?.clear_all().map_err(logged)?;
        info!("detection log cleared");
        Ok(())
    }
}

pub struct OccupancyApi<'a, S: Store> {
    core: &'a Motomap<S>,
}

impl<S: Store> OccupancyApi<'_, S> {
    pub fn by_spot(&self) -> Result<BTreeMap<String, OccupancyView>, MotomapError> {
        let latest = self.core.repo()?.latest_per_spot().map_err(logged)?;
        Ok(latest
            .into_iter()
            .map(|detection| (detection.spot_id.to_string(), OccupancyView::from(detection)))
            .collect())
    }

    pub fn spot(&self, spot_id: &SpotId) -> Result<Option<OccupancyView>, MotomapError> {
        let latest = self
            .core
            .repo()?
            .latest_for_spot(spot_id)
            .map_err(logged)?;
        Ok(latest.map(OccupancyView::from))
    }

    pub fn status(&self) -> Result<BTreeMap<String, SpotStatus>, MotomapError> {
        Ok(self
            .by_spot()?
            .into_iter()
            .map(|(spot_id, view)| (spot_id, SpotStatus::from(view)))
            .collect())
    }

    pub fn stats(&self) -> Result<StatsView, MotomapError> {
        let settings = self.core.occupancy;
        // One acquisition so the counts describe the same snapshot.
        let repo = self.core.repo()?;
        Ok(StatsView {
            total_detections: repo.count_all().map_err(logged)?,
            detections_with_plate: repo.count_with_plate().map_err(logged)?,
            occupied_spots: repo.count_distinct_spots().map_err(logged)?,
            total_spots: settings.total_spots,
            recent_plates: repo
                .recent_plates(settings.recent_plates_limit)
                .map_err(logged)?,
        })
    }
}

fn logged(err: StoreError) -> MotomapError {
    match &err {
        StoreError::Transient { message } => warn!(%message, "store unavailable"),
        StoreError::Corrupt { message } => error!(%message, "store returned corrupt data"),
        StoreError::Consistency { message } => error!(%message, "detection log invariant broken"),
    }
    MotomapError::Store(err)
}
