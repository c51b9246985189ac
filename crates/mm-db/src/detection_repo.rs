use crate::util::{classify, from_rfc3339, to_count, to_rfc3339, with_tx};
use chrono::{SubsecRound, Utc};
use mm_core::detections::DetectionRepository;
use mm_core::error::StoreError;
use mm_core::types::{BoundingBox, Detection, NewDetection, PlateReading, SpotId};
use rusqlite::{params, Connection, OptionalExtension, Params};
use std::sync::MutexGuard;
use tracing::error;

const DETECTION_COLUMNS: &str = "d.id, d.spot_id, d.xmin, d.ymin, d.xmax, d.ymax, d.confidence, d.class, d.plate, d.sent_at, d.received_at";

/// Event store operations on a locked connection.
///
/// Latest-per-spot reads go through `spot_latest`, which holds one row per
/// spot and is updated in the same transaction as each insert, so they cost
/// O(spots) regardless of how long the history is.
pub struct DetectionRepo<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> DetectionRepo<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }
}

impl DetectionRepository for DetectionRepo<'_> {
    fn append(&self, detection: NewDetection) -> Result<Detection, StoreError> {
        let (id, received_at) = with_tx(&self.conn, |conn| {
            // Stamped under the write lock so receive times follow id order.
            let received_at = Utc::now().trunc_subsecs(6);
            let spot_id = detection.spot_id.as_str();
            let previous: Option<i64> = conn
                .prepare_cached("SELECT detection_id FROM spot_latest WHERE spot_id = ?1")
                .and_then(|mut stmt| stmt.query_row([spot_id], |row| row.get(0)).optional())
                .map_err(classify)?;

            conn.prepare_cached(
                "INSERT INTO detections (spot_id, xmin, ymin, xmax, ymax, confidence, class, plate, sent_at, received_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .and_then(|mut stmt| {
                stmt.execute(params![
                    spot_id,
                    detection.bbox.xmin,
                    detection.bbox.ymin,
                    detection.bbox.xmax,
                    detection.bbox.ymax,
                    detection.confidence,
                    detection.class_name,
                    detection.identified_plate(),
                    detection.sent_at,
                    to_rfc3339(&received_at),
                ])
            })
            .map_err(classify)?;
            let id = conn.last_insert_rowid();

            if let Some(previous) = previous.filter(|previous| *previous >= id) {
                error!(spot_id, previous, id, "detection id did not advance");
                return Err(StoreError::Consistency {
                    message: format!("spot {spot_id} got id {id} after {previous}"),
                });
            }

            conn.prepare_cached(
                "INSERT INTO spot_latest (spot_id, detection_id) VALUES (?1, ?2) ON CONFLICT (spot_id) DO UPDATE SET detection_id = excluded.detection_id",
            )
            .and_then(|mut stmt| stmt.execute(params![spot_id, id]))
            .map_err(classify)?;
            Ok((id, received_at))
        })?;
        Ok(detection.into_detection(id, received_at))
    }

    fn recent(&self, limit: u32) -> Result<Vec<Detection>, StoreError> {
        let sql = format!("SELECT {DETECTION_COLUMNS} FROM detections d ORDER BY d.id DESC LIMIT ?1");
        let events = query_detections(&self.conn, &sql, [i64::from(limit)])?;
        ensure_descending(&events)?;
        Ok(events)
    }

    fn latest_per_spot(&self) -> Result<Vec<Detection>, StoreError> {
        let sql = format!(
            "SELECT {DETECTION_COLUMNS} FROM spot_latest s JOIN detections d ON d.id = s.detection_id ORDER BY d.id DESC"
        );
        query_detections(&self.conn, &sql, [])
    }

    fn latest_for_spot(&self, spot_id: &SpotId) -> Result<Option<Detection>, StoreError> {
        let sql = format!(
            "SELECT {DETECTION_COLUMNS} FROM spot_latest s JOIN detections d ON d.id = s.detection_id WHERE s.spot_id = ?1"
        );
        self.conn
            .prepare_cached(&sql)
            .and_then(|mut stmt| stmt.query_row([spot_id.as_str()], map_detection_row).optional())
            .map_err(classify)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        with_tx(&self.conn, |conn| {
            conn.execute("DELETE FROM spot_latest", []).map_err(classify)?;
            conn.execute("DELETE FROM detections", []).map_err(classify)?;
            Ok(())
        })
    }

    fn count_all(&self) -> Result<u64, StoreError> {
        count(&self.conn, "SELECT COUNT(*) FROM detections")
    }

    fn count_with_plate(&self) -> Result<u64, StoreError> {
        count(&self.conn, "SELECT COUNT(*) FROM detections WHERE plate IS NOT NULL")
    }

    fn count_distinct_spots(&self) -> Result<u64, StoreError> {
        count(&self.conn, "SELECT COUNT(*) FROM spot_latest")
    }

    fn recent_plates(&self, limit: u32) -> Result<Vec<PlateReading>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT plate, confidence, received_at FROM detections WHERE plate IS NOT NULL ORDER BY id DESC LIMIT ?1",
            )
            .map_err(classify)?;
        let rows = stmt
            .query_map([i64::from(limit)], |row| {
                let received_at: String = row.get(2)?;
                Ok(PlateReading {
                    plate: row.get(0)?,
                    confidence: row.get(1)?,
                    received_at: parse_received_at(2, &received_at)?,
                })
            })
            .map_err(classify)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(classify)
    }
}

fn query_detections<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Detection>, StoreError> {
    let mut stmt = conn.prepare_cached(sql).map_err(classify)?;
    let rows = stmt.query_map(params, map_detection_row).map_err(classify)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(classify)
}

fn count(conn: &Connection, sql: &str) -> Result<u64, StoreError> {
    let value: i64 = conn
        .query_row(sql, [], |row| row.get(0))
        .map_err(classify)?;
    to_count(value)
}

fn map_detection_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Detection> {
    let spot_id: String = row.get(1)?;
    let received_at: String = row.get(10)?;
    Ok(Detection {
        id: row.get(0)?,
        spot_id: SpotId::new(spot_id),
        bbox: BoundingBox::new(row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
        confidence: row.get(6)?,
        class_name: row.get(7)?,
        plate: row.get(8)?,
        sent_at: row.get(9)?,
        received_at: parse_received_at(10, &received_at)?,
    })
}

fn parse_received_at(column: usize, value: &str) -> rusqlite::Result<chrono::DateTime<Utc>> {
    from_rfc3339(value).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
    })
}

fn ensure_descending(events: &[Detection]) -> Result<(), StoreError> {
    if let Some(pair) = events.windows(2).find(|pair| pair[0].id <= pair[1].id) {
        error!(first = pair[0].id, second = pair[1].id, "detection log out of order");
        return Err(StoreError::Consistency {
            message: format!("id {} listed before id {}", pair[0].id, pair[1].id),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use crate::store::DbStore;
    use mm_core::store::Store;
    use std::collections::HashSet;
    use std::thread;

    fn test_store() -> DbStore {
        DbStore::new(schema::with_test_db().unwrap())
    }

    fn detection(spot: &str, confidence: f64) -> NewDetection {
        NewDetection::new(spot, BoundingBox::new(12.0, 40.0, 96.0, 180.0))
            .confidence(confidence)
            .class_name("motorcycle")
    }

    #[test]
    fn append_assigns_increasing_ids() {
        let store = test_store();
        let repo = store.detections().unwrap();
        let first = repo.append(detection("V1", 0.5)).unwrap();
        let second = repo.append(detection("V2", 0.5)).unwrap();
        assert!(second.id > first.id);
        assert_eq!(repo.count_all().unwrap(), 2);
    }

    #[test]
    fn latest_per_spot_keeps_highest_id() {
        let store = test_store();
        let repo = store.detections().unwrap();
        for confidence in [0.4, 0.9, 0.6] {
            repo.append(detection("V1", confidence)).unwrap();
        }
        let last = repo.append(detection("V2", 0.3)).unwrap();

        let latest = repo.latest_per_spot().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0], last);
        let v1 = latest.iter().find(|d| d.spot_id.as_str() == "V1").unwrap();
        assert_eq!(v1.confidence, 0.6);
    }

    #[test]
    fn stored_detection_reads_back_unchanged() {
        let store = test_store();
        let repo = store.detections().unwrap();
        let stored = repo
            .append(detection("V3", 1.7).plate("ABC1D23").sent_at(1_722_000_000.25))
            .unwrap();

        let read = repo.latest_for_spot(&SpotId::new("V3")).unwrap().unwrap();
        assert_eq!(read, stored);
        assert_eq!(read.sent_at, Some(1_722_000_000.25));
        assert!(repo.latest_for_spot(&SpotId::new("V4")).unwrap().is_none());
    }

    #[test]
    fn recent_is_newest_first_and_bounded() {
        let store = test_store();
        let repo = store.detections().unwrap();
        repo.append(detection("V1", 0.1)).unwrap();
        let v2 = repo.append(detection("V2", 0.2)).unwrap();
        let v3 = repo.append(detection("V3", 0.3)).unwrap();

        let recent = repo.recent(2).unwrap();
        assert_eq!(recent, vec![v3, v2]);
        assert_eq!(repo.recent(200).unwrap().len(), 3);
    }

    #[test]
    fn blank_plate_is_stored_as_missing() {
        let store = test_store();
        let repo = store.detections().unwrap();
        let stored = repo.append(detection("V1", 0.5).plate(" ")).unwrap();
        repo.append(detection("V2", 0.5).plate("XYZ9A87")).unwrap();

        assert_eq!(stored.plate, None);
        assert_eq!(repo.count_with_plate().unwrap(), 1);
        let plates = repo.recent_plates(10).unwrap();
        assert_eq!(plates.len(), 1);
        assert_eq!(plates[0].plate, "XYZ9A87");
    }

    #[test]
    fn recent_plates_is_bounded_newest_first() {
        let store = test_store();
        let repo = store.detections().unwrap();
        for plate in ["AAA0001", "BBB0002", "CCC0003"] {
            repo.append(detection("V1", 0.5).plate(plate)).unwrap();
        }
        let plates: Vec<String> = repo
            .recent_plates(2)
            .unwrap()
            .into_iter()
            .map(|reading| reading.plate)
            .collect();
        assert_eq!(plates, vec!["CCC0003", "BBB0002"]);
    }

    #[test]
    fn distinct_spots_matches_latest_per_spot() {
        let store = test_store();
        let repo = store.detections().unwrap();
        for spot in ["V1", "V2", "V1", "unknown", "V2"] {
            repo.append(detection(spot, 0.5)).unwrap();
        }
        assert_eq!(
            repo.count_distinct_spots().unwrap(),
            repo.latest_per_spot().unwrap().len() as u64
        );
        assert_eq!(repo.count_distinct_spots().unwrap(), 3);
    }

    #[test]
    fn clear_all_is_idempotent_and_ids_are_not_reused() {
        let store = test_store();
        let repo = store.detections().unwrap();
        let mut last = 0;
        for spot in ["V1", "V2", "V3", "V4", "V5"] {
            last = repo.append(detection(spot, 0.5).plate("ABC1D23")).unwrap().id;
        }

        repo.clear_all().unwrap();
        repo.clear_all().unwrap();

        assert_eq!(repo.count_all().unwrap(), 0);
        assert_eq!(repo.count_with_plate().unwrap(), 0);
        assert_eq!(repo.count_distinct_spots().unwrap(), 0);
        assert!(repo.latest_per_spot().unwrap().is_empty());
        assert!(repo.recent(10).unwrap().is_empty());

        let next = repo.append(detection("V1", 0.5)).unwrap();
        assert!(next.id > last);
    }

    #[test]
    fn spot_index_exists() {
        let store = test_store();
        let repo = store.detections().unwrap();
        let found: i64 = repo
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'detections_spot_id_id'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(found, 1);
    }

    #[test]
    fn malformed_row_is_reported_as_corrupt() {
        let store = test_store();
        let repo = store.detections().unwrap();
        repo.conn
            .execute(
                "INSERT INTO detections (spot_id, xmin, ymin, xmax, ymax, confidence, class, received_at) VALUES ('V1', 0, 0, 1, 1, 0.5, 'car', 'not-a-time')",
                [],
            )
            .unwrap();
        let err = repo.recent(10).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn concurrent_appends_get_distinct_ordered_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = DbStore::open(dir.path().join("detections.db")).unwrap();
        let threads = 8;
        let per_thread = 25;

        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let store = store.clone();
                thread::spawn(move || {
                    let spot = format!("V{worker}");
                    let mut ids = Vec::new();
                    for _ in 0..per_thread {
                        let stored = store
                            .detections()
                            .unwrap()
                            .append(detection(&spot, 0.5))
                            .unwrap();
                        ids.push(stored.id);
                    }
                    ids
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            let ids = handle.join().unwrap();
            assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
            all.extend(ids);
        }

        let unique: HashSet<i64> = all.iter().copied().collect();
        assert_eq!(all.len(), threads * per_thread);
        assert_eq!(unique.len(), all.len());

        let repo = store.detections().unwrap();
        assert_eq!(repo.count_all().unwrap(), (threads * per_thread) as u64);
        assert_eq!(repo.count_distinct_spots().unwrap(), threads as u64);
        let recent = repo.recent(u32::try_from(threads * per_thread).unwrap()).unwrap();
        assert_eq!(recent.len(), threads * per_thread);
    }

    #[test]
    fn separate_connections_serialize_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.db");
        let stores = [DbStore::open(&path).unwrap(), DbStore::open(&path).unwrap()];
        let per_store = 40;

        let handles: Vec<_> = stores
            .iter()
            .cloned()
            .map(|store| {
                thread::spawn(move || {
                    let mut ids = Vec::new();
                    for round in 0..per_store {
                        let spot = format!("V{}", round % 3);
                        let stored = store
                            .detections()
                            .unwrap()
                            .append(detection(&spot, 0.5))
                            .unwrap();
                        ids.push(stored.id);
                    }
                    ids
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            let ids = handle.join().unwrap();
            assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
            all.extend(ids);
        }
        let unique: HashSet<i64> = all.iter().copied().collect();
        assert_eq!(unique.len(), 2 * per_store);

        let repo = stores[0].detections().unwrap();
        assert_eq!(repo.count_all().unwrap(), (2 * per_store) as u64);
        let latest = repo.latest_per_spot().unwrap();
        assert_eq!(repo.count_distinct_spots().unwrap(), latest.len() as u64);
        assert_eq!(latest.len(), 3);

        let recent = repo.recent(u32::try_from(2 * per_store).unwrap()).unwrap();
        assert!(
            recent
                .windows(2)
                .all(|pair| pair[0].received_at >= pair[1].received_at)
        );
        for event in &latest {
            let newest = recent.iter().find(|e| e.spot_id == event.spot_id).unwrap();
            assert_eq!(newest.id, event.id);
        }
    }

    #[test]
    fn history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.db");
        let stored = {
            let store = DbStore::open(&path).unwrap();
            let repo = store.detections().unwrap();
            repo.append(detection("V1", 0.4)).unwrap();
            repo.append(detection("V1", 0.8).plate("QWE4R56")).unwrap()
        };

        let store = DbStore::open(&path).unwrap();
        let latest = store.detections().unwrap().latest_per_spot().unwrap();
        assert_eq!(latest, vec![stored]);
    }
}
