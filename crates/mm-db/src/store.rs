use crate::detection_repo::DetectionRepo;
use crate::schema;
use crate::util::classify;
use mm_core::error::StoreError;
use mm_core::store::Store;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Single owned SQLite handle shared by every caller.
///
/// Cloning is cheap. Each unit of work locks the connection for as long as
/// the [`DetectionRepo`] it received is alive.
#[derive(Clone)]
pub struct DbStore {
    conn: Arc<Mutex<Connection>>,
}

impl DbStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = schema::open_and_migrate(path).map_err(classify)?;
        Ok(Self::new(conn))
    }
}

impl Store for DbStore {
    type Detections<'a>
        = DetectionRepo<'a>
    where
        Self: 'a;

    fn detections(&self) -> Result<Self::Detections<'_>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Corrupt {
            message: "connection lock poisoned by a panicked writer".to_string(),
        })?;
        Ok(DetectionRepo::new(conn))
    }
}
