use crate::detections::DetectionRepository;
use crate::error::StoreError;

pub trait Store {
    type Detections<'a>: DetectionRepository
    where
        Self: 'a;

    /// Acquires the store for one unit of work. The handle is released when
    /// the returned repository is dropped.
    fn detections(&self) -> Result<Self::Detections<'_>, StoreError>;
}
