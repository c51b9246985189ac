pub mod detection;
pub mod ids;
pub mod io;
pub mod occupancy;

pub use detection::{BoundingBox, Detection, NewDetection, PlateReading};
pub use ids::SpotId;
pub use io::{DetectRequest, DetectResponse, SpotIdInput};
pub use occupancy::{OccupancyView, SpotStatus, StatsView};
