pub mod config;
pub mod detections;
pub mod error;
pub mod motomap;
pub mod store;
pub mod validation;

pub mod types;

pub use crate::error::MotomapError;
pub use crate::motomap::Motomap;
pub use crate::store::Store;
