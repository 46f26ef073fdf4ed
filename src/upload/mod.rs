mod aggregator;
mod controller;
mod types;

pub use aggregator::{fold, ListenerGuard, ProgressAggregator, IN_FLIGHT_CEILING};
pub use controller::{UploadController, NO_CAMERA};
pub use types::{percentage_of, FileState, UploadProgress, UploadStatus};
