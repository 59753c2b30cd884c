//! Listing image uploads: parallel all-or-nothing batches against the object
//! store, and the capped set of URLs a listing is built from.

pub mod coordinator;
pub mod image_set;

pub use coordinator::{UploadCoordinator, UploadError, UploadItem, UploadProgress, UploadState};
pub use image_set::{ImageLimitExceeded, ImageSet};
