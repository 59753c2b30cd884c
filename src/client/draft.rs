use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::cars::dto::{CreateCarRequest, UpdateCarRequest};
use crate::cars::repo_types::Car;
use crate::uploads::{
    ImageLimitExceeded, ImageSet, UploadCoordinator, UploadError, UploadItem, UploadProgress,
};

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("At least one image is required")]
    NoImages,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error(transparent)]
    TooManyImages(#[from] ImageLimitExceeded),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Listing form state before it is submitted.
#[derive(Debug, Clone, Default)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub offer: bool,
    pub images: ImageSet,
}

/// Splits a comma-separated tag input, trimming each entry.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl ListingDraft {
    /// Draft prefilled from an existing listing, for editing.
    pub fn from_car(car: &Car) -> Result<Self, DraftError> {
        Ok(Self {
            title: car.title.clone(),
            description: car.description.clone(),
            tags: car.tags.clone(),
            offer: car.offer,
            images: ImageSet::from_urls(car.images.clone())?,
        })
    }

    pub fn set_tags(&mut self, input: &str) {
        self.tags = parse_tags(input);
    }

    /// Uploads one batch and appends its URLs; nothing is appended on failure.
    pub async fn upload_images(
        &mut self,
        coordinator: &UploadCoordinator,
        owner: Uuid,
        files: Vec<UploadItem>,
        progress: Option<UnboundedSender<UploadProgress>>,
    ) -> Result<usize, DraftError> {
        self.images.check_room(files.len())?;
        let urls = coordinator.upload_batch(owner, files, progress).await?;
        let added = urls.len();
        self.images.extend(urls)?;
        Ok(added)
    }

    fn check(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::MissingField("Title"));
        }
        if self.description.trim().is_empty() {
            return Err(DraftError::MissingField("Description"));
        }
        if self.images.is_empty() {
            return Err(DraftError::NoImages);
        }
        self.images.check_room(0)?;
        Ok(())
    }

    pub fn to_create_request(&self) -> Result<CreateCarRequest, DraftError> {
        self.check()?;
        Ok(CreateCarRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            images: self.images.to_vec(),
            offer: self.offer,
        })
    }

    pub fn to_update_request(&self) -> Result<UpdateCarRequest, DraftError> {
        self.check()?;
        Ok(UpdateCarRequest {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            tags: Some(self.tags.clone()),
            images: Some(self.images.to_vec()),
            offer: Some(self.offer),
        })
    }
}
