use thiserror::Error;

use crate::cars::services::MAX_IMAGES;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("You can upload a maximum of {max} images")]
pub struct ImageLimitExceeded {
    pub max: usize,
    pub attempted: usize,
}

/// Ordered image URLs of one listing, never more than [`MAX_IMAGES`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet {
    urls: Vec<String>,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_urls(urls: Vec<String>) -> Result<Self, ImageLimitExceeded> {
        let mut set = Self::new();
        set.extend(urls)?;
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn remaining(&self) -> usize {
        MAX_IMAGES - self.urls.len()
    }

    pub fn check_room(&self, additional: usize) -> Result<(), ImageLimitExceeded> {
        let attempted = self.urls.len() + additional;
        if attempted > MAX_IMAGES {
            return Err(ImageLimitExceeded {
                max: MAX_IMAGES,
                attempted,
            });
        }
        Ok(())
    }

    /// Appends a whole batch or nothing.
    pub fn extend(&mut self, batch: Vec<String>) -> Result<(), ImageLimitExceeded> {
        self.check_room(batch.len())?;
        self.urls.extend(batch);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.urls.len()).then(|| self.urls.remove(index))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.urls.clone()
    }
}
