use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cars::dto::{CreateCarRequest, UpdateCarRequest};
use crate::cars::query::{CarQuery, SearchParams};
use crate::cars::repo::CarStore;
use crate::cars::repo_types::{Car, CarChanges, NewCar};
use crate::error::{AppError, AppResult};

/// Hard cap on images per listing, checked on every write.
pub const MAX_IMAGES: usize = 10;

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub cars: Vec<Car>,
    pub has_more: bool,
    pub next_start_index: Option<i64>,
}

pub fn validate_images(images: &[String]) -> AppResult<()> {
    if images.len() > MAX_IMAGES {
        return Err(AppError::Validation(format!(
            "You can upload a maximum of {MAX_IMAGES} images"
        )));
    }
    if images.iter().any(|u| u.trim().is_empty()) {
        return Err(AppError::Validation("Image URLs must not be empty".into()));
    }
    Ok(())
}

fn required_text(field: &str, value: String) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trims tags, drops blanks and duplicates, keeps first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Validates and stores a new listing owned by `owner`.
pub async fn create_car(store: &dyn CarStore, owner: Uuid, req: CreateCarRequest) -> AppResult<Car> {
    validate_images(&req.images)?;
    let new = NewCar {
        owner,
        title: required_text("Title", req.title)?,
        description: required_text("Description", req.description)?,
        tags: normalize_tags(req.tags),
        images: req.images,
        offer: req.offer,
    };
    let car = store.insert(new).await?;
    info!(car_id = %car.id, user_id = %owner, images = car.images.len(), "car created");
    Ok(car)
}

pub async fn get_car(store: &dyn CarStore, id: Uuid) -> AppResult<Car> {
    store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".into()))
}

pub async fn update_car(
    store: &dyn CarStore,
    id: Uuid,
    owner: Uuid,
    req: UpdateCarRequest,
) -> AppResult<Car> {
    if let Some(images) = &req.images {
        validate_images(images)?;
    }
    let changes = CarChanges {
        title: req.title.map(|t| required_text("Title", t)).transpose()?,
        description: req
            .description
            .map(|d| required_text("Description", d))
            .transpose()?,
        tags: req.tags.map(normalize_tags),
        images: req.images,
        offer: req.offer,
    };
    match store.update_owned(id, owner, changes).await? {
        Some(car) => {
            info!(car_id = %id, user_id = %owner, "car updated");
            Ok(car)
        }
        None => {
            warn!(car_id = %id, user_id = %owner, "update rejected: missing or not owned");
            Err(AppError::NotFoundOrUnauthorized("Car"))
        }
    }
}

pub async fn delete_car(store: &dyn CarStore, id: Uuid, owner: Uuid) -> AppResult<Car> {
    match store.delete_owned(id, owner).await? {
        Some(car) => {
            info!(car_id = %id, user_id = %owner, "car deleted");
            Ok(car)
        }
        None => {
            warn!(car_id = %id, user_id = %owner, "delete rejected: missing or not owned");
            Err(AppError::NotFoundOrUnauthorized("Car"))
        }
    }
}

pub async fn search_cars(store: &dyn CarStore, params: SearchParams) -> AppResult<Page> {
    let query = CarQuery::try_from(params)?;
    let mut cars = store.search(&query).await?;
    let has_more = cars.len() as i64 > query.limit;
    cars.truncate(query.limit as usize);
    debug!(?query, returned = cars.len(), has_more, "car search");
    Ok(Page {
        next_start_index: has_more.then(|| query.start_index + cars.len() as i64),
        cars,
        has_more,
    })
}

pub async fn list_owned(store: &dyn CarStore, owner: Uuid) -> AppResult<Vec<Car>> {
    Ok(store.list_by_owner(owner).await?)
}
