use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::cars::query::CarQuery;
use crate::cars::repo::CarStore;
use crate::cars::repo_types::{Car, CarChanges, NewCar};
use crate::error::StoreError;

/// Process-local `CarStore`; owner checks and mutations happen under one
/// write lock, matching the single-statement behaviour of the Postgres store.
#[derive(Default)]
pub struct MemoryCarStore {
    cars: RwLock<HashMap<Uuid, Car>>,
}

impl MemoryCarStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CarStore for MemoryCarStore {
    async fn insert(&self, new: NewCar) -> Result<Car, StoreError> {
        let now = OffsetDateTime::now_utc();
        let car = Car {
            id: Uuid::new_v4(),
            user_ref: new.owner,
            title: new.title,
            description: new.description,
            tags: new.tags,
            images: new.images,
            offer: new.offer,
            created_at: now,
            updated_at: now,
        };
        self.cars.write().await.insert(car.id, car.clone());
        Ok(car)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Car>, StoreError> {
        Ok(self.cars.read().await.get(&id).cloned())
    }

    async fn search(&self, query: &CarQuery) -> Result<Vec<Car>, StoreError> {
        let cars = self.cars.read().await;
        let mut hits: Vec<&Car> = cars.values().filter(|c| query.matches(c)).collect();
        hits.sort_by(|a, b| query.compare(a, b));
        Ok(hits
            .into_iter()
            .skip(query.start_index as usize)
            .take(query.fetch_limit() as usize)
            .cloned()
            .collect())
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Car>, StoreError> {
        let cars = self.cars.read().await;
        let mut owned: Vec<Car> = cars.values().filter(|c| c.user_ref == owner).cloned().collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(owned)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner: Uuid,
        changes: CarChanges,
    ) -> Result<Option<Car>, StoreError> {
        let mut cars = self.cars.write().await;
        let Some(car) = cars.get_mut(&id).filter(|c| c.user_ref == owner) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            car.title = title;
        }
        if let Some(description) = changes.description {
            car.description = description;
        }
        if let Some(tags) = changes.tags {
            car.tags = tags;
        }
        if let Some(images) = changes.images {
            car.images = images;
        }
        if let Some(offer) = changes.offer {
            car.offer = offer;
        }
        car.updated_at = OffsetDateTime::now_utc();
        Ok(Some(car.clone()))
    }

    async fn delete_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Car>, StoreError> {
        let mut cars = self.cars.write().await;
        match cars.get(&id) {
            Some(car) if car.user_ref == owner => Ok(cars.remove(&id)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn new_car(owner: Uuid, title: &str) -> NewCar {
        NewCar {
            owner,
            title: title.into(),
            description: "well kept".into(),
            tags: vec!["sedan".into()],
            images: vec!["https://img.example/1.jpg".into()],
            offer: false,
        }
    }

    #[tokio::test]
    async fn foreign_owner_cannot_mutate() {
        let store = MemoryCarStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let car = store.insert(new_car(alice, "Civic")).await.unwrap();

        let changes = CarChanges {
            title: Some("Stolen".into()),
            ..Default::default()
        };
        assert!(store.update_owned(car.id, bob, changes).await.unwrap().is_none());
        assert!(store.delete_owned(car.id, bob).await.unwrap().is_none());
        assert_eq!(store.get(car.id).await.unwrap(), Some(car));
    }

    #[tokio::test]
    async fn search_pages_with_one_extra_row() {
        let store = MemoryCarStore::new();
        let owner = Uuid::new_v4();
        for i in 0..12 {
            store.insert(new_car(owner, &format!("Car {i}"))).await.unwrap();
        }
        let first = store.search(&CarQuery::default()).await.unwrap();
        assert_eq!(first.len(), 10);
        let rest = store
            .search(&CarQuery {
                start_index: 9,
                ..CarQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(rest.len(), 3);
    }

    #[tokio::test]
    async fn concurrent_update_and_delete_never_resurrect_a_listing() {
        for _ in 0..50 {
            let store = Arc::new(MemoryCarStore::new());
            let owner = Uuid::new_v4();
            let car = store.insert(new_car(owner, "Corolla")).await.unwrap();

            let updater = {
                let store = store.clone();
                tokio::spawn(async move {
                    let changes = CarChanges {
                        title: Some("Corolla (price drop)".into()),
                        ..Default::default()
                    };
                    store.update_owned(car.id, owner, changes).await.unwrap()
                })
            };
            let deleter = {
                let store = store.clone();
                tokio::spawn(async move { store.delete_owned(car.id, owner).await.unwrap() })
            };
            let (updated, deleted) = (updater.await.unwrap(), deleter.await.unwrap());

            let deleted = deleted.expect("delete by the owner always finds the listing");
            if updated.is_some() {
                // update won the race, so the delete removed the updated row
                assert_eq!(deleted.title, "Corolla (price drop)");
            } else {
                assert_eq!(deleted.title, "Corolla");
            }
            assert!(store.get(car.id).await.unwrap().is_none());
        }
    }
}
