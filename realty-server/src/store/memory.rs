//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use realty_core::property::{next_display_order, plan_reorder, PropertyImage, PropertyInput, PropertyUpdate};
use realty_core::viewing::{sort_for_listing, ViewingDraft};
use realty_core::{Property, PropertyFilter, Role, Viewing, ViewingFilter, ViewingStatus};

use super::{
    CollectionStore, ComparisonEntry, Favorite, PropertyStore, SavedSearch, StoreResult,
    UpsertUser, User, UserId, UserStore, ViewingStore,
};
use crate::error::AppError;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory store with the same semantics as [`super::SqliteStore`]
pub struct InMemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    properties: RwLock<HashMap<i64, Property>>,
    images: RwLock<HashMap<i64, PropertyImage>>,
    viewings: RwLock<HashMap<i64, Viewing>>,
    favorites: RwLock<Vec<Favorite>>,
    saved_searches: RwLock<Vec<SavedSearch>>,
    comparison: RwLock<Vec<ComparisonEntry>>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            properties: RwLock::new(HashMap::new()),
            images: RwLock::new(HashMap::new()),
            viewings: RwLock::new(HashMap::new()),
            favorites: RwLock::new(Vec::new()),
            saved_searches: RwLock::new(Vec::new()),
            comparison: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for InMemoryStore {
    fn upsert_user(&self, user: UpsertUser) -> StoreResult<User> {
        let now = Utc::now();
        let mut users = write(&self.users);

        if let Some(existing) = users.values_mut().find(|u| u.open_id == user.open_id) {
            if user.name.is_some() {
                existing.name = user.name;
            }
            if user.email.is_some() {
                existing.email = user.email;
            }
            if user.phone.is_some() {
                existing.phone = user.phone;
            }
            if user.password_hash.is_some() {
                existing.password_hash = user.password_hash;
            }
            if user.login_method.is_some() {
                existing.login_method = user.login_method;
            }
            if let Some(role) = user.role {
                existing.role = role;
            }
            existing.updated_at = now;
            existing.last_signed_in = now;
            return Ok(existing.clone());
        }

        let id = UserId(self.next_id());
        let created = User {
            id,
            open_id: user.open_id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            login_method: user.login_method,
            role: user.role.unwrap_or(Role::User),
            created_at: now,
            updated_at: now,
            last_signed_in: now,
        };
        users.insert(id, created.clone());
        Ok(created)
    }

    fn get_user_by_open_id(&self, open_id: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)
            .values()
            .find(|u| u.open_id == open_id)
            .cloned())
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)
            .values()
            .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            .cloned())
    }
}

impl PropertyStore for InMemoryStore {
    fn create_property(&self, input: PropertyInput) -> StoreResult<Property> {
        let now = Utc::now();
        let property = Property {
            id: self.next_id(),
            title: input.title,
            description: input.description,
            property_type: input.property_type,
            price: input.price,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            square_feet: input.square_feet,
            address: input.address,
            city: input.city,
            state: input.state,
            zip_code: input.zip_code,
            status: input.status,
            amenities: input.amenities,
            featured: input.featured,
            created_at: now,
            updated_at: now,
        };
        write(&self.properties).insert(property.id, property.clone());
        Ok(property)
    }

    fn get_property(&self, id: i64) -> StoreResult<Option<Property>> {
        Ok(read(&self.properties).get(&id).cloned())
    }

    fn list_properties(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>> {
        let all = read(&self.properties).values().cloned().collect();
        Ok(filter.apply(all))
    }

    fn update_property(&self, id: i64, update: PropertyUpdate) -> StoreResult<Property> {
        let mut properties = write(&self.properties);
        let property = properties
            .get_mut(&id)
            .ok_or(AppError::NotFound("Property"))?;

        // Apply to a copy so a rejected update leaves the listing untouched
        let mut updated = property.clone();
        update.apply(&mut updated, Utc::now())?;
        *property = updated.clone();
        Ok(updated)
    }

    fn delete_property(&self, id: i64) -> StoreResult<()> {
        write(&self.properties).remove(&id);
        write(&self.images).retain(|_, img| img.property_id != id);
        write(&self.viewings).retain(|_, v| v.property_id != id);
        write(&self.favorites).retain(|f| f.property_id != id);
        write(&self.comparison).retain(|c| c.property_id != id);
        Ok(())
    }

    fn list_images(&self, property_id: i64) -> StoreResult<Vec<PropertyImage>> {
        let mut images: Vec<PropertyImage> = read(&self.images)
            .values()
            .filter(|img| img.property_id == property_id)
            .cloned()
            .collect();
        images.sort_by_key(|img| img.display_order);
        Ok(images)
    }

    fn add_image(
        &self,
        property_id: i64,
        url: &str,
        caption: Option<&str>,
    ) -> StoreResult<PropertyImage> {
        if !read(&self.properties).contains_key(&property_id) {
            return Err(AppError::NotFound("Property"));
        }

        let mut images = write(&self.images);
        let current: Vec<PropertyImage> = images
            .values()
            .filter(|img| img.property_id == property_id)
            .cloned()
            .collect();

        let image = PropertyImage {
            id: self.next_id(),
            property_id,
            url: url.to_string(),
            caption: caption.map(str::to_string),
            display_order: next_display_order(&current),
        };
        images.insert(image.id, image.clone());
        Ok(image)
    }

    fn reorder_images(
        &self,
        property_id: i64,
        image_ids: &[i64],
    ) -> StoreResult<Vec<PropertyImage>> {
        {
            let mut images = write(&self.images);
            let current: Vec<PropertyImage> = images
                .values()
                .filter(|img| img.property_id == property_id)
                .cloned()
                .collect();

            for (image_id, order) in plan_reorder(&current, image_ids)? {
                if let Some(image) = images.get_mut(&image_id) {
                    image.display_order = order;
                }
            }
        }
        self.list_images(property_id)
    }

    fn delete_image(&self, image_id: i64) -> StoreResult<bool> {
        Ok(write(&self.images).remove(&image_id).is_some())
    }
}

impl ViewingStore for InMemoryStore {
    fn create_viewing(&self, draft: ViewingDraft) -> StoreResult<Viewing> {
        if !read(&self.properties).contains_key(&draft.property_id) {
            return Err(AppError::NotFound("Property"));
        }

        let now = Utc::now();
        let viewing = Viewing {
            id: self.next_id(),
            property_id: draft.property_id,
            visitor_name: draft.visitor_name,
            visitor_email: draft.visitor_email,
            visitor_phone: draft.visitor_phone,
            viewing_date: draft.viewing_date,
            viewing_time: draft.viewing_time,
            duration: draft.duration,
            notes: draft.notes,
            status: ViewingStatus::Scheduled,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };
        write(&self.viewings).insert(viewing.id, viewing.clone());
        Ok(viewing)
    }

    fn get_viewing(&self, id: i64) -> StoreResult<Option<Viewing>> {
        Ok(read(&self.viewings).get(&id).cloned())
    }

    fn list_viewings(&self, filter: &ViewingFilter) -> StoreResult<Vec<Viewing>> {
        let mut viewings: Vec<Viewing> = read(&self.viewings)
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        sort_for_listing(&mut viewings);
        Ok(viewings)
    }

    fn list_viewings_by_email(&self, email: &str) -> StoreResult<Vec<Viewing>> {
        let mut viewings: Vec<Viewing> = read(&self.viewings)
            .values()
            .filter(|v| v.visitor_email.eq_ignore_ascii_case(email))
            .cloned()
            .collect();
        sort_for_listing(&mut viewings);
        Ok(viewings)
    }

    fn update_viewing_status(
        &self,
        id: i64,
        status: ViewingStatus,
        cancellation_reason: Option<&str>,
    ) -> StoreResult<()> {
        let mut viewings = write(&self.viewings);
        let viewing = viewings.get_mut(&id).ok_or(AppError::NotFound("Viewing"))?;
        viewing.status = status;
        if cancellation_reason.is_some() {
            viewing.cancellation_reason = cancellation_reason.map(str::to_string);
        }
        viewing.updated_at = Utc::now();
        Ok(())
    }

    fn delete_viewing(&self, id: i64) -> StoreResult<()> {
        write(&self.viewings).remove(&id);
        Ok(())
    }
}

impl CollectionStore for InMemoryStore {
    fn list_favorites(&self, user_id: UserId) -> StoreResult<Vec<Favorite>> {
        Ok(read(&self.favorites)
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    fn add_favorite(&self, user_id: UserId, property_id: i64) -> StoreResult<Favorite> {
        let mut favorites = write(&self.favorites);
        if let Some(existing) = favorites
            .iter()
            .find(|f| f.user_id == user_id && f.property_id == property_id)
        {
            return Ok(existing.clone());
        }

        let favorite = Favorite {
            id: self.next_id(),
            user_id,
            property_id,
            created_at: Utc::now(),
        };
        favorites.push(favorite.clone());
        Ok(favorite)
    }

    fn remove_favorite(&self, user_id: UserId, property_id: i64) -> StoreResult<()> {
        write(&self.favorites).retain(|f| !(f.user_id == user_id && f.property_id == property_id));
        Ok(())
    }

    fn list_saved_searches(&self, user_id: UserId) -> StoreResult<Vec<SavedSearch>> {
        Ok(read(&self.saved_searches)
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    fn create_saved_search(
        &self,
        user_id: UserId,
        name: &str,
        filter: &PropertyFilter,
    ) -> StoreResult<SavedSearch> {
        let search = SavedSearch {
            id: self.next_id(),
            user_id,
            name: name.to_string(),
            filter: filter.clone(),
            created_at: Utc::now(),
        };
        write(&self.saved_searches).push(search.clone());
        Ok(search)
    }

    fn delete_saved_search(&self, user_id: UserId, id: i64) -> StoreResult<bool> {
        let mut searches = write(&self.saved_searches);
        let before = searches.len();
        searches.retain(|s| !(s.id == id && s.user_id == user_id));
        Ok(searches.len() != before)
    }

    fn list_comparison(&self, user_id: UserId) -> StoreResult<Vec<ComparisonEntry>> {
        Ok(read(&self.comparison)
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    fn add_comparison(&self, user_id: UserId, property_id: i64) -> StoreResult<ComparisonEntry> {
        let mut comparison = write(&self.comparison);
        if let Some(existing) = comparison
            .iter()
            .find(|c| c.user_id == user_id && c.property_id == property_id)
        {
            return Ok(existing.clone());
        }

        let entry = ComparisonEntry {
            id: self.next_id(),
            user_id,
            property_id,
            created_at: Utc::now(),
        };
        comparison.push(entry.clone());
        Ok(entry)
    }

    fn remove_comparison(&self, user_id: UserId, property_id: i64) -> StoreResult<()> {
        write(&self.comparison).retain(|c| !(c.user_id == user_id && c.property_id == property_id));
        Ok(())
    }

    fn clear_comparison(&self, user_id: UserId) -> StoreResult<()> {
        write(&self.comparison).retain(|c| c.user_id != user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use realty_core::NewViewing;

    fn listing(store: &InMemoryStore) -> Property {
        store
            .create_property(PropertyInput {
                title: "Harbor Loft".into(),
                price: 450_000,
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn test_upsert_keeps_role_unless_given() {
        let store = InMemoryStore::new();

        let user = store
            .upsert_user(UpsertUser {
                open_id: "u1".into(),
                role: Some(Role::Admin),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(user.role, Role::Admin);

        let user = store
            .upsert_user(UpsertUser {
                open_id: "u1".into(),
                name: Some("Jane".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_images_append_in_order() {
        let store = InMemoryStore::new();
        let property = listing(&store);

        let a = store.add_image(property.id, "https://img/a.jpg", None).unwrap();
        let b = store.add_image(property.id, "https://img/b.jpg", None).unwrap();
        assert_eq!((a.display_order, b.display_order), (0, 1));

        let reordered = store.reorder_images(property.id, &[b.id, a.id]).unwrap();
        let ids: Vec<i64> = reordered.iter().map(|img| img.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_viewing_lifecycle() {
        let store = InMemoryStore::new();
        let property = listing(&store);
        let now = Utc::now();

        let draft = NewViewing {
            property_id: property.id,
            visitor_name: "Jane".into(),
            visitor_email: "jane@example.com".into(),
            viewing_date: Some(now + Duration::days(1)),
            viewing_time: "09:30".into(),
            ..Default::default()
        }
        .validate(now)
        .unwrap();

        let viewing = store.create_viewing(draft).unwrap();
        assert_eq!(viewing.status, ViewingStatus::Scheduled);

        store
            .update_viewing_status(viewing.id, ViewingStatus::Cancelled, Some("Sold"))
            .unwrap();
        let updated = store.get_viewing(viewing.id).unwrap().unwrap();
        assert_eq!(updated.status, ViewingStatus::Cancelled);
        assert_eq!(updated.cancellation_reason.as_deref(), Some("Sold"));

        store.delete_viewing(viewing.id).unwrap();
        store.delete_viewing(viewing.id).unwrap();
        assert!(store.get_viewing(viewing.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_property_cascades() {
        let store = InMemoryStore::new();
        let property = listing(&store);
        store.add_image(property.id, "https://img/a.jpg", None).unwrap();
        store.add_favorite(UserId(99), property.id).unwrap();

        store.delete_property(property.id).unwrap();

        assert!(store.list_images(property.id).unwrap().is_empty());
        assert!(store.list_favorites(UserId(99)).unwrap().is_empty());
    }
}
