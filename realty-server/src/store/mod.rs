//! Storage abstractions for the marketplace

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use models::*;
pub use sqlite::SqliteStore;

use realty_core::property::{PropertyImage, PropertyInput, PropertyUpdate};
use realty_core::viewing::ViewingDraft;
use realty_core::{Property, PropertyFilter, Viewing, ViewingFilter, ViewingStatus};

use crate::error::AppError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, AppError>;

/// Trait for user account storage
pub trait UserStore: Send + Sync {
    /// Insert a user or update the one with the same `open_id`.
    /// Always stamps `last_signed_in` with the current time.
    fn upsert_user(&self, user: UpsertUser) -> StoreResult<User>;

    /// Get a user by external identity
    fn get_user_by_open_id(&self, open_id: &str) -> StoreResult<Option<User>>;

    /// Get a user by email address (case-insensitive)
    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

/// Trait for property listings and their images
pub trait PropertyStore: Send + Sync {
    /// Create a listing
    fn create_property(&self, input: PropertyInput) -> StoreResult<Property>;

    /// Get a listing by ID
    fn get_property(&self, id: i64) -> StoreResult<Option<Property>>;

    /// List listings matching a filter, newest first, paginated
    fn list_properties(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>>;

    /// Apply a partial update, failing with NotFound for unknown IDs
    fn update_property(&self, id: i64, update: PropertyUpdate) -> StoreResult<Property>;

    /// Delete a listing and everything that references it
    fn delete_property(&self, id: i64) -> StoreResult<()>;

    /// Images of a listing in display order
    fn list_images(&self, property_id: i64) -> StoreResult<Vec<PropertyImage>>;

    /// Append an image after the current last one
    fn add_image(
        &self,
        property_id: i64,
        url: &str,
        caption: Option<&str>,
    ) -> StoreResult<PropertyImage>;

    /// Rewrite display order to follow `image_ids`
    fn reorder_images(&self, property_id: i64, image_ids: &[i64])
        -> StoreResult<Vec<PropertyImage>>;

    /// Delete an image, returning whether it existed
    fn delete_image(&self, image_id: i64) -> StoreResult<bool>;
}

/// Trait for viewing requests
pub trait ViewingStore: Send + Sync {
    /// Persist a validated request with status `scheduled`
    fn create_viewing(&self, draft: ViewingDraft) -> StoreResult<Viewing>;

    /// Get a viewing by ID
    fn get_viewing(&self, id: i64) -> StoreResult<Option<Viewing>>;

    /// List viewings matching a filter, latest viewing date first
    fn list_viewings(&self, filter: &ViewingFilter) -> StoreResult<Vec<Viewing>>;

    /// List viewings requested under an email address
    fn list_viewings_by_email(&self, email: &str) -> StoreResult<Vec<Viewing>>;

    /// Overwrite the status (and cancellation reason) of a viewing
    fn update_viewing_status(
        &self,
        id: i64,
        status: ViewingStatus,
        cancellation_reason: Option<&str>,
    ) -> StoreResult<()>;

    /// Delete a viewing. Unknown IDs are not an error.
    fn delete_viewing(&self, id: i64) -> StoreResult<()>;
}

/// Trait for per-user collections: favorites, saved searches, comparison list
pub trait CollectionStore: Send + Sync {
    fn list_favorites(&self, user_id: UserId) -> StoreResult<Vec<Favorite>>;

    /// Add a favorite, returning the existing entry if already present
    fn add_favorite(&self, user_id: UserId, property_id: i64) -> StoreResult<Favorite>;

    fn remove_favorite(&self, user_id: UserId, property_id: i64) -> StoreResult<()>;

    fn list_saved_searches(&self, user_id: UserId) -> StoreResult<Vec<SavedSearch>>;

    fn create_saved_search(
        &self,
        user_id: UserId,
        name: &str,
        filter: &PropertyFilter,
    ) -> StoreResult<SavedSearch>;

    /// Delete one of the user's saved searches, returning whether it existed
    fn delete_saved_search(&self, user_id: UserId, id: i64) -> StoreResult<bool>;

    fn list_comparison(&self, user_id: UserId) -> StoreResult<Vec<ComparisonEntry>>;

    /// Add to the comparison list, returning the existing entry if already present
    fn add_comparison(&self, user_id: UserId, property_id: i64) -> StoreResult<ComparisonEntry>;

    fn remove_comparison(&self, user_id: UserId, property_id: i64) -> StoreResult<()>;

    fn clear_comparison(&self, user_id: UserId) -> StoreResult<()>;
}

/// Everything the service persists
pub trait Store: UserStore + PropertyStore + ViewingStore + CollectionStore {}

impl<T> Store for T where T: UserStore + PropertyStore + ViewingStore + CollectionStore {}
