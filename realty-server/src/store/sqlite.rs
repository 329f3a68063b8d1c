//! SQLite-based storage implementation

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use realty_core::property::{next_display_order, plan_reorder, PropertyImage, PropertyInput, PropertyUpdate};
use realty_core::viewing::{sort_for_listing, ViewingDraft};
use realty_core::{Property, PropertyFilter, PropertyStatus, Role, Viewing, ViewingFilter, ViewingStatus};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    CollectionStore, ComparisonEntry, Favorite, PropertyStore, SavedSearch, StoreResult,
    UpsertUser, User, UserId, UserStore, ViewingStore,
};
use crate::error::AppError;

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

const USER_COLUMNS: &str = "id, open_id, name, email, phone, password_hash, login_method, role, \
     created_at, updated_at, last_signed_in";

const PROPERTY_COLUMNS: &str = "id, title, description, property_type, price, bedrooms, bathrooms, \
     square_feet, address, city, state, zip_code, status, amenities, featured, created_at, updated_at";

const VIEWING_COLUMNS: &str = "id, property_id, visitor_name, visitor_email, visitor_phone, \
     viewing_date, viewing_time, duration, notes, status, cancellation_reason, created_at, updated_at";

/// SQLite-based store implementing every store trait
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, AppError> {
        let conn = Connection::open(path)?;

        // Enable foreign keys
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Run migrations
        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), AppError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }
            if current_version < 2 {
                Self::migrate_v2(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, AppError> {
        let table_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })?)
    }

    /// Migration to version 2: indexes behind the status filters of admin listings
    fn migrate_v2(conn: &Connection) -> Result<(), AppError> {
        conn.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS idx_viewings_status ON viewings(status, property_id);
            CREATE INDEX IF NOT EXISTS idx_properties_status ON properties(status, price);
            "#,
        )?;
        Ok(())
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), AppError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                open_id TEXT NOT NULL UNIQUE,
                name TEXT,
                email TEXT,
                phone TEXT,
                password_hash TEXT,
                login_method TEXT,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_signed_in TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email COLLATE NOCASE);

            CREATE TABLE IF NOT EXISTS properties (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                property_type TEXT NOT NULL DEFAULT '',
                price INTEGER NOT NULL,
                bedrooms INTEGER NOT NULL DEFAULT 0,
                bathrooms INTEGER NOT NULL DEFAULT 0,
                square_feet INTEGER,
                address TEXT NOT NULL DEFAULT '',
                city TEXT NOT NULL DEFAULT '',
                state TEXT NOT NULL DEFAULT '',
                zip_code TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'available',
                amenities TEXT NOT NULL DEFAULT '[]',
                featured INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- display_order is unique per property
            CREATE TABLE IF NOT EXISTS property_images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                property_id INTEGER NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
                url TEXT NOT NULL,
                caption TEXT,
                display_order INTEGER NOT NULL,
                UNIQUE (property_id, display_order)
            );

            CREATE TABLE IF NOT EXISTS viewings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                property_id INTEGER NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
                visitor_name TEXT NOT NULL,
                visitor_email TEXT NOT NULL,
                visitor_phone TEXT,
                viewing_date TEXT NOT NULL,
                viewing_time TEXT NOT NULL,
                duration INTEGER NOT NULL,
                notes TEXT,
                status TEXT NOT NULL DEFAULT 'scheduled',
                cancellation_reason TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_viewings_property ON viewings(property_id);

            CREATE TABLE IF NOT EXISTS favorites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                property_id INTEGER NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                UNIQUE (user_id, property_id)
            );

            CREATE TABLE IF NOT EXISTS saved_searches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                filter TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS comparison_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                property_id INTEGER NOT NULL REFERENCES properties(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                UNIQUE (user_id, property_id)
            );
            "#,
        )?;

        Ok(())
    }
}

/// Wrap a decode failure so it surfaces as a column conversion error
fn conversion<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn time_col(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(7)?;
    Ok(User {
        id: UserId(row.get(0)?),
        open_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        password_hash: row.get(5)?,
        login_method: row.get(6)?,
        role: Role::parse(&role).map_err(|e| conversion(7, e))?,
        created_at: time_col(row, 8)?,
        updated_at: time_col(row, 9)?,
        last_signed_in: time_col(row, 10)?,
    })
}

fn property_from_row(row: &Row) -> rusqlite::Result<Property> {
    let status: String = row.get(12)?;
    let amenities: String = row.get(13)?;
    let featured: i32 = row.get(14)?;
    Ok(Property {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        property_type: row.get(3)?,
        price: row.get(4)?,
        bedrooms: row.get(5)?,
        bathrooms: row.get(6)?,
        square_feet: row.get(7)?,
        address: row.get(8)?,
        city: row.get(9)?,
        state: row.get(10)?,
        zip_code: row.get(11)?,
        status: PropertyStatus::parse(&status).map_err(|e| conversion(12, e))?,
        amenities: serde_json::from_str(&amenities).map_err(|e| conversion(13, e))?,
        featured: featured != 0,
        created_at: time_col(row, 15)?,
        updated_at: time_col(row, 16)?,
    })
}

fn image_from_row(row: &Row) -> rusqlite::Result<PropertyImage> {
    Ok(PropertyImage {
        id: row.get(0)?,
        property_id: row.get(1)?,
        url: row.get(2)?,
        caption: row.get(3)?,
        display_order: row.get(4)?,
    })
}

fn viewing_from_row(row: &Row) -> rusqlite::Result<Viewing> {
    let status: String = row.get(9)?;
    Ok(Viewing {
        id: row.get(0)?,
        property_id: row.get(1)?,
        visitor_name: row.get(2)?,
        visitor_email: row.get(3)?,
        visitor_phone: row.get(4)?,
        viewing_date: time_col(row, 5)?,
        viewing_time: row.get(6)?,
        duration: row.get(7)?,
        notes: row.get(8)?,
        status: ViewingStatus::parse(&status).map_err(|e| conversion(9, e))?,
        cancellation_reason: row.get(10)?,
        created_at: time_col(row, 11)?,
        updated_at: time_col(row, 12)?,
    })
}

fn favorite_from_row(row: &Row) -> rusqlite::Result<Favorite> {
    Ok(Favorite {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        property_id: row.get(2)?,
        created_at: time_col(row, 3)?,
    })
}

fn comparison_from_row(row: &Row) -> rusqlite::Result<ComparisonEntry> {
    Ok(ComparisonEntry {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        property_id: row.get(2)?,
        created_at: time_col(row, 3)?,
    })
}

fn saved_search_from_row(row: &Row) -> rusqlite::Result<SavedSearch> {
    let filter: String = row.get(3)?;
    Ok(SavedSearch {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        name: row.get(2)?,
        filter: serde_json::from_str(&filter).map_err(|e| conversion(3, e))?,
        created_at: time_col(row, 4)?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(e.to_string()))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl SqliteStore {
    fn query_user(&self, sql: &str, key: &str) -> StoreResult<Option<User>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(sql, params![key], user_from_row)
            .optional()?)
    }

    fn images_for(conn: &Connection, property_id: i64) -> StoreResult<Vec<PropertyImage>> {
        let mut stmt = conn.prepare(
            "SELECT id, property_id, url, caption, display_order FROM property_images
             WHERE property_id = ?1 ORDER BY display_order",
        )?;
        let images = stmt
            .query_map(params![property_id], image_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(images)
    }

    fn property_exists(conn: &Connection, property_id: i64) -> StoreResult<bool> {
        Ok(conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM properties WHERE id = ?1)",
            params![property_id],
            |row| row.get(0),
        )?)
    }
}

impl UserStore for SqliteStore {
    fn upsert_user(&self, user: UpsertUser) -> StoreResult<User> {
        {
            let conn = self.conn()?;
            let now = Utc::now().to_rfc3339();

            // NULL parameters keep the stored value on conflict
            conn.execute(
                "INSERT INTO users (open_id, name, email, phone, password_hash, login_method, role,
                                    created_at, updated_at, last_signed_in)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, 'user'), ?8, ?8, ?8)
                 ON CONFLICT(open_id) DO UPDATE SET
                    name = COALESCE(?2, users.name),
                    email = COALESCE(?3, users.email),
                    phone = COALESCE(?4, users.phone),
                    password_hash = COALESCE(?5, users.password_hash),
                    login_method = COALESCE(?6, users.login_method),
                    role = COALESCE(?7, users.role),
                    updated_at = ?8,
                    last_signed_in = ?8",
                params![
                    user.open_id,
                    user.name,
                    user.email,
                    user.phone,
                    user.password_hash,
                    user.login_method,
                    user.role.map(|r| r.as_str()),
                    now,
                ],
            )?;
        }

        self.get_user_by_open_id(&user.open_id)?
            .ok_or_else(|| AppError::Internal("upserted user vanished".to_string()))
    }

    fn get_user_by_open_id(&self, open_id: &str) -> StoreResult<Option<User>> {
        self.query_user(
            &format!("SELECT {} FROM users WHERE open_id = ?1", USER_COLUMNS),
            open_id,
        )
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.query_user(
            &format!(
                "SELECT {} FROM users WHERE email = ?1 COLLATE NOCASE ORDER BY id LIMIT 1",
                USER_COLUMNS
            ),
            email,
        )
    }
}

impl PropertyStore for SqliteStore {
    fn create_property(&self, input: PropertyInput) -> StoreResult<Property> {
        let id = {
            let conn = self.conn()?;
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO properties (title, description, property_type, price, bedrooms, bathrooms,
                                         square_feet, address, city, state, zip_code, status, amenities,
                                         featured, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
                params![
                    input.title,
                    input.description,
                    input.property_type,
                    input.price,
                    input.bedrooms,
                    input.bathrooms,
                    input.square_feet,
                    input.address,
                    input.city,
                    input.state,
                    input.zip_code,
                    input.status.as_str(),
                    to_json(&input.amenities)?,
                    input.featured as i32,
                    now,
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.get_property(id)?
            .ok_or_else(|| AppError::Internal("created property vanished".to_string()))
    }

    fn get_property(&self, id: i64) -> StoreResult<Option<Property>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM properties WHERE id = ?1", PROPERTY_COLUMNS),
                params![id],
                property_from_row,
            )
            .optional()?)
    }

    fn list_properties(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>> {
        let conn = self.conn()?;
        // Indexed predicates narrow the scan; the full filter still runs below
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM properties
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR price >= ?2)
               AND (?3 IS NULL OR price <= ?3)
               AND (?4 IS NULL OR featured = ?4)",
            PROPERTY_COLUMNS
        ))?;
        let candidates = stmt
            .query_map(
                params![
                    filter.status.map(|s| s.as_str()),
                    filter.min_price,
                    filter.max_price,
                    filter.featured,
                ],
                property_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(filter.apply(candidates))
    }

    fn update_property(&self, id: i64, update: PropertyUpdate) -> StoreResult<Property> {
        let mut property = self.get_property(id)?.ok_or(AppError::NotFound("Property"))?;
        update.apply(&mut property, Utc::now())?;

        let conn = self.conn()?;
        conn.execute(
            "UPDATE properties SET title = ?1, description = ?2, property_type = ?3, price = ?4,
                bedrooms = ?5, bathrooms = ?6, square_feet = ?7, address = ?8, city = ?9, state = ?10,
                zip_code = ?11, status = ?12, amenities = ?13, featured = ?14, updated_at = ?15
             WHERE id = ?16",
            params![
                property.title,
                property.description,
                property.property_type,
                property.price,
                property.bedrooms,
                property.bathrooms,
                property.square_feet,
                property.address,
                property.city,
                property.state,
                property.zip_code,
                property.status.as_str(),
                to_json(&property.amenities)?,
                property.featured as i32,
                property.updated_at.to_rfc3339(),
                id,
            ],
        )?;

        Ok(property)
    }

    fn delete_property(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn()?;

        // Foreign keys with ON DELETE CASCADE remove images, viewings and collections
        conn.execute("DELETE FROM properties WHERE id = ?1", params![id])?;

        Ok(())
    }

    fn list_images(&self, property_id: i64) -> StoreResult<Vec<PropertyImage>> {
        let conn = self.conn()?;
        Self::images_for(&conn, property_id)
    }

    fn add_image(
        &self,
        property_id: i64,
        url: &str,
        caption: Option<&str>,
    ) -> StoreResult<PropertyImage> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if !Self::property_exists(&tx, property_id)? {
            return Err(AppError::NotFound("Property"));
        }

        let current = Self::images_for(&tx, property_id)?;
        let display_order = next_display_order(&current);

        tx.execute(
            "INSERT INTO property_images (property_id, url, caption, display_order)
             VALUES (?1, ?2, ?3, ?4)",
            params![property_id, url, caption, display_order],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(PropertyImage {
            id,
            property_id,
            url: url.to_string(),
            caption: caption.map(str::to_string),
            display_order,
        })
    }

    fn reorder_images(
        &self,
        property_id: i64,
        image_ids: &[i64],
    ) -> StoreResult<Vec<PropertyImage>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let current = Self::images_for(&tx, property_id)?;
        let plan = plan_reorder(&current, image_ids)?;

        // Park every row on a negative slot first so the unique
        // (property_id, display_order) index holds at each step
        tx.execute(
            "UPDATE property_images SET display_order = -1 - display_order WHERE property_id = ?1",
            params![property_id],
        )?;
        for (image_id, order) in plan {
            tx.execute(
                "UPDATE property_images SET display_order = ?1 WHERE id = ?2",
                params![order, image_id],
            )?;
        }

        let images = Self::images_for(&tx, property_id)?;
        tx.commit()?;
        Ok(images)
    }

    fn delete_image(&self, image_id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM property_images WHERE id = ?1", params![image_id])?;
        Ok(rows > 0)
    }
}

impl SqliteStore {
    fn query_viewings<P: rusqlite::Params>(&self, sql: &str, params: P) -> StoreResult<Vec<Viewing>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let viewings = stmt
            .query_map(params, viewing_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(viewings)
    }
}

impl ViewingStore for SqliteStore {
    fn create_viewing(&self, draft: ViewingDraft) -> StoreResult<Viewing> {
        let id = {
            let conn = self.conn()?;
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO viewings (property_id, visitor_name, visitor_email, visitor_phone,
                                       viewing_date, viewing_time, duration, notes, status,
                                       created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    draft.property_id,
                    draft.visitor_name,
                    draft.visitor_email,
                    draft.visitor_phone,
                    draft.viewing_date.to_rfc3339(),
                    draft.viewing_time,
                    draft.duration,
                    draft.notes,
                    ViewingStatus::Scheduled.as_str(),
                    now,
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    return AppError::NotFound("Property");
                }
                AppError::from(e)
            })?;
            conn.last_insert_rowid()
        };

        self.get_viewing(id)?
            .ok_or_else(|| AppError::Internal("created viewing vanished".to_string()))
    }

    fn get_viewing(&self, id: i64) -> StoreResult<Option<Viewing>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM viewings WHERE id = ?1", VIEWING_COLUMNS),
                params![id],
                viewing_from_row,
            )
            .optional()?)
    }

    fn list_viewings(&self, filter: &ViewingFilter) -> StoreResult<Vec<Viewing>> {
        let mut viewings = self.query_viewings(
            &format!(
                "SELECT {} FROM viewings
                 WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR property_id = ?2)",
                VIEWING_COLUMNS
            ),
            params![filter.status.map(|s| s.as_str()), filter.property_id],
        )?;
        viewings.retain(|v| filter.matches(v));
        sort_for_listing(&mut viewings);
        Ok(viewings)
    }

    fn list_viewings_by_email(&self, email: &str) -> StoreResult<Vec<Viewing>> {
        let mut viewings = self.query_viewings(
            &format!(
                "SELECT {} FROM viewings WHERE visitor_email = ?1 COLLATE NOCASE",
                VIEWING_COLUMNS
            ),
            params![email],
        )?;
        sort_for_listing(&mut viewings);
        Ok(viewings)
    }

    fn update_viewing_status(
        &self,
        id: i64,
        status: ViewingStatus,
        cancellation_reason: Option<&str>,
    ) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE viewings
             SET status = ?1, cancellation_reason = COALESCE(?2, cancellation_reason), updated_at = ?3
             WHERE id = ?4",
            params![status.as_str(), cancellation_reason, Utc::now().to_rfc3339(), id],
        )?;

        if rows_affected == 0 {
            return Err(AppError::NotFound("Viewing"));
        }

        Ok(())
    }

    fn delete_viewing(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM viewings WHERE id = ?1", params![id])?;
        Ok(())
    }
}

impl CollectionStore for SqliteStore {
    fn list_favorites(&self, user_id: UserId) -> StoreResult<Vec<Favorite>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, property_id, created_at FROM favorites WHERE user_id = ?1 ORDER BY id",
        )?;
        let favorites = stmt
            .query_map(params![user_id.0], favorite_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(favorites)
    }

    fn add_favorite(&self, user_id: UserId, property_id: i64) -> StoreResult<Favorite> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO favorites (user_id, property_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, property_id) DO NOTHING",
            params![user_id.0, property_id, Utc::now().to_rfc3339()],
        )?;

        Ok(conn.query_row(
            "SELECT id, user_id, property_id, created_at FROM favorites
             WHERE user_id = ?1 AND property_id = ?2",
            params![user_id.0, property_id],
            favorite_from_row,
        )?)
    }

    fn remove_favorite(&self, user_id: UserId, property_id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND property_id = ?2",
            params![user_id.0, property_id],
        )?;
        Ok(())
    }

    fn list_saved_searches(&self, user_id: UserId) -> StoreResult<Vec<SavedSearch>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, filter, created_at FROM saved_searches
             WHERE user_id = ?1 ORDER BY id",
        )?;
        let searches = stmt
            .query_map(params![user_id.0], saved_search_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(searches)
    }

    fn create_saved_search(
        &self,
        user_id: UserId,
        name: &str,
        filter: &PropertyFilter,
    ) -> StoreResult<SavedSearch> {
        let conn = self.conn()?;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO saved_searches (user_id, name, filter, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id.0, name, to_json(filter)?, created_at.to_rfc3339()],
        )?;

        Ok(SavedSearch {
            id: conn.last_insert_rowid(),
            user_id,
            name: name.to_string(),
            filter: filter.clone(),
            created_at,
        })
    }

    fn delete_saved_search(&self, user_id: UserId, id: i64) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM saved_searches WHERE id = ?1 AND user_id = ?2",
            params![id, user_id.0],
        )?;
        Ok(rows > 0)
    }

    fn list_comparison(&self, user_id: UserId) -> StoreResult<Vec<ComparisonEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, property_id, created_at FROM comparison_entries
             WHERE user_id = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![user_id.0], comparison_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn add_comparison(&self, user_id: UserId, property_id: i64) -> StoreResult<ComparisonEntry> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO comparison_entries (user_id, property_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, property_id) DO NOTHING",
            params![user_id.0, property_id, Utc::now().to_rfc3339()],
        )?;

        Ok(conn.query_row(
            "SELECT id, user_id, property_id, created_at FROM comparison_entries
             WHERE user_id = ?1 AND property_id = ?2",
            params![user_id.0, property_id],
            comparison_from_row,
        )?)
    }

    fn remove_comparison(&self, user_id: UserId, property_id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM comparison_entries WHERE user_id = ?1 AND property_id = ?2",
            params![user_id.0, property_id],
        )?;
        Ok(())
    }

    fn clear_comparison(&self, user_id: UserId) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM comparison_entries WHERE user_id = ?1",
            params![user_id.0],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use realty_core::NewViewing;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (store, dir) // Return dir to keep it alive
    }

    fn listing(store: &SqliteStore, title: &str, price: i64) -> Property {
        store
            .create_property(PropertyInput {
                title: title.into(),
                price,
                city: "Portland".into(),
                amenities: vec!["garage".into()],
                ..Default::default()
            })
            .unwrap()
    }

    fn viewing(store: &SqliteStore, property_id: i64, email: &str) -> Viewing {
        let now = Utc::now();
        let draft = NewViewing {
            property_id,
            visitor_name: "Visitor".into(),
            visitor_email: email.into(),
            viewing_date: Some(now + Duration::days(3)),
            viewing_time: "11:00".into(),
            ..Default::default()
        }
        .validate(now)
        .unwrap();
        store.create_viewing(draft).unwrap()
    }

    #[test]
    fn test_upsert_user_updates_existing() {
        let (store, _dir) = create_test_store();

        let first = store
            .upsert_user(UpsertUser {
                open_id: "oid-1".into(),
                name: Some("Old Name".into()),
                email: Some("Jane@Example.com".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(first.role, Role::User);

        let second = store
            .upsert_user(UpsertUser {
                open_id: "oid-1".into(),
                name: Some("New Name".into()),
                role: Some(Role::Admin),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.name.as_deref(), Some("New Name"));
        assert_eq!(second.email.as_deref(), Some("Jane@Example.com"));
        assert_eq!(second.role, Role::Admin);
        assert!(store.get_user_by_email("jane@example.com").unwrap().is_some());
    }

    #[test]
    fn test_property_round_trip_and_update() {
        let (store, _dir) = create_test_store();
        let property = listing(&store, "Cedar House", 350_000);

        let fetched = store.get_property(property.id).unwrap().unwrap();
        assert_eq!(fetched.amenities, vec!["garage".to_string()]);
        assert_eq!(fetched.status, PropertyStatus::Available);

        let updated = store
            .update_property(
                property.id,
                PropertyUpdate {
                    status: Some(PropertyStatus::Sold),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, PropertyStatus::Sold);

        let missing = store.update_property(9999, PropertyUpdate::default());
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_list_properties_applies_filter() {
        let (store, _dir) = create_test_store();
        listing(&store, "Cheap", 100_000);
        listing(&store, "Pricey", 900_000);

        let filter = PropertyFilter {
            max_price: Some(500_000),
            ..Default::default()
        };
        let found = store.list_properties(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Cheap");
    }

    #[test]
    fn test_reorder_images_keeps_unique_order() {
        let (store, _dir) = create_test_store();
        let property = listing(&store, "Gallery", 1);

        let a = store.add_image(property.id, "https://img/a.jpg", Some("Front")).unwrap();
        let b = store.add_image(property.id, "https://img/b.jpg", None).unwrap();
        let c = store.add_image(property.id, "https://img/c.jpg", None).unwrap();

        let images = store.reorder_images(property.id, &[c.id, a.id, b.id]).unwrap();
        let order: Vec<(i64, u32)> = images.iter().map(|i| (i.id, i.display_order)).collect();
        assert_eq!(order, vec![(c.id, 0), (a.id, 1), (b.id, 2)]);

        let bad = store.reorder_images(property.id, &[c.id, a.id]);
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_add_image_unknown_property() {
        let (store, _dir) = create_test_store();
        let result = store.add_image(42, "https://img/a.jpg", None);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_viewing_status_and_delete() {
        let (store, _dir) = create_test_store();
        let property = listing(&store, "Tour Me", 1);
        let v = viewing(&store, property.id, "visitor@example.com");

        store
            .update_viewing_status(v.id, ViewingStatus::Confirmed, None)
            .unwrap();
        let fetched = store.get_viewing(v.id).unwrap().unwrap();
        assert_eq!(fetched.status, ViewingStatus::Confirmed);

        let missing = store.update_viewing_status(777, ViewingStatus::Confirmed, None);
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        store.delete_viewing(v.id).unwrap();
        store.delete_viewing(v.id).unwrap();
        assert!(store.get_viewing(v.id).unwrap().is_none());
    }

    #[test]
    fn test_viewing_for_unknown_property_is_not_found() {
        let (store, _dir) = create_test_store();
        let now = Utc::now();
        let draft = NewViewing {
            property_id: 404,
            visitor_name: "Visitor".into(),
            visitor_email: "v@example.com".into(),
            viewing_date: Some(now + Duration::days(1)),
            viewing_time: "11:00".into(),
            ..Default::default()
        }
        .validate(now)
        .unwrap();

        assert!(matches!(
            store.create_viewing(draft),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_viewings_filter_and_email() {
        let (store, _dir) = create_test_store();
        let p1 = listing(&store, "One", 1);
        let p2 = listing(&store, "Two", 1);
        viewing(&store, p1.id, "a@example.com");
        viewing(&store, p2.id, "b@example.com");

        let filter = ViewingFilter {
            property_id: Some(p2.id),
            ..Default::default()
        };
        let found = store.list_viewings(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].visitor_email, "b@example.com");

        let mine = store.list_viewings_by_email("A@EXAMPLE.COM").unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[test]
    fn test_list_viewings_by_status_in_sql() {
        let (store, _dir) = create_test_store();
        let p1 = listing(&store, "One", 1);
        let p2 = listing(&store, "Two", 1);
        let a = viewing(&store, p1.id, "a@example.com");
        viewing(&store, p1.id, "b@example.com");
        let c = viewing(&store, p2.id, "c@example.com");
        store
            .update_viewing_status(a.id, ViewingStatus::Confirmed, None)
            .unwrap();
        store
            .update_viewing_status(c.id, ViewingStatus::Confirmed, None)
            .unwrap();

        let confirmed = ViewingFilter {
            status: Some(ViewingStatus::Confirmed),
            ..Default::default()
        };
        assert_eq!(store.list_viewings(&confirmed).unwrap().len(), 2);

        let confirmed_on_p1 = ViewingFilter {
            property_id: Some(p1.id),
            ..confirmed
        };
        let found = store.list_viewings(&confirmed_on_p1).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
    }

    #[test]
    fn test_list_properties_by_status_and_featured() {
        let (store, _dir) = create_test_store();
        let sold = listing(&store, "Sold", 300_000);
        listing(&store, "Open", 300_000);
        store
            .update_property(
                sold.id,
                PropertyUpdate {
                    status: Some(PropertyStatus::Sold),
                    featured: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let filter = PropertyFilter {
            status: Some(PropertyStatus::Sold),
            featured: Some(true),
            min_price: Some(300_000),
            ..Default::default()
        };
        let found = store.list_properties(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, sold.id);
    }

    #[test]
    fn test_migrations_record_latest_version() {
        let (store, _dir) = create_test_store();
        let conn = store.conn().unwrap();
        assert_eq!(SqliteStore::get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index'
                 AND name IN ('idx_viewings_status', 'idx_properties_status')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 2);
    }

    #[test]
    fn test_collections_are_idempotent_and_cascade() {
        let (store, _dir) = create_test_store();
        let user = store
            .upsert_user(UpsertUser {
                open_id: "collector".into(),
                ..Default::default()
            })
            .unwrap();
        let property = listing(&store, "Keeper", 1);

        let first = store.add_favorite(user.id, property.id).unwrap();
        let again = store.add_favorite(user.id, property.id).unwrap();
        assert_eq!(first.id, again.id);

        store.add_comparison(user.id, property.id).unwrap();
        store.add_comparison(user.id, property.id).unwrap();
        assert_eq!(store.list_comparison(user.id).unwrap().len(), 1);

        store.delete_property(property.id).unwrap();
        assert!(store.list_favorites(user.id).unwrap().is_empty());
        assert!(store.list_comparison(user.id).unwrap().is_empty());
    }

    #[test]
    fn test_saved_search_scoped_to_owner() {
        let (store, _dir) = create_test_store();
        let owner = store
            .upsert_user(UpsertUser {
                open_id: "owner".into(),
                ..Default::default()
            })
            .unwrap();
        let other = store
            .upsert_user(UpsertUser {
                open_id: "other".into(),
                ..Default::default()
            })
            .unwrap();

        let filter = PropertyFilter {
            min_bedrooms: Some(3),
            ..Default::default()
        };
        let search = store.create_saved_search(owner.id, "Family homes", &filter).unwrap();

        let listed = store.list_saved_searches(owner.id).unwrap();
        assert_eq!(listed[0].filter, filter);

        assert!(!store.delete_saved_search(other.id, search.id).unwrap());
        assert!(store.delete_saved_search(owner.id, search.id).unwrap());
    }
}
