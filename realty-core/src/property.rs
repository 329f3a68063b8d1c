//! Property listings and their images

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default page size for property browsing
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest page a caller may request
pub const MAX_PAGE_SIZE: usize = 100;

/// Market status of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Available,
    Pending,
    Sold,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Available => "available",
            PropertyStatus::Pending => "pending",
            PropertyStatus::Sold => "sold",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "available" => Ok(PropertyStatus::Available),
            "pending" => Ok(PropertyStatus::Pending),
            "sold" => Ok(PropertyStatus::Sold),
            other => Err(Error::UnknownVariant {
                kind: "property status",
                value: other.to_string(),
            }),
        }
    }
}

/// A property listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub property_type: String,
    /// Whole currency units
    pub price: i64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub square_feet: Option<u32>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub status: PropertyStatus,
    pub amenities: Vec<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Short human label used in notifications
    pub fn label(&self) -> String {
        if self.address.is_empty() {
            self.title.clone()
        } else {
            format!("{} ({})", self.title, self.address)
        }
    }
}

/// An image attached to a property. `display_order` is unique per property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyImage {
    pub id: i64,
    pub property_id: i64,
    pub url: String,
    pub caption: Option<String>,
    pub display_order: u32,
}

/// Fields for a new listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub property_type: String,
    pub price: i64,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default)]
    pub square_feet: Option<u32>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

impl PropertyInput {
    pub fn validate(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(Error::Validation("title is required".into()));
        }
        if self.price < 0 {
            return Err(Error::Validation("price cannot be negative".into()));
        }
        self.amenities = normalize_amenities(self.amenities);
        Ok(self)
    }
}

/// Partial update of a listing; unset fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub price: Option<i64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub square_feet: Option<u32>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub status: Option<PropertyStatus>,
    pub amenities: Option<Vec<String>>,
    pub featured: Option<bool>,
}

impl PropertyUpdate {
    /// Apply onto an existing listing, validating the result
    pub fn apply(self, property: &mut Property, now: DateTime<Utc>) -> Result<()> {
        if let Some(title) = self.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(Error::Validation("title is required".into()));
            }
            property.title = title;
        }
        if let Some(price) = self.price {
            if price < 0 {
                return Err(Error::Validation("price cannot be negative".into()));
            }
            property.price = price;
        }
        if let Some(v) = self.description {
            property.description = v;
        }
        if let Some(v) = self.property_type {
            property.property_type = v;
        }
        if let Some(v) = self.bedrooms {
            property.bedrooms = v;
        }
        if let Some(v) = self.bathrooms {
            property.bathrooms = v;
        }
        if self.square_feet.is_some() {
            property.square_feet = self.square_feet;
        }
        if let Some(v) = self.address {
            property.address = v;
        }
        if let Some(v) = self.city {
            property.city = v;
        }
        if let Some(v) = self.state {
            property.state = v;
        }
        if let Some(v) = self.zip_code {
            property.zip_code = v;
        }
        if let Some(v) = self.status {
            property.status = v;
        }
        if let Some(v) = self.amenities {
            property.amenities = normalize_amenities(v);
        }
        if let Some(v) = self.featured {
            property.featured = v;
        }
        property.updated_at = now;
        Ok(())
    }
}

fn normalize_amenities(amenities: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for amenity in amenities {
        let amenity = amenity.trim().to_lowercase();
        if !amenity.is_empty() && !out.contains(&amenity) {
            out.push(amenity);
        }
    }
    out
}

/// Browse filter for listings. Also the payload of a saved search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PropertyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_bathrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        if let Some(status) = self.status {
            if property.status != status {
                return false;
            }
        }
        if let Some(kind) = non_blank(&self.property_type) {
            if !property.property_type.eq_ignore_ascii_case(kind) {
                return false;
            }
        }
        if let Some(city) = non_blank(&self.city) {
            if !property.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if property.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if property.price > max {
                return false;
            }
        }
        if let Some(min) = self.min_bedrooms {
            if property.bedrooms < min {
                return false;
            }
        }
        if let Some(min) = self.min_bathrooms {
            if property.bathrooms < min {
                return false;
            }
        }
        if let Some(featured) = self.featured {
            if property.featured != featured {
                return false;
            }
        }
        let wanted = self
            .amenities
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty());
        for amenity in wanted {
            if !property.amenities.contains(&amenity) {
                return false;
            }
        }
        if let Some(query) = non_blank(&self.search_query) {
            let needle = query.to_lowercase();
            let haystack = [
                &property.title,
                &property.description,
                &property.address,
                &property.city,
                &property.state,
                &property.zip_code,
            ];
            if !haystack.iter().any(|f| f.to_lowercase().contains(&needle)) {
                return false;
            }
        }
        true
    }

    /// Filter, order newest first and paginate
    pub fn apply(&self, mut properties: Vec<Property>) -> Vec<Property> {
        properties.retain(|p| self.matches(p));
        properties.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0);
        properties.into_iter().skip(offset).take(limit).collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Check a requested image order against the property's current images.
///
/// The request must name every current image exactly once. Returns
/// `(image_id, display_order)` pairs to write.
pub fn plan_reorder(current: &[PropertyImage], requested: &[i64]) -> Result<Vec<(i64, u32)>> {
    if requested.len() != current.len() {
        return Err(Error::Validation(
            "image order must list every image of the property".into(),
        ));
    }

    let mut seen = Vec::with_capacity(requested.len());
    for id in requested {
        if seen.contains(id) {
            return Err(Error::Validation(format!("image {} listed twice", id)));
        }
        if !current.iter().any(|img| img.id == *id) {
            return Err(Error::Validation(format!(
                "image {} does not belong to this property",
                id
            )));
        }
        seen.push(*id);
    }

    Ok(requested
        .iter()
        .enumerate()
        .map(|(position, id)| (*id, position as u32))
        .collect())
}

/// Display order for an image appended after `current`
pub fn next_display_order(current: &[PropertyImage]) -> u32 {
    current
        .iter()
        .map(|img| img.display_order + 1)
        .max()
        .unwrap_or(0)
}
