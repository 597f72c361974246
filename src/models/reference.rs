//! Reference data shared by many reviews.
//!
//! Both entities carry ids assigned by the upstream review system. They are
//! never generated locally, and once created they are only ever read.

use serde::{Deserialize, Serialize};

/// A site or company that publishes ratings (e.g. a booking platform).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingProvider {
    /// Upstream provider id.
    pub id: i64,
    /// Display name as shown in the export.
    pub name: String,
}

impl RatingProvider {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A reviewed hotel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Upstream hotel id.
    pub id: i64,
    /// Hotel name, when the export carries one.
    pub name: Option<String>,
}

impl Property {
    pub fn new(id: i64, name: Option<String>) -> Self {
        Self { id, name }
    }
}
