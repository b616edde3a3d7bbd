//! Database entity and view models used by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A catalog row as stored. The upstream catalog omits attributes per beer,
/// so every field is independently nullable and absence is preserved as-is
/// rather than collapsed into defaults.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Beer {
    pub id: Option<String>,
    pub name: Option<String>,
    pub style: Option<String>,
    pub description: Option<String>,
    pub abv: Option<f64>,
    pub ibu: Option<i64>,
    pub bp_verified: Option<bool>,
    pub brewer_verified: Option<bool>,
    pub last_modified: Option<i64>,
    pub brewer_id: Option<String>,
}

/// Client-facing projection of [`Beer`]. Fields absent on the row disappear
/// from the serialized object entirely instead of surfacing as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeerView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ibu: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bp_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brewer_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brewer_id: Option<String>,
}

/// A brewer row as stored. Written by the import tooling, never read by the
/// service itself.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Brewer {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub url: Option<String>,
    pub bp_verified: Option<bool>,
    pub brewer_verified: Option<bool>,
    pub facebook_url: Option<String>,
    pub twitter_url: Option<String>,
    pub instagram_url: Option<String>,
    pub last_modified: Option<i64>,
}

impl From<Beer> for BeerView {
    fn from(beer: Beer) -> Self {
        Self {
            id: beer.id,
            name: beer.name,
            style: beer.style,
            description: beer.description,
            abv: beer.abv,
            ibu: beer.ibu,
            bp_verified: beer.bp_verified,
            brewer_verified: beer.brewer_verified,
            last_modified: beer.last_modified,
            brewer_id: beer.brewer_id,
        }
    }
}
