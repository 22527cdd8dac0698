// 🏠 Place entity - the only kind with numeric and list fields
//
// city_id, user_id and amenity_ids are soft references: nothing checks that
// the referenced entities exist, and deleting them leaves the ids dangling.

use crate::attributes::AttributeDefinition;
use serde::{Deserialize, Serialize};

/// Declared fields of a Place, in display order
pub const SCHEMA: &[AttributeDefinition] = &[
    AttributeDefinition::string("city_id"),
    AttributeDefinition::string("user_id"),
    AttributeDefinition::string("name"),
    AttributeDefinition::string("description"),
    AttributeDefinition::integer("number_rooms"),
    AttributeDefinition::integer("number_bathrooms"),
    AttributeDefinition::integer("max_guest"),
    AttributeDefinition::integer("price_by_night"),
    AttributeDefinition::float("latitude"),
    AttributeDefinition::float("longitude"),
    AttributeDefinition::list("amenity_ids"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Place {
    pub city_id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub number_rooms: i64,
    pub number_bathrooms: i64,
    pub max_guest: i64,
    pub price_by_night: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub amenity_ids: Vec<String>,
}
