// 🛁 Amenity entity

use crate::attributes::AttributeDefinition;
use serde::{Deserialize, Serialize};

pub const SCHEMA: &[AttributeDefinition] = &[AttributeDefinition::string("name")];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amenity {
    pub name: String,
}
