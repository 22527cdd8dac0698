// 🏙️ City entity - belongs to a State through `state_id` (soft reference)

use crate::attributes::AttributeDefinition;
use serde::{Deserialize, Serialize};

pub const SCHEMA: &[AttributeDefinition] = &[
    AttributeDefinition::string("state_id"),
    AttributeDefinition::string("name"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct City {
    pub state_id: String,
    pub name: String,
}
