// ⭐ Review entity - written by a User about a Place

use crate::attributes::AttributeDefinition;
use serde::{Deserialize, Serialize};

pub const SCHEMA: &[AttributeDefinition] = &[
    AttributeDefinition::string("place_id"),
    AttributeDefinition::string("user_id"),
    AttributeDefinition::string("text"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    pub place_id: String,
    pub user_id: String,
    pub text: String,
}
