// 👤 User entity

use crate::attributes::AttributeDefinition;
use serde::{Deserialize, Serialize};

/// Declared fields of a User, in display order
pub const SCHEMA: &[AttributeDefinition] = &[
    AttributeDefinition::string("email"),
    AttributeDefinition::string("password"),
    AttributeDefinition::string("first_name"),
    AttributeDefinition::string("last_name"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}
