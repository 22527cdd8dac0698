// 🏛️ Attribute Schema - declared types per entity kind
// Used to coerce raw command-line input into the type a field expects.

use crate::entities::Kind;
use crate::error::CommandError;
use crate::literal;
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// ATTRIBUTE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Integer,
    Float,
    List,
}

impl AttributeType {
    /// Whether dictionary updates convert values into this type.
    /// List values from a dictionary are stored exactly as written.
    pub fn converts_dict_values(&self) -> bool {
        !matches!(self, AttributeType::List)
    }

    /// Convert `value` into this type.
    ///
    /// Strings parse into numbers, numbers render into strings, and list
    /// fields accept an array, a `[...]` literal, or a single scalar.
    pub fn coerce(&self, field: &str, value: &Value) -> Result<Value, CommandError> {
        let invalid = || CommandError::InvalidValue {
            field: field.to_string(),
        };

        match self {
            AttributeType::String => Ok(match value {
                Value::String(s) => Value::String(s.clone()),
                other => Value::String(literal::render(other)),
            }),
            AttributeType::Integer => match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                    .map(Value::from)
                    .ok_or_else(invalid),
                Value::Bool(b) => Ok(Value::from(i64::from(*b))),
                Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| invalid()),
                _ => Err(invalid()),
            },
            AttributeType::Float => {
                let f = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                f.and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(invalid)
            }
            AttributeType::List => {
                let items = match value {
                    Value::Array(items) => items.clone(),
                    Value::String(s) if s.trim_start().starts_with('[') => {
                        literal::parse_list(s).map_err(|_| invalid())?
                    }
                    Value::Null => Vec::new(),
                    other => vec![other.clone()],
                };
                Ok(Value::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => Value::String(s),
                            other => Value::String(literal::render(&other)),
                        })
                        .collect(),
                ))
            }
        }
    }
}

// ============================================================================
// ATTRIBUTE DEFINITION
// ============================================================================

/// One declared field of an entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub name: &'static str,
    pub type_: AttributeType,
}

impl AttributeDefinition {
    pub const fn new(name: &'static str, type_: AttributeType) -> Self {
        AttributeDefinition { name, type_ }
    }

    pub const fn string(name: &'static str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, AttributeType::Integer)
    }

    pub const fn float(name: &'static str) -> Self {
        Self::new(name, AttributeType::Float)
    }

    pub const fn list(name: &'static str) -> Self {
        Self::new(name, AttributeType::List)
    }
}

// ============================================================================
// ATTRIBUTE REGISTRY
// ============================================================================

/// AttributeRegistry - declared field types of every kind
///
/// `id`, `created_at` and `updated_at` are common to all kinds and are not
/// listed here. Fields missing from the table are stored as given.
pub struct AttributeRegistry {
    attributes: HashMap<Kind, HashMap<&'static str, AttributeType>>,
}

impl AttributeRegistry {
    /// Create a registry holding the schema of all seven kinds
    pub fn new() -> Self {
        let mut registry = AttributeRegistry {
            attributes: HashMap::new(),
        };

        registry.register_core_attributes();
        registry
    }

    fn register_core_attributes(&mut self) {
        for kind in Kind::ALL {
            self.attributes.entry(kind).or_default();
            for attr in kind.schema() {
                self.register(kind, *attr);
            }
        }
    }

    /// Register a declared field for a kind
    pub fn register(&mut self, kind: Kind, attr: AttributeDefinition) {
        self.attributes
            .entry(kind)
            .or_default()
            .insert(attr.name, attr.type_);
    }

    /// Declared type of `field` on `kind`, if any
    pub fn type_of(&self, kind: Kind, field: &str) -> Option<AttributeType> {
        self.attributes
            .get(&kind)
            .and_then(|fields| fields.get(field))
            .copied()
    }
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
