// Entity Models
//
// Every stored record shares an identity (`id`, a uuid that never changes
// on its own) and two timestamps. The kind-specific fields live in a fixed
// struct per kind; anything else set on a record goes to `extra`, and so
// does a declared value the struct can't hold (it shadows the field).

pub mod amenity;
pub mod city;
pub mod place;
pub mod review;
pub mod state;
pub mod user;

pub use amenity::Amenity;
pub use city::City;
pub use place::Place;
pub use review::Review;
pub use state::State;
pub use user::User;

use crate::attributes::AttributeDefinition;
use crate::codec::{self, CLASS_KEY};
use crate::error::{CommandError, StoreError};
use crate::literal;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    BaseModel,
    User,
    State,
    City,
    Amenity,
    Place,
    Review,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::BaseModel,
        Kind::User,
        Kind::State,
        Kind::City,
        Kind::Amenity,
        Kind::Place,
        Kind::Review,
    ];

    /// Type name used in registry keys and the `__class__` tag
    pub fn name(&self) -> &'static str {
        match self {
            Kind::BaseModel => "BaseModel",
            Kind::User => "User",
            Kind::State => "State",
            Kind::City => "City",
            Kind::Amenity => "Amenity",
            Kind::Place => "Place",
            Kind::Review => "Review",
        }
    }

    /// Declared fields, in the order `describe()` lists them
    pub fn schema(&self) -> &'static [AttributeDefinition] {
        match self {
            Kind::BaseModel => &[],
            Kind::User => user::SCHEMA,
            Kind::State => state::SCHEMA,
            Kind::City => city::SCHEMA,
            Kind::Amenity => amenity::SCHEMA,
            Kind::Place => place::SCHEMA,
            Kind::Review => review::SCHEMA,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// KIND CATALOG
// ============================================================================

pub type Constructor = fn() -> Record;

/// The only kinds that can be created from input or decoded from a file
pub static KIND_CATALOG: [(&str, Constructor); 7] = [
    ("BaseModel", || Record::BaseModel),
    ("User", || Record::User(User::default())),
    ("State", || Record::State(State::default())),
    ("City", || Record::City(City::default())),
    ("Amenity", || Record::Amenity(Amenity::default())),
    ("Place", || Record::Place(Place::default())),
    ("Review", || Record::Review(Review::default())),
];

/// Name → constructor table
pub fn kind_catalog() -> &'static [(&'static str, Constructor)] {
    &KIND_CATALOG
}

/// Look up a kind by its exact type name
pub fn resolve_kind(name: &str) -> Option<Kind> {
    KIND_CATALOG
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, construct)| construct().kind())
}

// ============================================================================
// RECORD (kind-specific fields)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    BaseModel,
    User(User),
    State(State),
    City(City),
    Amenity(Amenity),
    Place(Place),
    Review(Review),
}

impl Record {
    /// Record with every field at its default value
    pub fn empty(kind: Kind) -> Record {
        match kind {
            Kind::BaseModel => Record::BaseModel,
            Kind::User => Record::User(User::default()),
            Kind::State => Record::State(State::default()),
            Kind::City => Record::City(City::default()),
            Kind::Amenity => Record::Amenity(Amenity::default()),
            Kind::Place => Record::Place(Place::default()),
            Kind::Review => Record::Review(Review::default()),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Record::BaseModel => Kind::BaseModel,
            Record::User(_) => Kind::User,
            Record::State(_) => Kind::State,
            Record::City(_) => Kind::City,
            Record::Amenity(_) => Kind::Amenity,
            Record::Place(_) => Kind::Place,
            Record::Review(_) => Kind::Review,
        }
    }

    /// Declared fields as a JSON object
    pub fn fields(&self) -> Map<String, Value> {
        match self {
            Record::BaseModel => Map::new(),
            Record::User(r) => to_fields(r),
            Record::State(r) => to_fields(r),
            Record::City(r) => to_fields(r),
            Record::Amenity(r) => to_fields(r),
            Record::Place(r) => to_fields(r),
            Record::Review(r) => to_fields(r),
        }
    }

    /// Build a record of `kind` from declared fields; missing ones default
    pub fn from_fields(kind: Kind, fields: Map<String, Value>) -> Result<Record, serde_json::Error> {
        let value = Value::Object(fields);
        Ok(match kind {
            Kind::BaseModel => Record::BaseModel,
            Kind::User => Record::User(from_fields(value)?),
            Kind::State => Record::State(from_fields(value)?),
            Kind::City => Record::City(from_fields(value)?),
            Kind::Amenity => Record::Amenity(from_fields(value)?),
            Kind::Place => Record::Place(from_fields(value)?),
            Kind::Review => Record::Review(from_fields(value)?),
        })
    }
}

fn to_fields<T: Serialize>(record: &T) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn from_fields<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(value)
}

/// Registry key of an entity: `"<Kind>.<id>"`
pub fn registry_key(kind: Kind, id: &str) -> String {
    format!("{}.{}", kind.name(), id)
}

// ============================================================================
// ENTITY
// ============================================================================

/// One stored record
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Stable identity (uuid v4), unique across all kinds
    pub id: String,
    /// Set once when the entity is first created
    pub created_at: NaiveDateTime,
    /// Refreshed on every mutation
    pub updated_at: NaiveDateTime,
    /// Kind-specific fields
    pub record: Record,
    /// Attributes outside the kind's schema, plus declared fields whose
    /// stored value doesn't fit the field's Rust type
    pub extra: BTreeMap<String, Value>,
}

impl Entity {
    /// Fresh entity with a new id and "now" timestamps (not yet registered)
    pub fn new(kind: Kind) -> Self {
        let now = codec::now();

        Entity {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            record: Record::empty(kind),
            extra: BTreeMap::new(),
        }
    }

    /// Rebuild an entity from a persisted attribute map.
    ///
    /// The kind tag itself is ignored here; the caller resolved it already.
    pub fn reconstruct(kind: Kind, attributes: &Map<String, Value>) -> Result<Self, StoreError> {
        let id = attributes
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode {
                key: format!("{}.?", kind.name()),
                reason: "missing id".to_string(),
            })?
            .to_string();

        let key = registry_key(kind, &id);
        let timestamp = |field: &str| -> Result<NaiveDateTime, StoreError> {
            match attributes.get(field) {
                Some(Value::String(text)) => codec::parse_timestamp(field, text),
                Some(other) => Err(StoreError::Timestamp {
                    field: field.to_string(),
                    value: other.to_string(),
                }),
                None => Err(StoreError::Decode {
                    key: key.clone(),
                    reason: format!("missing {}", field),
                }),
            }
        };
        let created_at = timestamp("created_at")?;
        let updated_at = timestamp("updated_at")?;

        let mut entity = Entity {
            id,
            created_at,
            updated_at,
            record: Record::empty(kind),
            extra: BTreeMap::new(),
        };
        for (name, value) in attributes {
            if matches!(name.as_str(), "id" | "created_at" | "updated_at" | CLASS_KEY) {
                continue;
            }
            if entity.is_declared(name) {
                entity.store_declared(name, value.clone());
            } else {
                entity.extra.insert(name.clone(), value.clone());
            }
        }

        Ok(entity)
    }

    pub fn kind(&self) -> Kind {
        self.record.kind()
    }

    pub fn key(&self) -> String {
        registry_key(self.kind(), &self.id)
    }

    /// Attribute map as persisted: kind tag, identity, timestamps, fields, extras
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.attributes();
        map.insert(CLASS_KEY.to_string(), Value::String(self.kind().name().to_string()));
        map
    }

    /// Every attribute except the kind tag
    fn attributes(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert(
            "created_at".to_string(),
            Value::String(codec::format_timestamp(&self.created_at)),
        );
        map.insert(
            "updated_at".to_string(),
            Value::String(codec::format_timestamp(&self.updated_at)),
        );
        map.extend(self.record.fields());
        for (name, value) in &self.extra {
            map.insert(name.clone(), value.clone());
        }
        map
    }

    /// Human-readable form: `[Kind] (id) {'id': ..., ...}`
    ///
    /// Identity and timestamps come first, then declared fields in schema
    /// order, then extras by name.
    pub fn describe(&self) -> String {
        let mut attributes = self.attributes();
        let mut ordered: Vec<(String, Value)> = Vec::with_capacity(attributes.len());

        let leading = ["id", "created_at", "updated_at"];
        let declared = self.kind().schema().iter().map(|attr| attr.name);
        for name in leading.into_iter().chain(declared) {
            if let Some(value) = attributes.remove(name) {
                ordered.push((name.to_string(), value));
            }
        }
        ordered.extend(self.extra.keys().filter_map(|name| {
            attributes.remove(name).map(|value| (name.clone(), value))
        }));

        let body: Vec<String> = ordered
            .iter()
            .map(|(name, value)| format!("'{}': {}", name, literal::render(value)))
            .collect();

        format!("[{}] ({}) {{{}}}", self.kind().name(), self.id, body.join(", "))
    }

    /// Refresh `updated_at`; persisting is the registry's job
    pub fn touch(&mut self) {
        self.updated_at = codec::now();
    }

    /// Current value of any attribute, rendered as JSON
    pub fn get_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "created_at" => Some(Value::String(codec::format_timestamp(&self.created_at))),
            "updated_at" => Some(Value::String(codec::format_timestamp(&self.updated_at))),
            _ => self
                .extra
                .get(name)
                .cloned()
                .or_else(|| self.record.fields().remove(name)),
        }
    }

    /// Set an attribute by name.
    ///
    /// Values are stored as given; converting input is the caller's job.
    /// `id` and the timestamps may be overwritten; the kind tag may not.
    pub fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), CommandError> {
        let invalid = || CommandError::InvalidValue {
            field: name.to_string(),
        };

        match name {
            CLASS_KEY => Err(CommandError::ReservedAttribute),
            "id" => {
                self.id = match value {
                    Value::String(s) => s,
                    other => literal::render(&other),
                };
                Ok(())
            }
            "created_at" | "updated_at" => {
                let text = value.as_str().ok_or_else(invalid)?;
                let time = codec::parse_timestamp(name, text).map_err(|_| invalid())?;
                if name == "created_at" {
                    self.created_at = time;
                } else {
                    self.updated_at = time;
                }
                Ok(())
            }
            _ if self.is_declared(name) => {
                self.store_declared(name, value);
                Ok(())
            }
            _ => {
                self.extra.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.kind().schema().iter().any(|attr| attr.name == name)
    }

    /// Put a declared field's value into the record, or into `extra` if the
    /// record's field type can't hold it. The record field then falls back
    /// to its default so equal attribute maps give equal entities.
    fn store_declared(&mut self, name: &str, value: Value) {
        let kind = self.kind();
        let mut fields = self.record.fields();
        fields.insert(name.to_string(), value.clone());

        match Record::from_fields(kind, fields.clone()) {
            Ok(record) => {
                self.record = record;
                self.extra.remove(name);
            }
            Err(_) => {
                fields.remove(name);
                if let Ok(record) = Record::from_fields(kind, fields) {
                    self.record = record;
                }
                self.extra.insert(name.to_string(), value);
            }
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_entity_creation() {
        let entity = Entity::new(Kind::State);

        assert!(!entity.id.is_empty());
        assert_eq!(entity.kind(), Kind::State);
        assert_eq!(entity.created_at, entity.updated_at);
        assert_eq!(entity.key(), format!("State.{}", entity.id));
        assert_eq!(entity.get_attribute("name"), Some(json!("")));
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..100).map(|_| Entity::new(Kind::User).id).collect();
        assert_eq!(ids.len(), 100, "Every entity should get its own id");
    }

    #[test]
    fn test_catalog_resolves_all_kinds() {
        assert_eq!(kind_catalog().len(), 7);
        for kind in Kind::ALL {
            assert_eq!(resolve_kind(kind.name()), Some(kind));
        }
        assert_eq!(resolve_kind("Dragon"), None);
        assert_eq!(resolve_kind("state"), None, "Names are case-sensitive");
    }

    #[test]
    fn test_round_trip_every_kind() {
        for kind in Kind::ALL {
            let mut entity = Entity::new(kind);
            entity.extra.insert("note".to_string(), json!("kept"));

            let rebuilt = Entity::reconstruct(kind, &entity.to_map()).unwrap();
            assert_eq!(rebuilt, entity, "Round trip failed for {}", kind);
        }
    }

    #[test]
    fn test_round_trip_place_with_values() {
        let mut place = Entity::new(Kind::Place);
        place.set_attribute("max_guest", json!(4)).unwrap();
        place.set_attribute("latitude", json!(37.77)).unwrap();
        place.set_attribute("amenity_ids", json!(["a", "b"])).unwrap();
        place.set_attribute("name", json!("Loft")).unwrap();

        let rebuilt = Entity::reconstruct(Kind::Place, &place.to_map()).unwrap();
        assert_eq!(rebuilt, place);
        assert_eq!(rebuilt.get_attribute("max_guest"), Some(json!(4)));
    }

    #[test]
    fn test_to_map_contains_tag_and_timestamps() {
        let entity = Entity::new(Kind::Review);
        let map = entity.to_map();

        assert_eq!(map.get(CLASS_KEY), Some(&json!("Review")));
        assert_eq!(map.get("id"), Some(&json!(entity.id)));
        assert_eq!(
            map.get("created_at"),
            Some(&json!(codec::format_timestamp(&entity.created_at)))
        );
        assert!(map.contains_key("place_id"));
        assert!(map.contains_key("text"));
    }

    #[test]
    fn test_describe_format() {
        let mut state = Entity::new(Kind::State);
        state.set_attribute("name", json!("California")).unwrap();
        state.set_attribute("motto", json!("Eureka")).unwrap();

        let text = state.describe();
        let expected_prefix = format!("[State] ({}) {{'id': '{}', 'created_at': '", state.id, state.id);
        assert!(text.starts_with(&expected_prefix), "Unexpected describe: {}", text);
        assert!(text.ends_with("'name': 'California', 'motto': 'Eureka'}"), "Unexpected describe: {}", text);
        assert_eq!(state.to_string(), text);
    }

    #[test]
    fn test_set_declared_field_keeps_value_as_given() {
        let mut place = Entity::new(Kind::Place);
        place.set_attribute("amenity_ids", json!([1, 2])).unwrap();
        assert_eq!(place.get_attribute("amenity_ids"), Some(json!([1, 2])));
        assert!(place.describe().contains("'amenity_ids': [1, 2]"));

        place.set_attribute("amenity_ids", json!(["a"])).unwrap();
        assert_eq!(place.get_attribute("amenity_ids"), Some(json!(["a"])));
        assert!(place.extra.is_empty(), "A fitting value goes back into the record");
    }

    #[test]
    fn test_off_type_value_round_trips() {
        let mut place = Entity::new(Kind::Place);
        place.set_attribute("max_guest", json!("four")).unwrap();
        assert_eq!(place.get_attribute("max_guest"), Some(json!("four")));

        let map = place.to_map();
        assert_eq!(map.get("max_guest"), Some(&json!("four")));
        let rebuilt = Entity::reconstruct(Kind::Place, &map).unwrap();
        assert_eq!(rebuilt, place);
    }

    #[test]
    fn test_set_identity_and_timestamps() {
        let mut user = Entity::new(Kind::User);
        user.set_attribute("id", json!("custom-id")).unwrap();
        assert_eq!(user.id, "custom-id");

        user.set_attribute("created_at", json!("2017-09-28T21:05:54.119427")).unwrap();
        assert_eq!(
            user.get_attribute("created_at"),
            Some(json!("2017-09-28T21:05:54.119427"))
        );

        assert!(user.set_attribute("updated_at", json!("soon")).is_err());
        assert_eq!(
            user.set_attribute(CLASS_KEY, json!("State")),
            Err(CommandError::ReservedAttribute)
        );
    }

    #[test]
    fn test_touch_moves_updated_at_forward() {
        let mut entity = Entity::new(Kind::Amenity);
        let before = entity.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        entity.touch();

        assert!(entity.updated_at > before);
        assert_eq!(entity.created_at, before, "created_at never changes");
    }

    #[test]
    fn test_reconstruct_takes_declared_values_verbatim() {
        let attributes = json!({
            "__class__": "Place",
            "id": "p1",
            "created_at": "2017-09-28T21:05:54.119427",
            "updated_at": "2017-09-28T21:05:54.119427",
            "number_rooms": "",
            "max_guest": 4,
            "name": "Loft"
        });
        let place = Entity::reconstruct(Kind::Place, attributes.as_object().unwrap()).unwrap();
        assert_eq!(place.get_attribute("number_rooms"), Some(json!("")));
        assert_eq!(place.get_attribute("max_guest"), Some(json!(4)));
        assert_eq!(place.get_attribute("name"), Some(json!("Loft")));
    }

    #[test]
    fn test_reconstruct_missing_timestamp_reason() {
        let attributes = json!({
            "__class__": "Place",
            "id": "p1",
            "created_at": "2017-09-28T21:05:54.119427"
        });
        let err = Entity::reconstruct(Kind::Place, attributes.as_object().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Decode { ref key, ref reason } if key == "Place.p1" && reason == "missing updated_at"
        ));
        assert!(!err.to_string().contains("**"), "Store errors carry no shell markers");
    }
}
