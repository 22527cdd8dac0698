// 🗄️ Object Registry
// The authoritative in-memory collection of live entities, keyed by
// "<Kind>.<id>", mirrored to a single JSON file.
//
// Built once at startup and passed by `&mut` to whoever needs it. Callers
// may mutate entities in place through `all_mut`/`get_mut`; nothing reaches
// the file until `persist()` is called.

use crate::attributes::AttributeRegistry;
use crate::codec;
use crate::entities::{self, registry_key, Constructor, Entity, Kind};
use crate::error::StoreError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Shown to the user when the backing file can't be parsed
pub const CORRUPT_FILE_NOTICE: &str = "Error: Invalid JSON data. File will be recreated.";

/// What `reload` found at the backing path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    /// No file yet; the registry is unchanged
    Missing,
    /// The file's entries replaced the registry
    Loaded(usize),
    /// The file was not valid JSON; the registry is now empty
    Discarded,
}

pub struct Registry {
    objects: BTreeMap<String, Entity>,
    path: PathBuf,
    schema: AttributeRegistry,
}

impl Registry {
    /// Empty registry backed by `path` (nothing is read yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Registry {
            objects: BTreeMap::new(),
            path: path.into(),
            schema: AttributeRegistry::new(),
        }
    }

    /// Registry backed by `path`, loaded from it if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, Reload), StoreError> {
        let mut registry = Self::new(path);
        let outcome = registry.reload()?;
        Ok((registry, outcome))
    }

    // ========================================================================
    // ACCESS
    // ========================================================================

    /// The live collection
    pub fn all(&self) -> &BTreeMap<String, Entity> {
        &self.objects
    }

    /// The live collection, mutable. Changes are in-memory until `persist()`.
    pub fn all_mut(&mut self) -> &mut BTreeMap<String, Entity> {
        &mut self.objects
    }

    pub fn get(&self, kind: Kind, id: &str) -> Option<&Entity> {
        self.objects.get(&registry_key(kind, id))
    }

    pub fn get_mut(&mut self, kind: Kind, id: &str) -> Option<&mut Entity> {
        self.objects.get_mut(&registry_key(kind, id))
    }

    pub fn contains(&self, kind: Kind, id: &str) -> bool {
        self.objects.contains_key(&registry_key(kind, id))
    }

    /// Entities of one kind (or all of them), in registry order
    pub fn instances(&self, kind: Option<Kind>) -> impl Iterator<Item = &Entity> {
        self.objects
            .values()
            .filter(move |entity| kind.map_or(true, |k| entity.kind() == k))
    }

    /// Count entities of one kind (or all of them)
    pub fn count(&self, kind: Option<Kind>) -> usize {
        self.instances(kind).count()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Insert an entity under its key, replacing any entry with that key
    pub fn register(&mut self, entity: Entity) -> String {
        let key = entity.key();
        debug!(%key, "registering entity");
        self.objects.insert(key.clone(), entity);
        key
    }

    /// Create and register a fresh entity of `kind`
    pub fn create(&mut self, kind: Kind) -> &Entity {
        let key = self.register(Entity::new(kind));
        &self.objects[&key]
    }

    pub fn remove(&mut self, kind: Kind, id: &str) -> Option<Entity> {
        self.objects.remove(&registry_key(kind, id))
    }

    /// Refresh `updated_at` of the entry at `key` and persist.
    /// Returns false if there is no such entry.
    pub fn touch(&mut self, key: &str) -> Result<bool, StoreError> {
        match self.objects.get_mut(key) {
            Some(entity) => {
                entity.touch();
                self.persist()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Bulk insert a `{ key: attributes }` object, each entry under its own key
    pub fn extend_from_map(&mut self, document: &Value) -> Result<usize, StoreError> {
        let decoded = codec::decode_document(document)?;
        let inserted = decoded.len();
        self.objects.extend(decoded);
        Ok(inserted)
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Write the whole registry to the backing file.
    ///
    /// The document goes to a sibling temp file first and is renamed over
    /// the target, so the real path never holds a half-written document.
    pub fn persist(&self) -> Result<(), StoreError> {
        let document = codec::encode(&self.objects);
        let tmp_path = self.tmp_path();

        fs::write(&tmp_path, document).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = ?self.path, entries = self.objects.len(), "registry persisted");
        Ok(())
    }

    /// Replace the in-memory collection with the file's contents.
    ///
    /// Missing file: nothing happens. Invalid JSON: the registry becomes
    /// empty and the next persist rewrites the file; telling the user is
    /// left to the caller.
    pub fn reload(&mut self) -> Result<Reload, StoreError> {
        if !self.path.is_file() {
            debug!(path = ?self.path, "no backing file, starting empty");
            return Ok(Reload::Missing);
        }

        let text = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        match codec::decode(&text) {
            Ok(objects) => {
                info!(path = ?self.path, entries = objects.len(), "registry loaded");
                let entries = objects.len();
                self.objects = objects;
                Ok(Reload::Loaded(entries))
            }
            Err(StoreError::Syntax(err)) => {
                warn!(path = ?self.path, error = %err, "backing file is not valid JSON, starting empty");
                self.objects.clear();
                Ok(Reload::Discarded)
            }
            Err(err) => Err(err),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    // ========================================================================
    // CATALOGS
    // ========================================================================

    /// The seven kinds that can be created or decoded
    pub fn kind_catalog(&self) -> &'static [(&'static str, Constructor)] {
        entities::kind_catalog()
    }

    /// Declared field types used to coerce update input
    pub fn attribute_schema(&self) -> &AttributeRegistry {
        &self.schema
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_create_registers_under_key() {
        let dir = tempdir().unwrap();
        let mut registry = Registry::new(dir.path().join("file.json"));

        let id = registry.create(Kind::State).id.clone();
        assert_eq!(registry.len(), 1);
        assert!(registry.all().contains_key(&format!("State.{}", id)));
        assert!(registry.contains(Kind::State, &id));
        assert!(!registry.contains(Kind::City, &id), "Key includes the kind");
    }

    #[test]
    fn test_create_n_distinct_entities() {
        let dir = tempdir().unwrap();
        let mut registry = Registry::new(dir.path().join("file.json"));

        for i in 0..25 {
            let kind = Kind::ALL[i % Kind::ALL.len()];
            registry.create(kind);
        }

        assert_eq!(registry.len(), 25, "Each create adds exactly one entry");
        for (key, entity) in registry.all() {
            assert!(key.starts_with(&format!("{}.", entity.kind().name())));
        }
    }

    #[test]
    fn test_count_by_kind() {
        let dir = tempdir().unwrap();
        let mut registry = Registry::new(dir.path().join("file.json"));
        registry.create(Kind::User);
        registry.create(Kind::User);
        registry.create(Kind::Place);

        assert_eq!(registry.count(Some(Kind::User)), 2);
        assert_eq!(registry.count(Some(Kind::Place)), 1);
        assert_eq!(registry.count(Some(Kind::Review)), 0);
        assert_eq!(registry.count(None), 3);
    }

    #[test]
    fn test_persist_reload_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        let mut registry = Registry::new(&path);

        for kind in Kind::ALL {
            registry.create(kind);
        }
        let place_id = registry.instances(Some(Kind::Place)).next().unwrap().id.clone();
        registry
            .get_mut(Kind::Place, &place_id)
            .unwrap()
            .set_attribute("max_guest", json!(6))
            .unwrap();

        let before: Vec<(String, String)> = registry
            .all()
            .iter()
            .map(|(k, e)| (k.clone(), e.describe()))
            .collect();

        registry.persist().unwrap();
        assert_eq!(registry.reload().unwrap(), Reload::Loaded(Kind::ALL.len()));

        let after: Vec<(String, String)> = registry
            .all()
            .iter()
            .map(|(k, e)| (k.clone(), e.describe()))
            .collect();
        assert_eq!(before, after, "persist + reload must not change anything");

        let (reopened, _) = Registry::open(&path).unwrap();
        assert_eq!(reopened.all(), registry.all());
    }

    #[test]
    fn test_persist_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        let mut registry = Registry::new(&path);
        registry.create(Kind::Amenity);
        registry.persist().unwrap();

        assert!(path.is_file());
        assert!(!dir.path().join("file.json.tmp").exists());
    }

    #[test]
    fn test_reload_missing_file_is_noop() {
        let dir = tempdir().unwrap();
        let mut registry = Registry::new(dir.path().join("missing.json"));
        registry.create(Kind::City);

        assert_eq!(registry.reload().unwrap(), Reload::Missing);
        assert_eq!(registry.len(), 1, "Missing file leaves registry as-is");
    }

    #[test]
    fn test_reload_corrupt_file_yields_empty_registry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        fs::write(&path, "{\"State.1\": {oops").unwrap();

        let mut registry = Registry::new(&path);
        registry.create(Kind::State);

        assert_eq!(
            registry.reload().unwrap(),
            Reload::Discarded,
            "Corrupt JSON must not raise"
        );
        assert!(registry.is_empty());

        registry.persist().unwrap();
        let (reopened, outcome) = Registry::open(&path).unwrap();
        assert_eq!(outcome, Reload::Loaded(0), "Next persist rewrites the file");
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_reload_unknown_kind_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        let doc = json!({
            "Ghost.1": {
                "__class__": "Ghost",
                "id": "1",
                "created_at": "2017-09-28T21:05:54.119427",
                "updated_at": "2017-09-28T21:05:54.119427"
            }
        });
        fs::write(&path, doc.to_string()).unwrap();

        let result = Registry::open(&path);
        assert!(matches!(result, Err(StoreError::UnknownKind { .. })));
    }

    #[test]
    fn test_reload_keeps_off_type_declared_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        let doc = json!({
            "Place.p1": {
                "__class__": "Place",
                "id": "p1",
                "created_at": "2017-09-28T21:05:54.119427",
                "updated_at": "2017-09-28T21:05:54.119427",
                "number_rooms": "",
                "amenity_ids": [1, 2],
                "name": "Loft"
            }
        });
        fs::write(&path, doc.to_string()).unwrap();

        let (registry, outcome) = Registry::open(&path).unwrap();
        assert_eq!(outcome, Reload::Loaded(1));
        let place = registry.get(Kind::Place, "p1").unwrap();
        assert_eq!(place.get_attribute("number_rooms"), Some(json!("")));
        assert_eq!(place.get_attribute("amenity_ids"), Some(json!([1, 2])));
        assert_eq!(place.get_attribute("name"), Some(json!("Loft")));

        registry.persist().unwrap();
        let (reopened, _) = Registry::open(&path).unwrap();
        assert_eq!(reopened.all(), registry.all(), "Values survive another round trip");
    }

    #[test]
    fn test_persist_to_unwritable_path_is_io_error() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path().join("no_such_dir").join("file.json"));

        assert!(matches!(registry.persist(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let mut registry = Registry::new(dir.path().join("file.json"));
        let id = registry.create(Kind::Review).id.clone();

        assert!(registry.remove(Kind::Review, &id).is_some());
        assert!(registry.get(Kind::Review, &id).is_none());
        assert!(registry.remove(Kind::Review, &id).is_none());
    }

    #[test]
    fn test_touch_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        let mut registry = Registry::new(&path);
        let key = registry.create(Kind::User).key();

        assert!(registry.touch(&key).unwrap());
        assert!(path.is_file(), "touch writes the file");
        assert!(!registry.touch("User.nope").unwrap());
    }

    #[test]
    fn test_mutation_through_all_mut_needs_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        let mut registry = Registry::new(&path);
        let key = registry.create(Kind::State).key();
        registry.persist().unwrap();

        registry
            .all_mut()
            .get_mut(&key)
            .unwrap()
            .set_attribute("name", json!("Nevada"))
            .unwrap();

        let (on_disk, _) = Registry::open(&path).unwrap();
        assert_eq!(on_disk.all()[&key].get_attribute("name"), Some(json!("")));

        registry.persist().unwrap();
        let (on_disk, _) = Registry::open(&path).unwrap();
        assert_eq!(on_disk.all()[&key].get_attribute("name"), Some(json!("Nevada")));
    }

    #[test]
    fn test_extend_from_map() {
        let dir = tempdir().unwrap();
        let mut registry = Registry::new(dir.path().join("file.json"));
        let doc = json!({
            "State.s1": {
                "__class__": "State",
                "id": "s1",
                "created_at": "2017-09-28T21:05:54.119427",
                "updated_at": "2017-09-28T21:05:54.119427",
                "name": "Oregon"
            },
            "City.c1": {
                "__class__": "City",
                "id": "c1",
                "created_at": "2017-09-28T21:05:54.119427",
                "updated_at": "2017-09-28T21:05:54.119427",
                "state_id": "s1"
            }
        });

        assert_eq!(registry.extend_from_map(&doc).unwrap(), 2);
        assert_eq!(
            registry.get(Kind::State, "s1").unwrap().get_attribute("name"),
            Some(json!("Oregon"))
        );
        assert!(registry.get(Kind::City, "c1").is_some());
    }

    #[test]
    fn test_catalog_and_schema_accessors() {
        let registry = Registry::new("unused.json");
        assert_eq!(registry.kind_catalog().len(), 7);
        assert!(registry
            .attribute_schema()
            .type_of(Kind::Place, "price_by_night")
            .is_some());
    }
}
