// HBNB Console - Core Library
// Object store, JSON codec and command dispatcher behind the `hbnb` shell

pub mod attributes;
pub mod codec;
pub mod config;
pub mod console;
pub mod entities;
pub mod error;
pub mod grammar;
pub mod literal;
pub mod registry;

// Re-export commonly used types
pub use attributes::{AttributeDefinition, AttributeRegistry, AttributeType};
pub use config::Config;
pub use console::{Console, Flow};
pub use entities::{kind_catalog, registry_key, resolve_kind, Entity, Kind, Record};
pub use error::{CommandError, ConsoleError, StoreError};
pub use grammar::Verb;
pub use registry::{Registry, Reload, CORRUPT_FILE_NOTICE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
