// ⚙️ Configuration
// Where the store lives and what the shell prints as its prompt.

use std::path::PathBuf;

/// Backing file, relative to the working directory
pub const DEFAULT_STORAGE_PATH: &str = "file.json";

pub const DEFAULT_PROMPT: &str = "(hbnb) ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// JSON file the registry is loaded from and persisted to
    pub storage_path: PathBuf,
    /// Printed before every input line
    pub prompt: String,
}

impl Config {
    /// Builder: use a different backing file
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Builder: use a different prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}
