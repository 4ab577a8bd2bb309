use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Failed to read process memory at address {address:#x} (size: {size})")]
    MemoryReadFailed { address: u64, size: usize },

    #[error("Failed to write process memory at address {address:#x}")]
    MemoryWriteFailed { address: u64 },

    #[error("Record truncated: need {len} bytes at offset {offset:#x}")]
    Decode { offset: usize, len: usize },

    #[error("Invalid key combo: {0}")]
    InvalidKeyCombo(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Check if this error is a transient memory fault
    pub fn is_memory_fault(&self) -> bool {
        matches!(self, Error::MemoryReadFailed { .. } | Error::MemoryWriteFailed { .. })
    }
}
