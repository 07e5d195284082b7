//! Regression-testing helpers shared by the game's fixture tests and tools.
//!
//! Fixtures pair a level and an action string with the expected final board.
//! The helpers here cover the generic half: env-flag plumbing, JSON golden
//! files, and digests of a state's replay projection.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

/// Env-flag helper: accepts `1/true/yes/on` (case-insensitive).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// If set, fixture tests may rewrite their golden files in place.
pub fn update_goldens_enabled() -> bool {
    env_flag("BURROW_UPDATE_GOLDENS")
}

/// sha256 over a state's serialized replay projection, hex-encoded. Two
/// states with equal digests are replay-identical.
pub fn state_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn load_golden_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> io::Result<T> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed parsing golden json {}: {e}", path.display()),
        )
    })
}

pub fn write_golden_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut body = serde_json::to_string_pretty(value).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed serializing golden json {}: {e}", path.display()),
        )
    })?;
    body.push('\n');
    fs::write(path, body)
}
