//! Engine configuration.
//!
//! Precedence, lowest first: [`EngineConfig::default`], environment
//! ([`EngineConfig::apply_env`], compiler program only), an optional JSON file
//! ([`EngineConfig::from_json_file`]), then whatever the caller (usually the
//! CLI) sets explicitly. The environment only fills a program nobody set.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProtomeError, Result};

/// Environment variable overriding the compiler program.
pub const ENV_COMPILER: &str = "PROTOME_PROTOC";
/// Fallback used by the wider protobuf tooling ecosystem.
pub const ENV_PROTOC: &str = "PROTOC";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub compiler: CompilerConfig,
    pub dependency_policy: DependencyPolicy,
    pub headers: SentinelHeaders,
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ProtomeError::Config {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        serde_json::from_str(&text).map_err(|e| ProtomeError::Config {
            message: format!("invalid config {}: {e}", path.display()),
        })
    }

    /// Apply `PROTOME_PROTOC` (or `PROTOC`) when no program was configured.
    pub fn apply_env(&mut self) {
        if self.compiler.program.is_some() {
            return;
        }
        for var in [ENV_COMPILER, ENV_PROTOC] {
            if let Ok(value) = std::env::var(var) {
                let value = value.trim();
                if !value.is_empty() {
                    self.compiler.program = Some(PathBuf::from(value));
                    return;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilerBackend {
    #[default]
    Protoc,
    Buf,
}

impl CompilerBackend {
    pub fn default_program(self) -> &'static str {
        match self {
            Self::Protoc => "protoc",
            Self::Buf => "buf",
        }
    }

    /// File name of the descriptor-set artifact in the scratch directory.
    pub fn artifact_name(self) -> &'static str {
        match self {
            Self::Protoc => "schema.desc",
            Self::Buf => "schema.binpb",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub backend: CompilerBackend,
    /// Executable to run. `None` = the backend's default name on `PATH`.
    pub program: Option<PathBuf>,
    /// Extra `--proto_path` entries, searched after the root file's directory.
    /// Point one at protoc's `include/` tree if well-known types are not found.
    pub include_paths: Vec<PathBuf>,
    /// `None` waits for the compiler indefinitely.
    pub timeout_secs: Option<u64>,
}

impl CompilerConfig {
    pub fn program(&self) -> PathBuf {
        self.program
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.backend.default_program()))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// What to do when a descriptor names a dependency that was not resolved
/// earlier in the set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyPolicy {
    /// Warn, drop the dependency, keep loading. A file that then fails to link
    /// is skipped with a warning.
    #[default]
    Lenient,
    /// Fail the load on the first unresolved dependency.
    Strict,
}

/// Header names that drive the interception boundary. Matched
/// case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelHeaders {
    pub trigger: String,
    pub message_type: String,
    pub grpc: String,
}

impl Default for SentinelHeaders {
    fn default() -> Self {
        Self {
            trigger: "protome".to_string(),
            message_type: "protome-type".to_string(),
            grpc: "protome-grpc".to_string(),
        }
    }
}
