//! The translator: owns the published registry and exposes the schema-load and
//! translation entry points.
//!
//! Loads are serialized and build the new registry off to the side; publishing
//! is a single pointer swap. Translations clone the current `Arc` and never
//! hold the lock while encoding, so a slow load never blocks them and never
//! exposes a half-built registry.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::compiler::{ExternalCompiler, SchemaCompiler};
use crate::config::EngineConfig;
use crate::encode::encode;
use crate::error::{ProtomeError, Result};
use crate::frame::frame;
use crate::intercept::{GRPC_CONTENT_TYPE, PROTOBUF_CONTENT_TYPE};
use crate::registry::{LoadWarning, TypeRegistry};
use crate::template::template;

/// Summary of one successful load, for operators.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: String,
    pub files: usize,
    pub messages: usize,
    pub keys: usize,
    pub warnings: Vec<LoadWarning>,
    /// Compiler stdout+stderr; empty for pre-built descriptor sets.
    pub compiler_output: String,
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "loaded {}", self.source)?;
        writeln!(
            f,
            "  files={} messages={} lookup_keys={}",
            self.files, self.messages, self.keys
        )?;
        for warning in &self.warnings {
            writeln!(f, "  WARNING: {warning}")?;
        }
        if !self.compiler_output.trim().is_empty() {
            writeln!(f, "--- compiler output ---")?;
            writeln!(f, "{}", self.compiler_output.trim_end())?;
        }
        Ok(())
    }
}

/// Output of one translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Encoded message, framed if `framed`.
    pub payload: Bytes,
    pub framed: bool,
    /// Length of the encoded message before framing.
    pub message_len: usize,
}

impl Translation {
    /// Zero-byte message: usually no JSON key matched a field name.
    pub fn is_empty_message(&self) -> bool {
        self.message_len == 0
    }

    pub fn content_type(&self) -> &'static str {
        if self.framed {
            GRPC_CONTENT_TYPE
        } else {
            PROTOBUF_CONTENT_TYPE
        }
    }
}

pub struct Translator {
    config: EngineConfig,
    compiler: Box<dyn SchemaCompiler>,
    registry: RwLock<Option<Arc<TypeRegistry>>>,
    load_lock: Mutex<()>,
}

impl Translator {
    pub fn new(config: EngineConfig) -> Self {
        let compiler = ExternalCompiler::new(config.compiler.clone());
        Self::with_compiler(config, compiler)
    }

    pub fn with_compiler(config: EngineConfig, compiler: impl SchemaCompiler + 'static) -> Self {
        Self {
            config,
            compiler: Box::new(compiler),
            registry: RwLock::new(None),
            load_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The currently published registry, if any load has succeeded.
    pub fn registry(&self) -> Option<Arc<TypeRegistry>> {
        self.registry.read().clone()
    }

    /// Compile `root` and replace the registry. On error the previous registry
    /// stays published.
    pub fn load_schema(&self, root: &Path) -> Result<LoadReport> {
        let _load = self.load_lock.lock();
        tracing::info!(schema = %root.display(), "loading schema");

        let result = recover(|| {
            let compiled = self.compiler.compile(root)?;
            let registry = TypeRegistry::load(&compiled.descriptor_set, self.config.dependency_policy)?;
            Ok((registry, compiled.diagnostics))
        });
        self.finish_load(root.display().to_string(), result)
    }

    /// Replace the registry from an already-compiled descriptor set.
    pub fn load_descriptor_set(&self, descriptor_set: &[u8]) -> Result<LoadReport> {
        let _load = self.load_lock.lock();
        let result = recover(|| {
            let registry = TypeRegistry::load(descriptor_set, self.config.dependency_policy)?;
            Ok((registry, String::new()))
        });
        self.finish_load("<descriptor set>".to_string(), result)
    }

    fn finish_load(
        &self,
        source: String,
        result: Result<(TypeRegistry, String)>,
    ) -> Result<LoadReport> {
        let (registry, compiler_output) = match result {
            Ok(built) => built,
            Err(err) => {
                tracing::error!(source = %source, kind = err.kind(), error = %err, "schema load failed");
                return Err(err);
            }
        };

        let report = LoadReport {
            source,
            files: registry.file_count(),
            messages: registry.len(),
            keys: registry.names().len(),
            warnings: registry.warnings().to_vec(),
            compiler_output,
        };
        *self.registry.write() = Some(Arc::new(registry));
        tracing::info!(
            source = %report.source,
            files = report.files,
            messages = report.messages,
            warnings = report.warnings.len(),
            "schema loaded"
        );
        Ok(report)
    }

    /// Encode `json` as `type_name`, optionally wrapped in a gRPC frame.
    pub fn translate(&self, json: &str, type_name: &str, want_frame: bool) -> Result<Translation> {
        let registry = self.registry().ok_or(ProtomeError::NoSchemaLoaded)?;
        let message = encode(json, type_name, &registry)?;
        let message_len = message.len();

        tracing::debug!(type_name, bytes = message_len, "converted message");
        if message_len == 0 {
            tracing::warn!(
                type_name,
                "resulting protobuf message is empty (0 bytes); check JSON key spelling"
            );
        }

        let payload = if want_frame {
            frame(&message)
        } else {
            Bytes::from(message)
        };
        Ok(Translation {
            payload,
            framed: want_frame,
            message_len,
        })
    }

    /// Sample JSON document for `type_name`.
    pub fn template(&self, type_name: &str) -> Result<serde_json::Value> {
        let registry = self.registry().ok_or(ProtomeError::NoSchemaLoaded)?;
        template(type_name, &registry)
    }
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("config", &self.config)
            .field("types", &self.registry().map(|r| r.len()))
            .finish()
    }
}

/// Outermost recovery point for a load: a panic inside the descriptor
/// machinery becomes a `DescriptorParseError` carrying the panic message.
fn recover<T>(load: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(load)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(ProtomeError::DescriptorParseError {
            message: format!("descriptor loading panicked: {message}"),
        })
    })
}
