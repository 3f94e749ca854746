//! Protome core: `.proto` schemas + JSON → protobuf wire bytes, at runtime.
//!
//! ```text
//!  schema.proto ──► compiler ──► FileDescriptorSet ──► registry
//!                  (protoc/buf)                         │
//!  JSON body + type name ──────────────────────────► encode ──► [frame] ──► bytes
//! ```
//!
//! - [`compiler`]: runs the external compiler into a private temp dir.
//! - [`registry`]: links descriptors in dependency order and indexes every
//!   message type (nested ones too) by short and fully-qualified name.
//! - [`encode`]: tolerant JSON → dynamic message → wire bytes.
//! - [`frame`]: gRPC 5-byte length-prefixed framing.
//! - [`engine`]: [`Translator`], the load/translate entry points around an
//!   atomically replaced registry.
//! - [`intercept`]: the sentinel-header contract for outgoing HTTP requests.
//! - [`template`]: sample JSON documents for a message type.

pub mod compiler;
pub mod config;
pub mod encode;
pub mod engine;
pub mod error;
pub mod frame;
pub mod intercept;
pub mod registry;
pub mod template;

#[cfg(test)]
mod testutil;

pub use compiler::{CompiledSchema, ExternalCompiler, SchemaCompiler};
pub use config::{CompilerBackend, CompilerConfig, DependencyPolicy, EngineConfig, SentinelHeaders};
pub use encode::encode;
pub use engine::{LoadReport, Translation, Translator};
pub use error::{ProtomeError, Result};
pub use frame::{frame, FRAME_HEADER_LEN};
pub use intercept::{rewrite_request, InterceptOutcome, GRPC_CONTENT_TYPE, PROTOBUF_CONTENT_TYPE};
pub use registry::{LoadWarning, TypeRegistry};
pub use template::template;

// Re-exported so callers can name descriptor types without pinning versions.
pub use prost_reflect;
