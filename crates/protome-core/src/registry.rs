//! Descriptor registry: `FileDescriptorSet` bytes → linked descriptors →
//! message types indexed by short and fully-qualified name.
//!
//! Files are linked in the order they appear in the set. `protoc
//! --include_imports` already emits dependencies before their dependents, but
//! the registry does not rely on it: a dependency that has not been linked yet
//! is handled according to [`DependencyPolicy`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use prost::Message as _;
use prost_reflect::{DescriptorPool, FileDescriptor, MessageDescriptor};
use prost_types::{FileDescriptorProto, FileDescriptorSet};

use crate::config::DependencyPolicy;
use crate::error::{ProtomeError, Result};

/// Non-fatal findings of a lenient load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// `file` imports `dependency`, which was not linked before it.
    DependencyUnresolved { file: String, dependency: String },
    /// `file` could not be linked without its missing dependencies.
    FileSkipped { file: String, reason: String },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DependencyUnresolved { file, dependency } => {
                write!(f, "could not find dependency '{dependency}' for {file}")
            }
            Self::FileSkipped { file, reason } => write!(f, "skipped {file}: {reason}"),
        }
    }
}

/// Immutable index of every message type in one loaded descriptor set.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    files: BTreeMap<String, FileDescriptor>,
    by_full_name: BTreeMap<String, MessageDescriptor>,
    by_short_name: BTreeMap<String, MessageDescriptor>,
    warnings: Vec<LoadWarning>,
}

impl TypeRegistry {
    /// Decode and link an encoded `google.protobuf.FileDescriptorSet`.
    pub fn load(descriptor_set: &[u8], policy: DependencyPolicy) -> Result<Self> {
        let set = FileDescriptorSet::decode(descriptor_set).map_err(|e| {
            ProtomeError::DescriptorParseError {
                message: e.to_string(),
            }
        })?;
        tracing::debug!(files = set.file.len(), "parsed descriptor set");

        let mut builder = RegistryBuilder::new(policy);
        for file in set.file {
            builder.link_file(file)?;
        }
        Ok(builder.finish())
    }

    /// Look up a type by fully-qualified name, falling back to its short name.
    pub fn get(&self, name: &str) -> Option<&MessageDescriptor> {
        let name = name.strip_prefix('.').unwrap_or(name);
        self.by_full_name
            .get(name)
            .or_else(|| self.by_short_name.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every accepted lookup key (short and fully-qualified), sorted.
    pub fn names(&self) -> Vec<String> {
        self.by_full_name
            .keys()
            .chain(self.by_short_name.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// One fully-qualified name per registered type, sorted.
    pub fn full_names(&self) -> impl Iterator<Item = &str> {
        self.by_full_name.keys().map(String::as_str)
    }

    /// Number of registered message types (nested types included).
    pub fn len(&self) -> usize {
        self.by_full_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_full_name.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file(&self, name: &str) -> Option<&FileDescriptor> {
        self.files.get(name)
    }

    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }
}

struct RegistryBuilder {
    policy: DependencyPolicy,
    pool: DescriptorPool,
    resolved: BTreeSet<String>,
    /// Same files as `resolved`, in link order.
    linked: Vec<String>,
    warnings: Vec<LoadWarning>,
}

impl RegistryBuilder {
    fn new(policy: DependencyPolicy) -> Self {
        Self {
            policy,
            pool: DescriptorPool::new(),
            resolved: BTreeSet::new(),
            linked: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn link_file(&mut self, mut file: FileDescriptorProto) -> Result<()> {
        let name = file.name().to_string();
        if name.is_empty() {
            return Err(ProtomeError::DescriptorParseError {
                message: "file descriptor without a name".to_string(),
            });
        }

        let omitted = self.omit_unresolved_dependencies(&mut file)?;

        let linked = if omitted.is_empty() {
            self.pool.add_file_descriptor_proto(file)
        } else {
            // Link into a copy so a failure leaves the pool untouched.
            let mut candidate = self.pool.clone();
            let result = candidate.add_file_descriptor_proto(file);
            if result.is_ok() {
                self.pool = candidate;
            }
            result
        };

        match linked {
            Ok(()) => {}
            Err(err) if !omitted.is_empty() => {
                tracing::warn!(file = %name, error = %err, "skipping file with unresolved dependencies");
                self.warnings.push(LoadWarning::FileSkipped {
                    file: name,
                    reason: err.to_string(),
                });
                return Ok(());
            }
            Err(err) => {
                return Err(ProtomeError::DescriptorParseError {
                    message: format!("failed to link {name}: {err}"),
                });
            }
        }

        self.resolved.insert(name.clone());
        self.linked.push(name);
        Ok(())
    }

    /// Drop every dependency that has not been linked yet, returning the
    /// dropped names. Public/weak dependency indexes are remapped.
    fn omit_unresolved_dependencies(&mut self, file: &mut FileDescriptorProto) -> Result<Vec<String>> {
        let name = file.name().to_string();
        let declared = std::mem::take(&mut file.dependency);
        let mut omitted = Vec::new();
        let mut remap: Vec<Option<i32>> = Vec::with_capacity(declared.len());
        let mut kept = Vec::with_capacity(declared.len());

        for dependency in declared {
            if self.resolved.contains(&dependency) {
                remap.push(Some(kept.len() as i32));
                kept.push(dependency);
                continue;
            }

            if self.policy == DependencyPolicy::Strict {
                return Err(ProtomeError::DependencyUnresolved {
                    file: name,
                    dependency,
                });
            }
            tracing::warn!(file = %name, dependency = %dependency, "dependency not found");
            self.warnings.push(LoadWarning::DependencyUnresolved {
                file: name.clone(),
                dependency: dependency.clone(),
            });
            remap.push(None);
            omitted.push(dependency);
        }

        file.dependency = kept;
        if !omitted.is_empty() {
            let reindex = |indexes: &mut Vec<i32>| {
                *indexes = indexes
                    .iter()
                    .filter_map(|&i| usize::try_from(i).ok())
                    .filter_map(|i| remap.get(i).copied().flatten())
                    .collect();
            };
            reindex(&mut file.public_dependency);
            reindex(&mut file.weak_dependency);
        }
        Ok(omitted)
    }

    fn finish(self) -> TypeRegistry {
        let mut registry = TypeRegistry {
            files: BTreeMap::new(),
            by_full_name: BTreeMap::new(),
            by_short_name: BTreeMap::new(),
            warnings: self.warnings,
        };

        for name in &self.linked {
            let Some(file) = self.pool.get_file_by_name(name) else {
                continue;
            };
            for message in file.messages() {
                register_message(&mut registry, message);
            }
            registry.files.insert(name.clone(), file);
        }

        tracing::info!(
            files = registry.files.len(),
            messages = registry.len(),
            "descriptor registry built"
        );
        registry
    }
}

fn register_message(registry: &mut TypeRegistry, message: MessageDescriptor) {
    tracing::debug!(type_name = message.full_name(), "registered message type");

    if let Some(previous) = registry
        .by_short_name
        .insert(message.name().to_string(), message.clone())
    {
        if previous.full_name() != message.full_name() {
            tracing::debug!(
                short_name = message.name(),
                replaced = previous.full_name(),
                by = message.full_name(),
                "short name collision"
            );
        }
    }
    registry
        .by_full_name
        .insert(message.full_name().to_string(), message.clone());

    for nested in message.child_messages() {
        register_message(registry, nested);
    }
}
