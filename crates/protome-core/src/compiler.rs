//! Schema compilation: `.proto` root file → `FileDescriptorSet` bytes.
//!
//! Pipeline:
//! 1. Create a private scratch directory.
//! 2. Run `protoc --include_imports --descriptor_set_out=<scratch>/...` (or
//!    `buf build ... -o <scratch>/...`) with the root file's directory as the
//!    import path.
//! 3. Read the artifact back; the scratch directory is removed on return.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::{CompilerBackend, CompilerConfig};
use crate::error::{ProtomeError, Result};

/// Artifact produced by one compiler run.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    /// Encoded `google.protobuf.FileDescriptorSet`.
    pub descriptor_set: Vec<u8>,
    /// Compiler stdout+stderr (usually empty on success).
    pub diagnostics: String,
}

/// Anything that can turn a root schema file into a descriptor set.
pub trait SchemaCompiler: Send + Sync {
    fn compile(&self, root: &Path) -> Result<CompiledSchema>;
}

/// Runs `protoc` or `buf` as a child process.
#[derive(Debug, Clone, Default)]
pub struct ExternalCompiler {
    config: CompilerConfig,
}

impl ExternalCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    fn command(&self, root_dir: &Path, root_file: &Path, out: &Path) -> Command {
        let mut cmd = Command::new(self.config.program());
        match self.config.backend {
            CompilerBackend::Protoc => {
                cmd.arg("--include_imports")
                    .arg(format!("--descriptor_set_out={}", out.display()))
                    .arg(format!("--proto_path={}", root_dir.display()));
                // The child runs in `root_dir`; relative includes are the caller's.
                let cwd = std::env::current_dir().unwrap_or_default();
                for include in &self.config.include_paths {
                    cmd.arg(format!("--proto_path={}", cwd.join(include).display()));
                }
                cmd.arg(root_file);
            }
            CompilerBackend::Buf => {
                // buf always includes imports (and their well-known types)
                // unless `--exclude-imports` is given.
                cmd.arg("build")
                    .arg(root_dir)
                    .arg("--path")
                    .arg(root_file)
                    .arg("--as-file-descriptor-set")
                    .arg("-o")
                    .arg(out);
            }
        }
        cmd.current_dir(root_dir);
        cmd
    }
}

impl SchemaCompiler for ExternalCompiler {
    fn compile(&self, root: &Path) -> Result<CompiledSchema> {
        if !root.is_file() {
            return Err(ProtomeError::SchemaNotFound {
                path: root.to_path_buf(),
            });
        }
        let root = root
            .canonicalize()
            .map_err(|_| ProtomeError::SchemaNotFound {
                path: root.to_path_buf(),
            })?;
        let root_dir = root.parent().unwrap_or(Path::new(".")).to_path_buf();
        let root_file = PathBuf::from(root.file_name().unwrap_or_default());

        let program = self.config.program().display().to_string();
        let invocation_failed = |status: String, diagnostics: String| {
            ProtomeError::CompilerInvocationFailed {
                program: program.clone(),
                status,
                diagnostics,
            }
        };

        let scratch = tempfile::Builder::new()
            .prefix("protome")
            .tempdir()
            .map_err(|e| invocation_failed("no scratch dir".to_string(), e.to_string()))?;
        let out = scratch.path().join(self.config.backend.artifact_name());

        tracing::info!(
            schema = %root.display(),
            compiler = %program,
            "compiling schema"
        );
        let cmd = self.command(&root_dir, &root_file, &out);
        let output = run_command_output_with_timeout(cmd, self.config.timeout())
            .map_err(|e| invocation_failed("no exit status".to_string(), e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = format!("{stdout}{stderr}");
        if !diagnostics.trim().is_empty() {
            tracing::info!(output = %diagnostics.trim_end(), "compiler output");
        }

        if !output.status.success() {
            return Err(invocation_failed(output.status.to_string(), diagnostics));
        }

        let descriptor_set = std::fs::read(&out).map_err(|e| {
            invocation_failed(
                output.status.to_string(),
                format!("{diagnostics}failed to read {}: {e}", out.display()),
            )
        })?;

        Ok(CompiledSchema {
            descriptor_set,
            diagnostics,
        })
    }
}

fn run_command_output_with_timeout(
    mut cmd: Command,
    timeout: Option<Duration>,
) -> std::result::Result<Output, String> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| format!("failed to spawn: {e}"))?;

    // Drain both pipes while waiting; a chatty compiler must never stall on a
    // full pipe buffer.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let collect = |reader: Option<JoinHandle<Vec<u8>>>| {
        reader
            .map(|handle| handle.join().unwrap_or_default())
            .unwrap_or_default()
    };

    let status = match timeout {
        None => child.wait(),
        Some(timeout) => {
            let start = Instant::now();
            loop {
                match child.try_wait() {
                    Ok(Some(status)) => break Ok(status),
                    Ok(None) if start.elapsed() > timeout => {
                        let _ = child.kill();
                        let _ = child.wait();
                        let mut captured = collect(stdout);
                        captured.extend(collect(stderr));
                        return Err(format!(
                            "timed out after {}s\n{}",
                            timeout.as_secs(),
                            String::from_utf8_lossy(&captured)
                        ));
                    }
                    Ok(None) => std::thread::sleep(Duration::from_millis(25)),
                    Err(e) => break Err(e),
                }
            }
        }
    }
    .map_err(|e| format!("failed to wait for compiler process: {e}"))?;

    Ok(Output {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}
