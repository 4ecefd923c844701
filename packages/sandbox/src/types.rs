// ABOUTME: Types exchanged between the repair loop and the execution backends
// ABOUTME: Parsed programs, execution output, artifacts and structured runtime errors

use serde::{Deserialize, Serialize};

/// Code and optional package list extracted from a model response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedProgram {
    pub code: String,
    /// Whitespace separated package names, already stripped of the install command
    pub packages: Option<String>,
}

impl ParsedProgram {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            packages: None,
        }
    }

    pub fn with_packages(mut self, packages: impl Into<String>) -> Self {
        self.packages = Some(packages.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Png,
    Jpeg,
    Gif,
    Svg,
    Other,
}

impl ArtifactKind {
    /// Guess the kind from the leading bytes of the payload
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            ArtifactKind::Png
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ArtifactKind::Jpeg
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            ArtifactKind::Gif
        } else {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
            let head = head.trim_start();
            if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
                ArtifactKind::Svg
            } else {
                ArtifactKind::Other
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Png => "png",
            ArtifactKind::Jpeg => "jpg",
            ArtifactKind::Gif => "gif",
            ArtifactKind::Svg => "svg",
            ArtifactKind::Other => "bin",
        }
    }

    pub fn is_image(&self) -> bool {
        !matches!(self, ArtifactKind::Other)
    }
}

/// A file produced by an execution, held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            kind: ArtifactKind::sniff(&bytes),
            bytes,
        }
    }
}

/// Structured failure reported by the execution backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeError {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub traceback: String,
}

impl RuntimeError {
    pub fn summary(&self) -> String {
        if self.value.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.value)
        }
    }
}

/// Everything an execution produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    /// In the order the backend produced them
    pub artifacts: Vec<Artifact>,
    pub error: Option<RuntimeError>,
    /// Output of the package install step, kept apart from the program's streams
    pub install_log: String,
}

impl ExecutionOutput {
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// stdout followed by stderr, as fed back to the model
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}
