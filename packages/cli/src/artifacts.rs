// ABOUTME: Writes execution artifacts to disk as artifact-<n>.<ext>
// ABOUTME: Only successful runs are saved; numbering continues across requests

use std::fs;
use std::io;
use std::path::PathBuf;

use genly_core::RepairOutcome;
use genly_sandbox::{Artifact, ArtifactKind};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl SavedArtifact {
    pub fn label(&self) -> &'static str {
        if self.kind.is_image() {
            "image"
        } else {
            "file"
        }
    }
}

pub struct ArtifactWriter {
    dir: PathBuf,
    next: usize,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next: 1,
        }
    }

    /// Save the artifacts of a finished request. A failed run's artifacts are discarded.
    pub fn write_outcome(&mut self, outcome: &RepairOutcome) -> io::Result<Vec<SavedArtifact>> {
        let artifacts = &outcome.output.artifacts;
        if !outcome.succeeded() {
            if !artifacts.is_empty() {
                info!("Discarding {} artifact(s) from a failed run", artifacts.len());
            }
            return Ok(Vec::new());
        }

        let paths = self.write_all(artifacts)?;
        Ok(paths
            .into_iter()
            .zip(artifacts)
            .map(|(path, artifact)| SavedArtifact {
                path,
                kind: artifact.kind,
            })
            .collect())
    }

    /// Write artifacts in encounter order and return their paths
    pub fn write_all(&mut self, artifacts: &[Artifact]) -> io::Result<Vec<PathBuf>> {
        if artifacts.is_empty() {
            return Ok(Vec::new());
        }

        fs::create_dir_all(&self.dir)?;

        let mut paths = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let path = self
                .dir
                .join(format!("artifact-{}.{}", self.next, artifact.kind.extension()));
            fs::write(&path, &artifact.bytes)?;
            debug!("Wrote {} bytes to {}", artifact.bytes.len(), path.display());
            self.next += 1;
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genly_core::LoopState;
    use genly_sandbox::{ExecutionOutput, ParsedProgram};
    use tempfile::TempDir;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn outcome(state: LoopState, artifacts: Vec<Artifact>) -> RepairOutcome {
        RepairOutcome {
            state,
            program: ParsedProgram::new("plot()"),
            output: ExecutionOutput {
                artifacts,
                ..Default::default()
            },
            repairs: 0,
            failure: None,
        }
    }

    #[test]
    fn test_successful_outcome_is_saved_with_kinds() {
        let temp = TempDir::new().unwrap();
        let mut writer = ArtifactWriter::new(temp.path());

        let saved = writer
            .write_outcome(&outcome(
                LoopState::Done,
                vec![
                    Artifact::from_bytes(PNG.to_vec()),
                    Artifact::from_bytes(b"raw".to_vec()),
                ],
            ))
            .unwrap();

        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].path, temp.path().join("artifact-1.png"));
        assert_eq!(saved[0].label(), "image");
        assert_eq!(saved[1].label(), "file");
    }

    #[test]
    fn test_failed_outcome_is_not_saved() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out");
        let mut writer = ArtifactWriter::new(&dir);

        let saved = writer
            .write_outcome(&outcome(LoopState::Failed, vec![Artifact::from_bytes(PNG.to_vec())]))
            .unwrap();

        assert!(saved.is_empty());
        assert!(!dir.exists());

        // Numbering is not consumed by the discarded run
        let saved = writer
            .write_outcome(&outcome(LoopState::Done, vec![Artifact::from_bytes(PNG.to_vec())]))
            .unwrap();
        assert_eq!(saved[0].path, dir.join("artifact-1.png"));
    }

    #[test]
    fn test_writes_in_encounter_order() {
        let temp = TempDir::new().unwrap();
        let mut writer = ArtifactWriter::new(temp.path().join("out"));

        let paths = writer
            .write_all(&[
                Artifact::from_bytes(PNG.to_vec()),
                Artifact::from_bytes(b"<svg></svg>".to_vec()),
            ])
            .unwrap();

        assert_eq!(
            paths,
            vec![
                temp.path().join("out/artifact-1.png"),
                temp.path().join("out/artifact-2.svg"),
            ]
        );
        assert_eq!(fs::read(&paths[0]).unwrap(), PNG);
    }

    #[test]
    fn test_numbering_continues() {
        let temp = TempDir::new().unwrap();
        let mut writer = ArtifactWriter::new(temp.path());

        writer.write_all(&[Artifact::from_bytes(PNG.to_vec())]).unwrap();
        let second = writer
            .write_all(&[Artifact::from_bytes(b"raw".to_vec())])
            .unwrap();

        assert_eq!(second, vec![temp.path().join("artifact-2.bin")]);
    }

    #[test]
    fn test_nothing_to_write_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("never");

        let paths = ArtifactWriter::new(&dir).write_all(&[]).unwrap();

        assert!(paths.is_empty());
        assert!(!dir.exists());
    }
}
