use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::types::ArtifactKind;

/// Capabilities granted by the surrounding document build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    /// When false, directives must not touch the file system.
    pub file_insertion_enabled: bool,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self {
            file_insertion_enabled: true,
        }
    }
}

/// One graph or diagram directive occurrence to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub kind: ArtifactKind,
    /// Artifact base name relative to the output directory. Derived from
    /// `line` when absent.
    pub name: Option<String>,
    /// Source line of the directive, used for naming and diagnostics.
    pub line: u32,
    /// Directive body. Empty means "render the source file already on disk".
    pub content: Vec<String>,
    pub output_dir: PathBuf,
}

impl RenderRequest {
    pub fn new(kind: ArtifactKind, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            name: None,
            line: 0,
            content: Vec::new(),
            output_dir: output_dir.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        self.name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn with_content<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content = lines.into_iter().map(Into::into).collect();
        self
    }
}

/// File locations derived from a request; nothing beyond the paths is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Output directory joined with the artifact name, without extension.
    pub stem: PathBuf,
    /// Source description handed to the backend (`.dot` / `.uml`).
    pub source: PathBuf,
    /// File the backend writes.
    pub output: PathBuf,
    /// File the document embeds; differs from `output` for some targets.
    pub embed: PathBuf,
}

/// Why a render did not produce an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// File access is disabled for this build; nothing was attempted.
    AccessDisabled,
    /// Writing the source or running the backend failed.
    Backend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderFailure {
    pub kind: FailureKind,
    /// Literal text shown to the document author.
    pub diagnostic: String,
}

/// Result of one render call. Failures are data, never panics or errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenderOutcome {
    Success { output_path: PathBuf },
    Failure(RenderFailure),
}

impl RenderOutcome {
    pub fn access_disabled(directive: &str) -> Self {
        Self::Failure(RenderFailure {
            kind: FailureKind::AccessDisabled,
            diagnostic: format!(
                "File and URL access deactivated. Ignoring directive \"{directive}\"."
            ),
        })
    }

    pub fn backend_failure(diagnostic: impl Into<String>) -> Self {
        Self::Failure(RenderFailure {
            kind: FailureKind::Backend,
            diagnostic: diagnostic.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RenderOutcome::Success { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match self {
            RenderOutcome::Success { output_path } => Some(output_path.as_path()),
            RenderOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RenderFailure> {
        match self {
            RenderOutcome::Failure(failure) => Some(failure),
            RenderOutcome::Success { .. } => None,
        }
    }
}

/// Rendering seam used by the embedding adapter. Implementations must convert
/// every I/O and process failure into a [`RenderOutcome::Failure`].
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest, context: &BuildContext) -> RenderOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_treated_as_missing() {
        let request = RenderRequest::new(ArtifactKind::Graph, "images").with_name("  ");
        assert_eq!(request.name, None);

        let request = RenderRequest::new(ArtifactKind::Graph, "images").with_name(" login ");
        assert_eq!(request.name.as_deref(), Some("login"));
    }

    #[test]
    fn access_disabled_names_the_directive() {
        let outcome = RenderOutcome::access_disabled("uml");
        let failure = outcome.failure().expect("failure outcome");
        assert_eq!(failure.kind, FailureKind::AccessDisabled);
        assert!(failure.diagnostic.contains("\"uml\""));
    }
}
