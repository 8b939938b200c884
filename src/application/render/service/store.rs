//! On-disk layout of rendered artifacts.
//!
//! Every artifact lives at `<output_dir>/<name>` plus an extension: the source
//! description (`.dot`, `.uml`), the backend output, and the embedded file. The
//! files persist between builds and act as a cache keyed by name.

use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

use crate::application::render::types::ArtifactPaths;
use crate::domain::types::ArtifactKind;

use super::backend::BackendSpec;

const UML_BEGIN: &str = "@startuml";
const UML_END: &str = "@enduml";

/// What [`ensure_source`] did with the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceWrite {
    /// The directive content was written, replacing any previous file.
    Written { bytes: usize },
    /// No content was given; whatever is on disk is rendered as is.
    Reused,
}

/// Base name for a directive without an explicit name: its line number,
/// zero-padded to six digits so reruns at the same position reuse the file.
pub fn synthesize_name(line: u32) -> String {
    format!("{line:06}")
}

/// Derive every path for one artifact. Pure; touches nothing on disk.
pub fn resolve_paths(
    output_dir: &Path,
    name: Option<&str>,
    line: u32,
    spec: &BackendSpec,
) -> ArtifactPaths {
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| synthesize_name(line));
    let stem = output_dir.join(name);

    ArtifactPaths {
        source: with_suffix(&stem, spec.kind.source_extension()),
        output: with_suffix(&stem, &spec.output_extension),
        embed: with_suffix(&stem, &spec.embed_extension),
        stem,
    }
}

/// Make sure the source file exists for rendering.
///
/// Parent directories are always created. Non-empty `content` always
/// overwrites the file; empty `content` leaves it untouched so a file placed
/// there earlier is rendered instead.
pub fn ensure_source(
    paths: &ArtifactPaths,
    kind: ArtifactKind,
    content: &[String],
    header: Option<&str>,
) -> io::Result<SourceWrite> {
    if let Some(parent) = paths.source.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    if content.is_empty() {
        return Ok(SourceWrite::Reused);
    }

    let framed = frame_source(kind, content, header);
    fs::write(&paths.source, framed.as_bytes())?;

    Ok(SourceWrite::Written {
        bytes: framed.len(),
    })
}

/// Source text written for `content`.
///
/// PlantUML sources are wrapped in `@startuml`/`@enduml` with the header on its
/// own line after the opening marker. Graphviz sources start with the header
/// line (empty when unset) followed by the content.
pub fn frame_source(kind: ArtifactKind, content: &[String], header: Option<&str>) -> String {
    let body = content.join("\n");

    match kind {
        ArtifactKind::Uml => {
            let mut text = String::with_capacity(body.len() + 32);
            text.push_str(UML_BEGIN);
            text.push('\n');
            if let Some(header) = header {
                text.push_str(header);
                text.push('\n');
            }
            text.push_str(&body);
            text.push('\n');
            text.push_str(UML_END);
            text.push('\n');
            text
        }
        ArtifactKind::Graph => {
            let header = header.unwrap_or_default();
            let mut text = String::with_capacity(header.len() + body.len() + 1);
            text.push_str(header);
            text.push('\n');
            text.push_str(&body);
            text
        }
    }
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(stem.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}
