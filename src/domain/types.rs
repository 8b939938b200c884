//! Shared domain enumerations for directive kinds and output targets.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Document writer the artifacts are produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    #[default]
    Html,
    Latex,
}

impl OutputTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputTarget::Html => "html",
            OutputTarget::Latex => "latex",
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputTarget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "latex" => Ok(Self::Latex),
            other => Err(format!("unknown output target `{other}`")),
        }
    }
}

/// Image encoding chosen once per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageMode {
    Raster,
    #[default]
    Vector,
}

impl ImageMode {
    pub fn from_raster_flag(raster: bool) -> Self {
        if raster { Self::Raster } else { Self::Vector }
    }
}

/// External renderer families that turn a source file into an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Graph,
    Uml,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Graph => "graph",
            ArtifactKind::Uml => "uml",
        }
    }

    /// Extension of the source description written before rendering.
    pub fn source_extension(self) -> &'static str {
        match self {
            ArtifactKind::Graph => ".dot",
            ArtifactKind::Uml => ".uml",
        }
    }

    pub fn default_command(self) -> &'static str {
        match self {
            ArtifactKind::Graph => "dot",
            ArtifactKind::Uml => "plantuml",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every directive the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Graph,
    Uml,
    Code,
}

impl DirectiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveKind::Graph => "graph",
            DirectiveKind::Uml => "uml",
            DirectiveKind::Code => "code",
        }
    }

    /// Backend family for directives rendered through an external tool.
    pub fn artifact_kind(self) -> Option<ArtifactKind> {
        match self {
            DirectiveKind::Graph => Some(ArtifactKind::Graph),
            DirectiveKind::Uml => Some(ArtifactKind::Uml),
            DirectiveKind::Code => None,
        }
    }
}

impl From<ArtifactKind> for DirectiveKind {
    fn from(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Graph => DirectiveKind::Graph,
            ArtifactKind::Uml => DirectiveKind::Uml,
        }
    }
}

impl FromStr for DirectiveKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "graph" | "dot" | "graphviz" => Ok(Self::Graph),
            "uml" | "plantuml" => Ok(Self::Uml),
            "code" => Ok(Self::Code),
            other => Err(format!("unknown directive `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_kind_accepts_backend_aliases() {
        assert_eq!("dot".parse::<DirectiveKind>(), Ok(DirectiveKind::Graph));
        assert_eq!("PlantUML".parse::<DirectiveKind>(), Ok(DirectiveKind::Uml));
        assert!("mermaid".parse::<DirectiveKind>().is_err());
    }

    #[test]
    fn output_target_round_trips_through_display() {
        for target in [OutputTarget::Html, OutputTarget::Latex] {
            assert_eq!(target.to_string().parse::<OutputTarget>(), Ok(target));
        }
    }
}
