use serde::{Deserialize, Serialize};

/// Class attached to every highlighted code block.
pub const CODE_CSS_CLASS: &str = "code";

/// Horizontal or vertical placement of an embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Top,
    Middle,
    Bottom,
    Left,
    Center,
    Right,
}

impl Align {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "middle" => Some(Self::Middle),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Image node produced for a rendered graph or diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageNode {
    pub uri: String,
    pub align: Align,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Nodes handed back to the surrounding document model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum EmbeddedNode {
    /// A rendered image.
    Image(ImageNode),
    /// An image wrapped in a hyperlink (image `target` option).
    Reference { refuri: String, image: ImageNode },
    /// Pre-rendered markup that the writer for `format` emits verbatim.
    Raw {
        format: String,
        classes: Vec<String>,
        text: String,
    },
    /// A rendering failure made visible to the document author.
    Error { line: u32, text: String },
    /// A directive skipped on purpose, e.g. because file access is disabled.
    Warning { line: u32, text: String },
}

impl EmbeddedNode {
    pub fn error(line: u32, text: impl Into<String>) -> Self {
        Self::Error {
            line,
            text: text.into(),
        }
    }

    pub fn warning(line: u32, text: impl Into<String>) -> Self {
        Self::Warning {
            line,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EmbeddedNode::Error { .. })
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, EmbeddedNode::Warning { .. })
    }

    /// The image carried by this node, if any.
    pub fn image(&self) -> Option<&ImageNode> {
        match self {
            EmbeddedNode::Image(image) | EmbeddedNode::Reference { image, .. } => Some(image),
            _ => None,
        }
    }
}
