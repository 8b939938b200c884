//! Turns directive occurrences into document nodes.
//!
//! Graph and uml directives go through a [`RenderService`]; the outcome becomes
//! an image, an error block or a warning block. Code directives are
//! highlighted in-process with no file or process I/O.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::application::render::{
    options::{CodeOptions, ImageOptions, OptionError, RawOptions},
    service::{CodeHighlighter, HighlightError, active_render_config, render_service},
    types::{BuildContext, FailureKind, RenderOutcome, RenderRequest, RenderService},
};
use crate::domain::{
    nodes::{Align, CODE_CSS_CLASS, EmbeddedNode, ImageNode},
    types::{ArtifactKind, DirectiveKind},
};

/// One directive occurrence as parsed from the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Artifact name for graph/uml, language for code.
    pub argument: Option<String>,
    pub line: u32,
    pub content: Vec<String>,
    pub options: RawOptions,
}

impl Directive {
    pub fn new(kind: DirectiveKind, line: u32) -> Self {
        Self {
            kind,
            argument: None,
            line,
            content: Vec::new(),
            options: RawOptions::new(),
        }
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
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

    pub fn with_option(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        self.options.insert(name.into(), value.map(str::to_string));
        self
    }
}

/// Errors that reject a directive before anything is rendered.
#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("Error in \"{directive}\" directive:\n{source}")]
    Option {
        directive: &'static str,
        #[source]
        source: OptionError,
    },
    #[error("Error in \"{directive}\" directive:\n1 argument(s) required, 0 supplied.")]
    MissingArgument { directive: &'static str },
    #[error("Content block expected for the \"{directive}\" directive; none found.")]
    MissingContent { directive: &'static str },
    #[error(transparent)]
    Highlight(#[from] HighlightError),
}

impl DirectiveError {
    /// True when the directive was rejected because of a malformed option value.
    pub fn is_value_error(&self) -> bool {
        matches!(self, DirectiveError::Option { source, .. } if source.is_value_error())
    }
}

/// External collaborator that finishes building the node for a rendered image.
pub trait ImageEmbedder: Send + Sync {
    fn embed(&self, uri: &Path, options: &ImageOptions) -> Vec<EmbeddedNode>;
}

/// Default image collaborator: an image node, wrapped in a reference when a
/// `target` option is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageNodeBuilder;

impl ImageEmbedder for ImageNodeBuilder {
    fn embed(&self, uri: &Path, options: &ImageOptions) -> Vec<EmbeddedNode> {
        let image = ImageNode {
            uri: uri.to_string_lossy().replace('\\', "/"),
            align: options.align.unwrap_or(Align::Center),
            alt: options.alt.clone(),
            width: options.width.clone(),
            height: options.height.clone(),
            scale: options.scale,
            classes: options.classes.clone(),
            name: options.name.clone(),
        };

        let node = match options.target.as_ref() {
            Some(refuri) => EmbeddedNode::Reference {
                refuri: refuri.clone(),
                image,
            },
            None => EmbeddedNode::Image(image),
        };
        vec![node]
    }
}

/// Runs directives end to end and returns the nodes to insert in the document.
pub struct DirectiveRenderer {
    service: Arc<dyn RenderService>,
    highlighter: CodeHighlighter,
    embedder: Arc<dyn ImageEmbedder>,
    output_dir: PathBuf,
    context: BuildContext,
}

impl DirectiveRenderer {
    pub fn new(
        service: Arc<dyn RenderService>,
        highlighter: CodeHighlighter,
        output_dir: impl Into<PathBuf>,
        context: BuildContext,
    ) -> Self {
        Self {
            service,
            highlighter,
            embedder: Arc::new(ImageNodeBuilder),
            output_dir: output_dir.into(),
            context,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn ImageEmbedder>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn run(&self, directive: &Directive) -> Result<Vec<EmbeddedNode>, DirectiveError> {
        match directive.kind.artifact_kind() {
            Some(kind) => self.run_artifact(kind, directive),
            None => self.run_code(directive).map(|node| vec![node]),
        }
    }

    fn run_artifact(
        &self,
        kind: ArtifactKind,
        directive: &Directive,
    ) -> Result<Vec<EmbeddedNode>, DirectiveError> {
        let options =
            ImageOptions::parse(&directive.options).map_err(|source| DirectiveError::Option {
                directive: kind.as_str(),
                source,
            })?;

        let mut request = RenderRequest::new(kind, self.output_dir.clone())
            .with_line(directive.line)
            .with_content(directive.content.iter().cloned());
        if let Some(name) = directive.argument.as_deref() {
            request = request.with_name(name);
        }

        let outcome = self.service.render(&request, &self.context);
        Ok(self.embed_outcome(&outcome, directive.line, &options))
    }

    /// Map a render outcome to nodes: image on success, error block on a
    /// backend failure, warning block when file access is disabled.
    pub fn embed_outcome(
        &self,
        outcome: &RenderOutcome,
        line: u32,
        options: &ImageOptions,
    ) -> Vec<EmbeddedNode> {
        match outcome {
            RenderOutcome::Success { output_path } => self.embedder.embed(output_path, options),
            RenderOutcome::Failure(failure) => match failure.kind {
                FailureKind::AccessDisabled => {
                    vec![EmbeddedNode::warning(line, failure.diagnostic.clone())]
                }
                FailureKind::Backend => vec![EmbeddedNode::error(line, failure.diagnostic.clone())],
            },
        }
    }

    fn run_code(&self, directive: &Directive) -> Result<EmbeddedNode, DirectiveError> {
        let directive_name = DirectiveKind::Code.as_str();
        let language = directive
            .argument
            .as_deref()
            .map(str::trim)
            .filter(|arg| !arg.is_empty())
            .ok_or(DirectiveError::MissingArgument {
                directive: directive_name,
            })?;
        let options =
            CodeOptions::parse(&directive.options).map_err(|source| DirectiveError::Option {
                directive: directive_name,
                source,
            })?;
        if directive.content.iter().all(|line| line.trim().is_empty()) {
            return Err(DirectiveError::MissingContent {
                directive: directive_name,
            });
        }

        let text =
            self.highlighter
                .highlight(language, &directive.content, &options, directive.line)?;

        Ok(EmbeddedNode::Raw {
            format: self.highlighter.target().as_str().to_string(),
            classes: vec![CODE_CSS_CLASS.to_string()],
            text,
        })
    }
}

static DIRECTIVE_RENDERER: Lazy<Arc<DirectiveRenderer>> = Lazy::new(|| {
    let config = active_render_config();
    Arc::new(DirectiveRenderer::new(
        render_service(),
        CodeHighlighter::new(config.target),
        config.output_dir,
        config.context,
    ))
});

/// Shared directive renderer built from the installed configuration.
pub fn directive_renderer() -> Arc<DirectiveRenderer> {
    Arc::clone(&DIRECTIVE_RENDERER)
}
