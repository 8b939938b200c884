//! Directive rendering.
//!
//! Graph and diagram directives are written to source files and handed to an
//! external tool; the resulting image is embedded into the document. Code
//! directives are highlighted in-process. Failures never abort a build: they
//! come back as error or warning nodes at the directive's line.

mod embed;
mod options;
mod service;
mod types;

pub use embed::{
    Directive, DirectiveError, DirectiveRenderer, ImageEmbedder, ImageNodeBuilder,
    directive_renderer,
};
pub use options::{
    CodeOptions, ImageOptions, OptionError, RawOptions, nonnegative_int, nonnegative_int_list,
    parse_option_arg,
};
pub use service::{
    ArtifactRenderService, BackendError, BackendOverrides, BackendSpec, CodeHighlighter,
    HighlightError, RenderConfigError, RenderPipelineConfig, SourceWrite, configure_render_service,
    ensure_source, frame_source, render_service, resolve_paths, synthesize_name,
};
pub use types::{
    ArtifactPaths, BuildContext, FailureKind, RenderFailure, RenderOutcome, RenderRequest,
    RenderService,
};
