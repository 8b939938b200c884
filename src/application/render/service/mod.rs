mod backend;
mod highlight;
pub(crate) mod store;

use std::{path::PathBuf, sync::Arc, time::Instant};

use once_cell::sync::{Lazy, OnceCell};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::render::types::{BuildContext, RenderOutcome, RenderRequest, RenderService};
use crate::config::DEFAULT_OUTPUT_DIR;
use crate::domain::types::{ArtifactKind, ImageMode, OutputTarget};

pub use backend::{BackendError, BackendSpec};
pub use highlight::{CodeHighlighter, HighlightError};
pub use store::{SourceWrite, ensure_source, frame_source, resolve_paths, synthesize_name};

/// Renders graph and diagram directives through external command-line tools.
///
/// Holds one immutable [`BackendSpec`] per renderer kind. Every failure is
/// returned as [`RenderOutcome::Failure`]; nothing here panics on bad input.
#[derive(Debug, Clone)]
pub struct ArtifactRenderService {
    graph: BackendSpec,
    uml: BackendSpec,
}

impl ArtifactRenderService {
    pub fn new(config: &RenderPipelineConfig) -> Self {
        Self {
            graph: config.backend_spec(ArtifactKind::Graph),
            uml: config.backend_spec(ArtifactKind::Uml),
        }
    }

    pub fn from_specs(graph: BackendSpec, uml: BackendSpec) -> Self {
        Self { graph, uml }
    }

    pub fn spec(&self, kind: ArtifactKind) -> &BackendSpec {
        match kind {
            ArtifactKind::Graph => &self.graph,
            ArtifactKind::Uml => &self.uml,
        }
    }
}

impl Default for ArtifactRenderService {
    fn default() -> Self {
        Self::new(&RenderPipelineConfig::default())
    }
}

impl RenderService for ArtifactRenderService {
    fn render(&self, request: &RenderRequest, context: &BuildContext) -> RenderOutcome {
        let started_at = Instant::now();
        let kind = request.kind;

        if !context.file_insertion_enabled {
            info!(
                target = "application::render::artifact",
                op = "artifact::render",
                kind = %kind,
                line = request.line,
                result = "access_disabled",
                "File access disabled; directive skipped"
            );
            record_outcome(kind, "access_disabled");
            return RenderOutcome::access_disabled(kind.as_str());
        }

        let spec = self.spec(kind);
        let paths = resolve_paths(
            &request.output_dir,
            request.name.as_deref(),
            request.line,
            spec,
        );

        let source_write =
            match ensure_source(&paths, kind, &request.content, spec.header.as_deref()) {
                Ok(write) => write,
                Err(err) => {
                    warn!(
                        target = "application::render::artifact",
                        op = "artifact::render",
                        kind = %kind,
                        result = "error",
                        elapsed_ms = started_at.elapsed().as_millis() as u64,
                        error_code = "write_source",
                        source_path = %paths.source.display(),
                        error = %err,
                        "Failed to write artifact source"
                    );
                    record_outcome(kind, "error");
                    return RenderOutcome::backend_failure(format!(
                        "failed to write {} source `{}`\ncaused by: {err}",
                        kind,
                        paths.source.display()
                    ));
                }
            };

        // A partially written source stays on disk when the backend fails.
        if let Err(err) = backend::invoke(spec, &paths) {
            record_outcome(kind, "error");
            return RenderOutcome::backend_failure(err.diagnostic());
        }

        info!(
            target = "application::render::artifact",
            op = "artifact::render",
            kind = %kind,
            result = "success",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            source_path = %paths.source.display(),
            embed_path = %paths.embed.display(),
            reused_source = matches!(source_write, SourceWrite::Reused),
            "Artifact rendered"
        );
        record_outcome(kind, "success");

        RenderOutcome::Success {
            output_path: paths.embed,
        }
    }
}

fn record_outcome(kind: ArtifactKind, result: &'static str) {
    metrics::counter!("figura_render_total", "kind" => kind.as_str(), "result" => result)
        .increment(1);
}

/// Per-backend overrides supplied by the document build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOverrides {
    pub command: Option<String>,
    pub args: Option<String>,
    pub header: Option<String>,
}

/// Build-wide rendering configuration, installed once before the first
/// directive is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipelineConfig {
    pub target: OutputTarget,
    pub image_mode: ImageMode,
    pub output_dir: PathBuf,
    pub context: BuildContext,
    pub graph: BackendOverrides,
    pub uml: BackendOverrides,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            target: OutputTarget::Html,
            image_mode: ImageMode::Vector,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            context: BuildContext::default(),
            graph: BackendOverrides::default(),
            uml: BackendOverrides::default(),
        }
    }
}

impl RenderPipelineConfig {
    /// Backend for `kind`: defaults for this target and mode, then overrides.
    pub fn backend_spec(&self, kind: ArtifactKind) -> BackendSpec {
        let overrides = match kind {
            ArtifactKind::Graph => &self.graph,
            ArtifactKind::Uml => &self.uml,
        };

        let mut spec = BackendSpec::new(kind, self.target, self.image_mode)
            .with_header(overrides.header.clone());
        if let Some(command) = overrides.command.as_ref() {
            spec = spec.with_command(command.clone());
        }
        if let Some(args) = overrides.args.as_ref() {
            spec = spec.with_args(args.clone());
        }
        spec
    }
}

impl From<&crate::config::RenderSettings> for RenderPipelineConfig {
    fn from(settings: &crate::config::RenderSettings) -> Self {
        let overrides = |backend: &crate::config::BackendSettings| BackendOverrides {
            command: backend.command.clone(),
            args: backend.args.clone(),
            header: backend.header.clone(),
        };

        Self {
            target: settings.target,
            image_mode: ImageMode::from_raster_flag(settings.raster),
            output_dir: settings.output_dir.clone(),
            context: BuildContext {
                file_insertion_enabled: settings.file_insertion_enabled,
            },
            graph: overrides(&settings.graph),
            uml: overrides(&settings.uml),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_PIPELINE_CONFIG: OnceCell<RenderPipelineConfig> = OnceCell::new();

static RENDER_SERVICE: Lazy<Arc<ArtifactRenderService>> =
    Lazy::new(|| Arc::new(ArtifactRenderService::new(&active_render_config())));

/// Install the build-wide configuration. Must run before the shared service is
/// first used; later calls fail.
pub fn configure_render_service(config: RenderPipelineConfig) -> Result<(), RenderConfigError> {
    RENDER_PIPELINE_CONFIG
        .set(config)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

pub(crate) fn active_render_config() -> RenderPipelineConfig {
    RENDER_PIPELINE_CONFIG.get().cloned().unwrap_or_default()
}

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ArtifactRenderService> {
    Arc::clone(&RENDER_SERVICE)
}
