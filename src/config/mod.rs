//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::render::parse_option_arg;
use crate::domain::types::{ArtifactKind, DirectiveKind, OutputTarget};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "figura";
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "images";

/// Command-line arguments for the figura binary.
#[derive(Debug, Parser)]
#[command(
    name = "figura",
    version,
    about = "Render graph, diagram and code directives"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FIGURA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a graph or uml directive and print the resulting nodes as JSON.
    Render(RenderArgs),
    /// Highlight a code block and print the raw node as JSON.
    Highlight(HighlightArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Directive kind: graph (dot, graphviz) or uml (plantuml).
    #[arg(value_name = "KIND", value_parser = parse_artifact_kind)]
    pub kind: ArtifactKind,

    /// Artifact name, relative to the output directory, without extension.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Source line of the directive; names unnamed artifacts.
    #[arg(long, default_value_t = 0, value_name = "LINE")]
    pub line: u32,

    /// Directive option as `key=value`, or `key` for flags. Repeatable.
    #[arg(long = "option", short = 'o', value_name = "KEY[=VALUE]", value_parser = parse_option_arg)]
    pub options: Vec<(String, Option<String>)>,

    /// Render the source file already on disk instead of supplying content.
    #[arg(long, conflicts_with = "input")]
    pub reuse: bool,

    /// File with the directive content; standard input when omitted.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct HighlightArgs {
    /// Language of the code block.
    #[arg(value_name = "LANGUAGE")]
    pub language: String,

    /// Source line of the directive; used for line anchors.
    #[arg(long, default_value_t = 0, value_name = "LINE")]
    pub line: u32,

    /// Directive option as `key=value`, or `key` for flags. Repeatable.
    #[arg(long = "option", short = 'o', value_name = "KEY[=VALUE]", value_parser = parse_option_arg)]
    pub options: Vec<(String, Option<String>)>,

    /// File with the code; standard input when omitted.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the directory rendered artifacts are written to.
    #[arg(long = "output-dir", value_name = "PATH", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Override the output target (html|latex).
    #[arg(long = "target", value_name = "TARGET", global = true)]
    pub target: Option<String>,

    /// Produce raster images instead of vector images.
    #[arg(
        long = "raster",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub raster: Option<bool>,

    /// Allow directives to read and write files.
    #[arg(
        long = "file-insertion",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub file_insertion: Option<bool>,

    /// Override the graph renderer command.
    #[arg(long = "graph-command", value_name = "COMMAND", global = true)]
    pub graph_command: Option<String>,

    /// Override the graph renderer arguments.
    #[arg(long = "graph-args", value_name = "ARGS", global = true, allow_hyphen_values = true)]
    pub graph_args: Option<String>,

    /// Text written before every graph source.
    #[arg(long = "graph-header", value_name = "TEXT", global = true)]
    pub graph_header: Option<String>,

    /// Override the uml renderer command.
    #[arg(long = "uml-command", value_name = "COMMAND", global = true)]
    pub uml_command: Option<String>,

    /// Override the uml renderer arguments.
    #[arg(long = "uml-args", value_name = "ARGS", global = true, allow_hyphen_values = true)]
    pub uml_args: Option<String>,

    /// Text written after `@startuml` in every uml source.
    #[arg(long = "uml-header", value_name = "TEXT", global = true)]
    pub uml_header: Option<String>,
}

fn parse_artifact_kind(value: &str) -> Result<ArtifactKind, String> {
    let kind = DirectiveKind::from_str(value)?;
    kind.artifact_kind()
        .ok_or_else(|| format!("`{value}` is not rendered by an external tool"))
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub output_dir: PathBuf,
    pub target: OutputTarget,
    pub raster: bool,
    pub file_insertion_enabled: bool,
    pub graph: BackendSettings,
    pub uml: BackendSettings,
}

/// Overrides for one external renderer; unset fields keep the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSettings {
    pub command: Option<String>,
    pub args: Option<String>,
    pub header: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FIGURA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(dir) = overrides.output_dir.as_ref() {
            self.render.output_dir = Some(dir.clone());
        }
        if let Some(target) = overrides.target.as_ref() {
            self.render.target = Some(target.clone());
        }
        if let Some(raster) = overrides.raster {
            self.render.raster = Some(raster);
        }
        if let Some(enabled) = overrides.file_insertion {
            self.render.file_insertion_enabled = Some(enabled);
        }

        let graph = &mut self.render.graph;
        merge(&mut graph.command, &overrides.graph_command);
        merge(&mut graph.args, &overrides.graph_args);
        merge(&mut graph.header, &overrides.graph_header);

        let uml = &mut self.render.uml;
        merge(&mut uml.command, &overrides.uml_command);
        merge(&mut uml.args, &overrides.uml_args);
        merge(&mut uml.header, &overrides.uml_header);
    }
}

fn merge(slot: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value.as_ref() {
        *slot = Some(value.clone());
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { logging, render } = raw;

        let logging = build_logging_settings(logging)?;
        let render = build_render_settings(render)?;

        Ok(Self { logging, render })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let output_dir = render
        .output_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    if output_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.output_dir",
            "path must not be empty",
        ));
    }

    let target = match render.target {
        Some(target) => OutputTarget::from_str(&target)
            .map_err(|reason| LoadError::invalid("render.target", reason))?,
        None => OutputTarget::default(),
    };

    Ok(RenderSettings {
        output_dir,
        target,
        raster: render.raster.unwrap_or(false),
        file_insertion_enabled: render.file_insertion_enabled.unwrap_or(true),
        graph: build_backend_settings(render.graph, "render.graph.command")?,
        uml: build_backend_settings(render.uml, "render.uml.command")?,
    })
}

fn build_backend_settings(
    backend: RawBackendSettings,
    command_key: &'static str,
) -> Result<BackendSettings, LoadError> {
    if backend
        .command
        .as_deref()
        .is_some_and(|command| command.trim().is_empty())
    {
        return Err(LoadError::invalid(command_key, "command must not be empty"));
    }

    Ok(BackendSettings {
        command: backend.command,
        args: backend.args,
        header: backend.header,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    output_dir: Option<PathBuf>,
    target: Option<String>,
    raster: Option<bool>,
    file_insertion_enabled: Option<bool>,
    graph: RawBackendSettings,
    uml: RawBackendSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBackendSettings {
    command: Option<String>,
    args: Option<String>,
    header: Option<String>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
