use std::{
    error::Error as StdError,
    fmt::Write as _,
    io::{self, ErrorKind},
    path::Path,
    process::{Command, Stdio},
    time::Instant,
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::application::render::types::ArtifactPaths;
use crate::domain::types::{ArtifactKind, ImageMode, OutputTarget};

/// How one external renderer is invoked for one output target. Built once at
/// configuration time and shared read-only by every request of that kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    pub kind: ArtifactKind,
    /// Executable, optionally followed by its own leading arguments.
    pub command: String,
    /// Format flags placed before the positional paths.
    pub args: String,
    /// Extension of the file the backend writes, including the dot.
    pub output_extension: String,
    /// Extension of the file the document references, including the dot.
    pub embed_extension: String,
    /// Text injected at the top of every source file written for this kind.
    pub header: Option<String>,
}

impl BackendSpec {
    pub fn new(kind: ArtifactKind, target: OutputTarget, mode: ImageMode) -> Self {
        let (args, output_extension) = match (kind, mode) {
            (ArtifactKind::Graph, ImageMode::Raster) => ("-Tpng", ".png"),
            (ArtifactKind::Graph, ImageMode::Vector) => ("-Tsvg", ".svg"),
            (ArtifactKind::Uml, ImageMode::Raster) => ("", ".png"),
            (ArtifactKind::Uml, ImageMode::Vector) => ("-tsvg", ".svg"),
        };

        // LaTeX cannot include SVG; it embeds a PDF converted from the raw output.
        let embed_extension = match (mode, target) {
            (ImageMode::Vector, OutputTarget::Latex) => ".pdf",
            _ => output_extension,
        };

        Self {
            kind,
            command: kind.default_command().to_string(),
            args: args.to_string(),
            output_extension: output_extension.to_string(),
            embed_extension: embed_extension.to_string(),
            header: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    pub fn with_header(mut self, header: Option<String>) -> Self {
        self.header = header;
        self
    }

    /// Argument vector for rendering `paths`, program first.
    ///
    /// Graphviz receives an explicit `-o <output>`; PlantUML derives the output
    /// location from the source file name.
    pub fn command_line(&self, paths: &ArtifactPaths) -> Result<Vec<String>, BackendError> {
        let mut argv = tokenize(&self.command)?;
        if argv.is_empty() {
            return Err(BackendError::EmptyCommand { kind: self.kind });
        }
        argv.extend(tokenize(&self.args)?);

        match self.kind {
            ArtifactKind::Graph => {
                argv.push("-o".to_string());
                argv.push(path_arg(&paths.output));
                argv.push(path_arg(&paths.source));
            }
            ArtifactKind::Uml => argv.push(path_arg(&paths.source)),
        }

        Ok(argv)
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cannot parse command line `{input}`")]
    Command {
        input: String,
        #[source]
        source: shell_words::ParseError,
    },
    #[error("no command configured for {kind} rendering")]
    EmptyCommand { kind: ArtifactKind },
    #[error("failed to launch `{program}`")]
    Launch {
        program: String,
        command_line: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} call returned {}.", describe_exit(.exit_code))]
    Exit {
        program: String,
        command_line: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl BackendError {
    /// Text shown verbatim in the document: the error chain followed by the
    /// attempted command line and whatever the process printed.
    pub fn diagnostic(&self) -> String {
        let mut text = error_chain(self);

        match self {
            BackendError::Launch { command_line, .. } => {
                let _ = write!(text, "\ncommand: {command_line}");
            }
            BackendError::Exit {
                command_line,
                stdout,
                stderr,
                ..
            } => {
                let _ = write!(text, "\ncommand: {command_line}");
                if !stderr.trim().is_empty() {
                    let _ = write!(text, "\nstderr:\n{}", stderr.trim_end());
                }
                if !stdout.trim().is_empty() {
                    let _ = write!(text, "\nstdout:\n{}", stdout.trim_end());
                }
            }
            BackendError::Command { .. } | BackendError::EmptyCommand { .. } => {}
        }

        text
    }

    fn error_code(&self) -> &'static str {
        match self {
            BackendError::Command { .. } => "parse_command",
            BackendError::EmptyCommand { .. } => "empty_command",
            BackendError::Launch { source, .. } if source.kind() == ErrorKind::NotFound => {
                "backend_not_found"
            }
            BackendError::Launch { .. } => "spawn_backend",
            BackendError::Exit { .. } => "backend_exit",
        }
    }
}

/// Run the backend once, blocking until it exits. Any launch failure or
/// nonzero exit is an error; nothing is retried.
pub(crate) fn invoke(spec: &BackendSpec, paths: &ArtifactPaths) -> Result<(), BackendError> {
    let started_at = Instant::now();

    let argv = spec.command_line(paths).inspect_err(|err| {
        warn!(
            target = "application::render::backend",
            op = "backend::command_line",
            kind = %spec.kind,
            error_code = err.error_code(),
            error = %err,
            "Backend command line rejected"
        );
    })?;
    let command_line = shell_words::join(&argv);
    let (program, args) = argv
        .split_first()
        .ok_or(BackendError::EmptyCommand { kind: spec.kind })?;

    debug!(
        target = "application::render::backend",
        op = "backend::invoke",
        kind = %spec.kind,
        command = %command_line,
        "Invoking backend"
    );

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| BackendError::Launch {
            program: program.clone(),
            command_line: command_line.clone(),
            source,
        });

    let elapsed_ms = started_at.elapsed().as_millis() as u64;
    metrics::histogram!("figura_backend_ms", "kind" => spec.kind.as_str())
        .record(elapsed_ms as f64);

    let result = output.and_then(|output| {
        if output.status.success() {
            Ok(())
        } else {
            Err(BackendError::Exit {
                program: program.clone(),
                command_line: command_line.clone(),
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    });

    if let Err(err) = &result {
        warn!(
            target = "application::render::backend",
            op = "backend::invoke",
            kind = %spec.kind,
            result = "error",
            elapsed_ms,
            error_code = err.error_code(),
            error = %err,
            "Backend invocation failed"
        );
    }

    result
}

fn tokenize(input: &str) -> Result<Vec<String>, BackendError> {
    shell_words::split(input).map_err(|source| BackendError::Command {
        input: input.to_string(),
        source,
    })
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub(crate) fn error_chain(error: &dyn StdError) -> String {
    let mut text = error.to_string();
    let mut current = error.source();
    while let Some(inner) = current {
        let _ = write!(text, "\ncaused by: {inner}");
        current = inner.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn paths(stem: &str, output_ext: &str) -> ArtifactPaths {
        let stem = PathBuf::from(stem);
        ArtifactPaths {
            source: stem.with_extension("dot"),
            output: PathBuf::from(format!("{}{output_ext}", stem.display())),
            embed: PathBuf::from(format!("{}{output_ext}", stem.display())),
            stem,
        }
    }

    #[test]
    fn graph_vector_spec_for_latex_embeds_pdf() {
        let spec = BackendSpec::new(ArtifactKind::Graph, OutputTarget::Latex, ImageMode::Vector);
        assert_eq!(spec.args, "-Tsvg");
        assert_eq!(spec.output_extension, ".svg");
        assert_eq!(spec.embed_extension, ".pdf");
    }

    #[test]
    fn raster_mode_ignores_target() {
        for target in [OutputTarget::Html, OutputTarget::Latex] {
            let spec = BackendSpec::new(ArtifactKind::Uml, target, ImageMode::Raster);
            assert_eq!(spec.args, "");
            assert_eq!(spec.output_extension, ".png");
            assert_eq!(spec.embed_extension, ".png");
        }
    }

    #[test]
    fn graph_command_line_has_explicit_output() {
        let spec = BackendSpec::new(ArtifactKind::Graph, OutputTarget::Html, ImageMode::Vector);
        let argv = spec
            .command_line(&paths("images/my graph", ".svg"))
            .expect("command line");
        assert_eq!(
            argv,
            vec![
                "dot",
                "-Tsvg",
                "-o",
                "images/my graph.svg",
                "images/my graph.dot"
            ]
        );
    }

    #[test]
    fn uml_command_line_passes_only_the_source() {
        let spec = BackendSpec::new(ArtifactKind::Uml, OutputTarget::Html, ImageMode::Raster)
            .with_command("java -jar '/opt/plant uml/plantuml.jar'");
        let argv = spec
            .command_line(&paths("images/seq", ".png"))
            .expect("command line");
        assert_eq!(
            argv,
            vec!["java", "-jar", "/opt/plant uml/plantuml.jar", "images/seq.dot"]
        );
    }

    #[test]
    fn unbalanced_quotes_are_rejected() {
        let spec = BackendSpec::new(ArtifactKind::Graph, OutputTarget::Html, ImageMode::Raster)
            .with_args("-Tpng \"-Gdpi=300");
        let err = spec
            .command_line(&paths("images/g", ".png"))
            .expect_err("unbalanced quote");
        assert!(matches!(err, BackendError::Command { .. }));
    }

    #[test]
    fn blank_command_is_rejected() {
        let spec = BackendSpec::new(ArtifactKind::Graph, OutputTarget::Html, ImageMode::Raster)
            .with_command("   ");
        let err = spec
            .command_line(&paths("images/g", ".png"))
            .expect_err("empty command");
        assert!(matches!(err, BackendError::EmptyCommand { .. }));
    }

    #[test]
    fn missing_executable_is_a_launch_failure() {
        let spec = BackendSpec::new(ArtifactKind::Graph, OutputTarget::Html, ImageMode::Raster)
            .with_command("figura-test-no-such-binary");
        let err = invoke(&spec, &paths("images/g", ".png")).expect_err("launch failure");

        assert!(matches!(err, BackendError::Launch { .. }));
        let diagnostic = err.diagnostic();
        assert!(diagnostic.contains("failed to launch `figura-test-no-such-binary`"));
        assert!(diagnostic.contains("caused by:"));
        assert!(diagnostic.contains("command: figura-test-no-such-binary -Tpng -o"));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_captures_output() {
        let spec = BackendSpec::new(ArtifactKind::Uml, OutputTarget::Html, ImageMode::Raster)
            .with_command("sh -c 'echo syntax error >&2; exit 3' plantuml");
        let err = invoke(&spec, &paths("images/u", ".png")).expect_err("exit failure");

        match &err {
            BackendError::Exit { exit_code, .. } => assert_eq!(*exit_code, Some(3)),
            other => panic!("unexpected error variant: {other:?}"),
        }
        let diagnostic = err.diagnostic();
        assert!(diagnostic.starts_with("sh call returned 3."));
        assert!(diagnostic.contains("stderr:\nsyntax error"));
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        let spec = BackendSpec::new(ArtifactKind::Uml, OutputTarget::Html, ImageMode::Raster)
            .with_command("true");
        invoke(&spec, &paths("images/u", ".png")).expect("true succeeds");
    }
}
