use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
    process,
};

use figura::{
    application::error::AppError,
    application::render::{
        Directive, RawOptions, RenderPipelineConfig, configure_render_service,
        directive_renderer,
    },
    config::{self, Command, HighlightArgs, RenderArgs},
    domain::{nodes::EmbeddedNode, types::DirectiveKind},
    infra::{error::InfraError, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;
    configure_render_service(RenderPipelineConfig::from(&settings.render))?;

    match cli_args.command {
        Command::Render(args) => run_render(args),
        Command::Highlight(args) => run_highlight(args),
    }
}

fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let content = if args.reuse {
        Vec::new()
    } else {
        read_content(args.input.as_deref())?
    };

    let mut directive = Directive::new(DirectiveKind::from(args.kind), args.line)
        .with_content(content);
    directive.options = args.options.into_iter().collect::<RawOptions>();
    if let Some(name) = args.name {
        directive = directive.with_argument(name);
    }

    let nodes = directive_renderer().run(&directive)?;
    info!(
        target = "figura::render",
        kind = %args.kind,
        line = args.line,
        nodes = nodes.len(),
        failed = nodes.iter().any(EmbeddedNode::is_error),
        "Directive rendered"
    );
    print_nodes(&nodes)
}

fn run_highlight(args: HighlightArgs) -> Result<(), AppError> {
    let content = read_content(args.input.as_deref())?;

    let mut directive = Directive::new(DirectiveKind::Code, args.line)
        .with_argument(args.language)
        .with_content(content);
    directive.options = args.options.into_iter().collect::<RawOptions>();

    let nodes = directive_renderer().run(&directive)?;
    print_nodes(&nodes)
}

fn read_content(input: Option<&Path>) -> Result<Vec<String>, AppError> {
    let text = match input {
        Some(path) => fs::read_to_string(path).map_err(InfraError::from)?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(InfraError::from)?;
            buffer
        }
    };
    Ok(text.lines().map(str::to_string).collect())
}

fn print_nodes(nodes: &[EmbeddedNode]) -> Result<(), AppError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, nodes).map_err(InfraError::from)?;
    writeln!(out).map_err(InfraError::from)?;
    Ok(())
}
