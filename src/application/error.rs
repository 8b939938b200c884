use thiserror::Error;

use crate::{
    application::render::{DirectiveError, RenderConfigError},
    config::LoadError,
    infra::error::InfraError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    RenderConfig(#[from] RenderConfigError),
    #[error(transparent)]
    Directive(#[from] DirectiveError),
}

impl AppError {
    /// Process exit status for this error: 2 for invalid input, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Directive(_) | AppError::Config(_) => 2,
            AppError::Infra(_) | AppError::RenderConfig(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::OptionError;

    #[test]
    fn directive_errors_are_input_errors() {
        let err = AppError::from(DirectiveError::Option {
            directive: "code",
            source: OptionError::Unknown {
                name: "bogus".into(),
            },
        });
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("\"code\" directive"));
    }

    #[test]
    fn infra_errors_are_failures() {
        let err = AppError::from(InfraError::telemetry("already installed"));
        assert_eq!(err.exit_code(), 1);

        let err = AppError::from(RenderConfigError::AlreadyConfigured);
        assert_eq!(err.exit_code(), 1);
    }
}
