use crate::pipeline::PassName;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Token stream failed: {0}")]
    Stream(String),

    #[error("{pass} pass returned malformed JSON: {message}")]
    Parse { pass: PassName, message: String },

    #[error("{pass} pass response violated its schema: {message}")]
    Schema { pass: PassName, message: String },

    #[error("Research service error: {0}")]
    Research(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Event stream closed by consumer")]
    Cancelled,
}

impl PipelineError {
    pub fn parse(pass: PassName, message: impl Into<String>) -> Self {
        Self::Parse {
            pass,
            message: message.into(),
        }
    }

    pub fn schema(pass: PassName, message: impl Into<String>) -> Self {
        Self::Schema {
            pass,
            message: message.into(),
        }
    }

    /// Errors that enrichment passes absorb instead of halting the pipeline
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::Research(_) | Self::Retrieval(_) | Self::Llm(_) | Self::Request(_)
        )
    }

    /// Whether the failure came from the model's output rather than transport
    pub fn is_response_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Schema { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_the_pass() {
        let err = PipelineError::schema(PassName::Idea, "expected at least 3 ideas, got 2");
        assert_eq!(
            err.to_string(),
            "idea pass response violated its schema: expected at least 3 ideas, got 2"
        );
        assert!(err.is_response_error());
        assert!(!err.is_degradable());
    }

    #[test]
    fn test_parse_and_schema_are_distinct_kinds() {
        let parse = PipelineError::parse(PassName::Angle, "expected value at line 1");
        let schema = PipelineError::schema(PassName::Angle, "angles must not be empty");
        assert!(matches!(parse, PipelineError::Parse { .. }));
        assert!(matches!(schema, PipelineError::Schema { .. }));
    }

    #[test]
    fn test_collaborator_failures_are_degradable() {
        assert!(PipelineError::Research("timeout".into()).is_degradable());
        assert!(PipelineError::Retrieval("index missing".into()).is_degradable());
        assert!(!PipelineError::Cancelled.is_degradable());
    }
}
