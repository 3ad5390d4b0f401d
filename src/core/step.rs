//! Step domain model

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

/// Matches `{{ name }}` placeholders in command tokens
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
});

/// How a step's failure affects the rest of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    /// A non-zero exit halts every later step
    #[default]
    Blocking,
    /// A non-zero exit is logged and the pipeline continues
    Advisory,
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criticality::Blocking => write!(f, "blocking"),
            Criticality::Advisory => write!(f, "advisory"),
        }
    }
}

/// A single step in a pipeline
///
/// Steps are immutable once built; run state lives in the engine's report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Unique step name (e.g. `health_check`)
    pub name: String,

    /// Human-readable banner text
    pub description: String,

    /// Program followed by its arguments; never handed to a shell
    pub command: Vec<String>,

    /// Whether failure halts the pipeline
    pub criticality: Criticality,

    /// Pause applied after the step finishes, before the next one starts
    pub post_delay: Duration,

    /// Capture stdout/stderr instead of streaming them to the terminal
    pub capture_output: bool,

    /// Upper bound on the command's runtime; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Step {
    pub fn new<I, S>(
        name: impl Into<String>,
        description: impl Into<String>,
        criticality: Criticality,
        command: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            command: command.into_iter().map(Into::into).collect(),
            criticality,
            post_delay: Duration::ZERO,
            capture_output: false,
            timeout: None,
        }
    }

    pub fn blocking<I, S>(name: impl Into<String>, description: impl Into<String>, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, description, Criticality::Blocking, command)
    }

    pub fn advisory<I, S>(name: impl Into<String>, description: impl Into<String>, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, description, Criticality::Advisory, command)
    }

    pub fn with_post_delay(mut self, delay: Duration) -> Self {
        self.post_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn capturing(mut self) -> Self {
        self.capture_output = true;
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.criticality == Criticality::Blocking
    }

    /// The command as an operator would type it, for banners and logs
    pub fn command_line(&self) -> String {
        display_command(&self.command)
    }
}

/// Join argument tokens for display, quoting any token a shell would split
pub fn display_command(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|token| {
            if token.is_empty() || token.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
                format!("{:?}", token)
            } else {
                token.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Names of all `{{ name }}` placeholders in a token, in order of appearance
pub fn placeholders(token: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(token)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Substitute `{{ name }}` placeholders in a token
///
/// Returns the name of the first placeholder with no value.
pub fn render_token(token: &str, variables: &HashMap<String, String>) -> Result<String, String> {
    if let Some(missing) = placeholders(token)
        .into_iter()
        .find(|name| !variables.contains_key(name))
    {
        return Err(missing);
    }

    Ok(PLACEHOLDER
        .replace_all(token, |caps: &regex::Captures<'_>| variables[&caps[1]].clone())
        .into_owned())
}
