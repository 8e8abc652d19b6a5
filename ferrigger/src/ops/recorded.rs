//! Parser over pre-recorded outputs.

use indexmap::IndexMap;

use crate::error::{Result, SnapshotError};
use crate::snapshot::Value;

use super::CommandParser;

/// A [`CommandParser`] that replays parsed outputs recorded per command.
#[derive(Debug, Clone, Default)]
pub struct RecordedOutputs {
    outputs: IndexMap<String, Value>,
    calls: Vec<String>,
}

impl RecordedOutputs {
    /// Create a parser with no outputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the parsed output of a command.
    pub fn with_output(mut self, command: impl Into<String>, output: serde_json::Value) -> Self {
        self.outputs.insert(command.into(), Value::from(output));
        self
    }

    /// Commands parsed so far, in order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl CommandParser for RecordedOutputs {
    async fn parse(&mut self, command: &str) -> Result<Value> {
        self.calls.push(command.to_string());
        match self.outputs.get(command) {
            Some(Value::Map(map)) if map.is_empty() => Err(SnapshotError::Parse {
                command: command.to_string(),
                message: "parser returned nothing".to_string(),
            }
            .into()),
            Some(output) => Ok(output.clone()),
            None => Err(SnapshotError::Parse {
                command: command.to_string(),
                message: "no output recorded".to_string(),
            }
            .into()),
        }
    }
}
