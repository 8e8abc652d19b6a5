//! Learning features from parsed show commands.
//!
//! An [`OpsDefinition`] lists, per feature, which parsed command output
//! lands where in the snapshot tree. Each leaf copies the subtrees found at
//! a source bracket path into a destination bracket path, with captures
//! carried across:
//!
//! ```text
//! show arp   [interfaces][(?P<intf>.*)][ipv4]  ->  info[interfaces][(?P<intf>.*)][ipv4]
//! ```
//!
//! Parsing itself is left to a [`CommandParser`]. [`OpsLearner`] puts the
//! two together behind the engine's [`StateLearner`](crate::engine::StateLearner).

mod definition;
mod recorded;
pub mod vendors;

pub use definition::{Leaf, OpsDefinition, OpsLearner};
pub use recorded::RecordedOutputs;

use std::future::Future;

use crate::error::Result;
use crate::snapshot::Value;

/// Runs a show command and returns its parsed output.
pub trait CommandParser: Send {
    /// Run and parse one command.
    ///
    /// An output with nothing to parse should be an error; the learner
    /// treats every parse error as "no data from this command".
    fn parse(&mut self, command: &str) -> impl Future<Output = Result<Value>> + Send;
}
