//! Path requirements over learned state.
//!
//! A requirement is a list of steps such as
//! `["info", "(?P<interface>.*)", "enabled", true]`. Every step but the last
//! selects keys (literally or by regex, optionally binding a named capture);
//! the last step states what must hold there. Evaluating a requirement
//! against a snapshot yields every `(path, bindings, leaf)` that satisfies
//! it, or the reason none does.
//!
//! # Example
//!
//! ```
//! use ferrigger::path::{CaptureBindings, RequirementSet};
//! use ferrigger::snapshot::{ExclusionSet, Value};
//! use ferrigger::steps;
//! use indexmap::IndexSet;
//!
//! let tree = Value::from(serde_json::json!({
//!     "interfaces": {
//!         "Eth1": {"enabled": true, "oper_status": "up"},
//!         "Eth2": {"enabled": false},
//!     }
//! }));
//!
//! let set = RequirementSet::from_steps([
//!     steps!["interfaces", r"(?P<interface>Eth\d+)", "enabled", true],
//! ]).unwrap();
//!
//! let found = set.resolve(&tree, &ExclusionSet::new(), &IndexSet::new()).unwrap();
//! assert_eq!(found[0].get("interface"), Some("Eth1"));
//! ```

mod bindings;
mod matcher;
mod pattern;
mod requirement;
mod spec;

pub use bindings::CaptureBindings;
pub use matcher::{evaluate, Evaluation, FailureRank, Match, Unsatisfied};
pub use pattern::{KeyMatch, KeyPattern, WILDCARD};
pub use requirement::{Requirement, RequirementFailure, RequirementSet};
pub use spec::{exists, not_exists, PathSpec, Sentinel, Step, Terminal};
