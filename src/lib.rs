//! Declarative change rules over observable object graphs.
//!
//! A rule says "when any of these paths change, run this action". The binder
//! merges the paths of every rule into one [`PathGraph`], and each
//! [`attach`](PropertyBinder::attach) mirrors that graph onto a live context as
//! a [`WatcherTree`] of subscriptions. Replacing a nested object or changing
//! a watched collection re-subscribes the affected part of the tree.

mod bind;
mod binder;
mod command;
mod error;
mod graph;
mod path;
mod registry;
mod rule;
mod watcher;

pub use bind::PropertyRuleBuilder;
pub use binder::PropertyBinder;
pub use command::{CAN_EXECUTE, CheckMode, Command, CommandRuleBuilder};
pub use error::{Error, Result};
pub use graph::PathGraph;
pub use path::{IntoPaths, PathDescriptor, PathStep, StepKind};
pub use registry::{Action, ActionId, RuleRegistry};
pub use rule::Rule;
pub use watcher::WatcherTree;

pub use propbind_notify as notify;
