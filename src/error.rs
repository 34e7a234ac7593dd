/// Errors raised while configuring a binder or executing a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("property `{property}` is watched both as a collection and as an object")]
    ShapeConflict { property: String },
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
