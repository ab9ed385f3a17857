use thiserror::Error;

/// Mistakes made while building a fix group.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    #[error("member `{0}` was declared but never defined")]
    Undefined(String),
    #[error("member `{0}` was defined more than once")]
    Redefined(String),
    #[error("member belongs to a different fix group")]
    ForeignMember,
}
