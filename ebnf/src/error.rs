use fixparse::FixError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse: {0}")]
    Syntax(String),
    #[error("rule `{0}` is used but never defined")]
    UndefinedRule(String),
    #[error("rule `{0}` is defined more than once")]
    DuplicateRule(String),
    #[error("grammar has no rule `{0}`")]
    UnknownRule(String),
    #[error(transparent)]
    Fix(#[from] FixError),
}

impl From<nom::Err<nom::error::Error<&str>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Error {
        Error::Syntax(format!("{:?}", err))
    }
}
