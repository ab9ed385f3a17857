use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::list::{List, NonEmpty};
use crate::machine::{Cont, Pool};

/// Outcome of a parse at some position.
///
/// A success always carries at least one value. Once any branch succeeds,
/// errors from failing siblings are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserResult<E, R> {
    Failure { errors: List<E> },
    Success { values: NonEmpty<R> },
}

impl<E, R> ParserResult<E, R> {
    /// A failure with no errors, the state before anything happened.
    pub fn empty() -> Self {
        ParserResult::Failure {
            errors: List::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ParserResult::Success { .. })
    }

    pub fn values(&self) -> Option<&NonEmpty<R>> {
        match self {
            ParserResult::Success { values } => Some(values),
            ParserResult::Failure { .. } => None,
        }
    }

    pub fn errors(&self) -> Option<&List<E>> {
        match self {
            ParserResult::Failure { errors } => Some(errors),
            ParserResult::Success { .. } => None,
        }
    }

    /// Records `error` unless something already succeeded.
    pub(crate) fn fail(&mut self, error: E) {
        if let ParserResult::Failure { errors } = self {
            *errors = errors.cons(error);
        }
    }

    /// Records `value`, discarding errors gathered so far.
    pub(crate) fn succeed(&mut self, value: R) {
        let tail = match self {
            ParserResult::Success { values } => values.to_list(),
            ParserResult::Failure { .. } => List::new(),
        };
        *self = ParserResult::Success {
            values: NonEmpty::new(value, tail),
        };
    }
}

impl<E, R> Default for ParserResult<E, R> {
    fn default() -> Self {
        ParserResult::empty()
    }
}

/// Reads suspended at the current position, waiting for the next token.
///
/// Typed by the result type of the parse they belong to. Cloning is cheap
/// and both copies may be resumed independently.
pub struct Continuations<T, E, R> {
    pub(crate) conts: List<Cont<T, E>>,
    pub(crate) pool: Rc<Pool<T, E>>,
    marker: PhantomData<fn() -> R>,
}

impl<T, E, R> Continuations<T, E, R> {
    pub(crate) fn new(conts: List<Cont<T, E>>, pool: Rc<Pool<T, E>>) -> Self {
        pool.track(&conts);
        Continuations {
            conts,
            pool,
            marker: PhantomData,
        }
    }

    /// No read is waiting; further tokens cannot change the result.
    pub fn is_empty(&self) -> bool {
        self.conts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conts.len()
    }
}

impl<T, E, R> Clone for Continuations<T, E, R> {
    fn clone(&self) -> Self {
        Continuations {
            conts: self.conts.clone(),
            pool: Rc::clone(&self.pool),
            marker: PhantomData,
        }
    }
}

impl<T, E, R> fmt::Debug for Continuations<T, E, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Continuations({})", self.len())
    }
}

/// Everything known after some prefix of the input.
pub struct ParseState<T, E, R> {
    pub result: ParserResult<E, R>,
    pub continuations: Continuations<T, E, R>,
}

impl<T, E, R> Clone for ParseState<T, E, R>
where
    E: Clone,
    R: Clone,
{
    fn clone(&self) -> Self {
        ParseState {
            result: self.result.clone(),
            continuations: self.continuations.clone(),
        }
    }
}

impl<T, E, R> fmt::Debug for ParseState<T, E, R>
where
    E: fmt::Debug,
    R: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ParseState")
            .field("result", &self.result)
            .field("continuations", &self.continuations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type R = ParserResult<&'static str, u32>;

    fn errors(result: &R) -> Vec<&'static str> {
        result.errors().map(|e| e.iter().copied().collect()).unwrap_or_default()
    }

    #[test]
    fn failures_accumulate() {
        let mut result = R::empty();
        assert_eq!(errors(&result), Vec::<&str>::new());
        result.fail("b");
        result.fail("a");
        assert!(!result.is_success());
        assert_eq!(errors(&result), vec!["a", "b"]);
    }

    #[test]
    fn success_dominates() {
        let mut result = R::empty();
        result.fail("lost");
        result.succeed(1);
        assert!(result.errors().is_none());
        result.fail("ignored");
        result.succeed(2);
        assert_eq!(result.values().map(NonEmpty::to_vec), Some(vec![2, 1]));
    }

    #[test]
    fn default_is_empty_failure() {
        assert_eq!(R::default(), R::Failure { errors: List::new() });
    }
}
