//! Helpers for grammars whose tokens are `char`s.

use std::rc::Rc;

use thiserror::Error;

use crate::parser::{fail, pure, read, Parser};

/// An expectation mismatch: what the grammar wanted against what it got.
///
/// Semantic checks reuse the same shape with a descriptive `expected`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, received {received:?}")]
pub struct ParseError {
    pub expected: String,
    pub received: String,
}

impl ParseError {
    pub fn new(expected: impl Into<String>, received: impl Into<String>) -> Self {
        ParseError {
            expected: expected.into(),
            received: received.into(),
        }
    }
}

pub type CharParser<A> = Parser<char, ParseError, A>;

/// Reads one char for which `predicate` holds.
pub fn satisfy<F>(expected: impl Into<String>, predicate: F) -> CharParser<char>
where
    F: Fn(char) -> bool + 'static,
{
    let expected = expected.into();
    read(move |received: char| {
        if predicate(received) {
            pure(received)
        } else {
            fail(ParseError::new(expected.clone(), received))
        }
    })
}

pub fn char(c: char) -> CharParser<char> {
    satisfy(c, move |received| received == c)
}

/// Reads any char in `set`.
pub fn one_of(set: &str) -> CharParser<char> {
    let set = set.to_owned();
    let expected = format!("one of {}", set);
    satisfy(expected, move |received| set.contains(received))
}

/// Reads `s` one char at a time and yields it.
pub fn text(s: &str) -> CharParser<String> {
    fn step(s: Rc<str>, index: usize) -> CharParser<String> {
        let expected = match s[index..].chars().next() {
            Some(c) => c,
            None => return pure(s.to_string()),
        };
        read(move |received: char| {
            if received == expected {
                step(Rc::clone(&s), index + expected.len_utf8())
            } else {
                fail(ParseError::new(expected, received))
            }
        })
    }

    step(Rc::from(s), 0)
}
