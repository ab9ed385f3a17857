//! Driving a parse one token at a time.

use std::rc::Rc;

use log::debug;

use crate::machine::{Machine, Pool};
use crate::parser::Parser;
use crate::state::{Continuations, ParseState, ParserResult};

/// Starts parsing with `parser`. Evaluates up to the first reads.
///
/// Every call uses fresh fix slots, so any number of parses of the same
/// parser may be in flight at once.
pub fn begin<T, E, R>(parser: &Parser<T, E, R>) -> ParseState<T, E, R>
where
    E: Clone,
    R: Clone + 'static,
{
    let pool = Rc::new(Pool::new());
    let (result, conts) = Machine::new(&pool).start(Rc::clone(&parser.node));
    ParseState {
        result,
        continuations: Continuations::new(conts, pool),
    }
}

/// Resumes every suspended read with `token`.
///
/// `continuations` is left untouched and may be resumed again, with the same
/// or another token.
pub fn next<T, E, R>(continuations: &Continuations<T, E, R>, token: T) -> ParseState<T, E, R>
where
    T: 'static,
    E: Clone,
    R: Clone + 'static,
{
    let pool = Rc::clone(&continuations.pool);
    pool.sweep();
    let (result, conts) = Machine::new(&pool).feed(&continuations.conts, Rc::new(token));
    ParseState {
        result,
        continuations: Continuations::new(conts, pool),
    }
}

/// The usual loop over `begin` and `next`.
///
/// ```
/// use fixparse::chars::text;
/// use fixparse::Session;
///
/// let mut session = Session::new(&text("ab"));
/// assert!(session.feed('a'));
/// assert!(session.feed('b'));
/// assert!(session.is_dead());
/// assert!(!session.feed('c'));
/// assert_eq!(session.consumed(), 2);
/// assert!(session.result().is_success());
/// ```
pub struct Session<T, E, R> {
    state: ParseState<T, E, R>,
    consumed: usize,
}

impl<T, E, R> Session<T, E, R>
where
    T: 'static,
    E: Clone,
    R: Clone + 'static,
{
    pub fn new(parser: &Parser<T, E, R>) -> Self {
        Session {
            state: begin(parser),
            consumed: 0,
        }
    }

    /// Feeds one token. Returns false, leaving the state as it is, when no
    /// read was waiting for it.
    pub fn feed(&mut self, token: T) -> bool {
        if self.is_dead() {
            return false;
        }
        self.state = next(&self.state.continuations, token);
        self.consumed += 1;
        if self.is_dead() {
            debug!("parse finished after {} token(s)", self.consumed);
        }
        true
    }

    /// Feeds tokens until they run out or the parse dies. Returns how many
    /// were consumed.
    pub fn feed_all<I>(&mut self, tokens: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let before = self.consumed;
        for token in tokens {
            if !self.feed(token) {
                break;
            }
        }
        self.consumed - before
    }

    /// No further token can change the result.
    pub fn is_dead(&self) -> bool {
        self.state.continuations.is_empty()
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn state(&self) -> &ParseState<T, E, R> {
        &self.state
    }

    pub fn result(&self) -> &ParserResult<E, R> {
        &self.state.result
    }

    pub fn finish(self) -> ParserResult<E, R> {
        self.state.result
    }
}

/// Parses all of `tokens`, stopping early once the parse is dead.
pub fn parse<T, E, R, I>(parser: &Parser<T, E, R>, tokens: I) -> ParserResult<E, R>
where
    T: 'static,
    E: Clone,
    R: Clone + 'static,
    I: IntoIterator<Item = T>,
{
    let mut session = Session::new(parser);
    session.feed_all(tokens);
    session.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::{char, CharParser};
    use crate::fix::Fix;
    use crate::machine::SWEEP_THRESHOLD;
    use crate::parser::{alt, map2, map3};

    /// List = List ',' Word | Word; Word = Word 'a' | 'a'. Counts the words.
    fn words() -> CharParser<usize> {
        let mut fix = Fix::new();
        let word = fix.declare::<()>("word");
        let list = fix.declare::<usize>("list");
        fix.define(word, move |g| {
            alt(vec![map2(|_, _| (), g.get(word), char('a')), char('a').map(|_| ())])
        });
        fix.define(list, move |g| {
            alt(vec![
                map3(|n, _, _| n + 1, g.get(list), char(','), g.get(word)),
                g.get(word).map(|_| 1),
            ])
        });
        fix.finish().unwrap().get(list)
    }

    fn input(words: usize) -> impl Iterator<Item = char> {
        (0..words).flat_map(|i| if i == 0 { vec!['a'] } else { vec![',', 'a'] })
    }

    #[test]
    fn finished_entries_are_released() {
        let mut state = begin(&words());
        for c in input(10_000) {
            state = next(&state.continuations, c);
            assert!(state.continuations.pool.len() < 2 * SWEEP_THRESHOLD);
        }
        assert_eq!(state.result.values().map(|v| v.to_vec()), Some(vec![10_000]));
    }

    #[test]
    fn kept_states_survive_sweeps() {
        let mut state = begin(&words());
        for c in input(2) {
            state = next(&state.continuations, c);
        }
        let kept = next(&state.continuations, ',');

        for _ in 0..5_000 {
            state = next(&state.continuations, ',');
            state = next(&state.continuations, 'a');
        }
        assert_eq!(state.result.values().map(|v| v.to_vec()), Some(vec![5_002]));

        let resumed = next(&kept.continuations, 'a');
        assert_eq!(resumed.result.values().map(|v| v.to_vec()), Some(vec![3]));
    }
}
