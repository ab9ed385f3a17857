//! An incremental parser-combinator engine.
//!
//! Grammars are built from a handful of combinators (`pure`, `fail`, `read`,
//! `bind`, `alt` and the `map` family) plus fix groups for recursion. Any
//! composition is supported, including ambiguous, mutually recursive and
//! left-recursive grammars: every derivation is kept, and no grammar can
//! overflow the native stack.
//!
//! Input is fed one token at a time with [`begin`] and [`next`], or with the
//! [`Session`] and [`parse`] helpers built on top of them.
//!
//! ```
//! use fixparse::chars::{char, CharParser};
//! use fixparse::{alt, fixpoint, map2, parse};
//!
//! // Left recursive: count = count 'a' | 'a'
//! let count: CharParser<usize> = fixpoint("count", |count| {
//!     alt(vec![
//!         map2(|n, _| n + 1, count, char('a')),
//!         char('a').map(|_| 1),
//!     ])
//! });
//! let result = parse(&count, "aaaa".chars());
//! assert_eq!(result.values().unwrap().to_vec(), vec![4]);
//! ```

pub mod chars;
mod error;
mod fix;
mod list;
mod machine;
mod parser;
mod session;
mod state;

pub use error::FixError;
pub use fix::{fixpoint, Fix, GroupView, Member};
pub use list::{Iter, List, NonEmpty};
pub use parser::{
    alt, bind, fail, map, map2, map3, map4, map5, map_all, pure, read, Parser,
};
pub use session::{begin, next, parse, Session};
pub use state::{Continuations, ParseState, ParserResult};
