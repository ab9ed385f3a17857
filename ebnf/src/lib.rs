//! EBNF grammars, parsed with `nom` and run on `fixparse`.
//!
//! Any context-free grammar written in EBNF can be compiled, including
//! ambiguous and left-recursive ones.

use std::fmt::{self, Display};
use std::str::FromStr;

use nom::character::complete::multispace0;
use nom::combinator::all_consuming;
use nom::sequence::terminated;

mod compile;
mod error;
mod parser;
mod source;

pub use compile::{CompiledGrammar, Dfs, Tree};
pub use error::Error;
pub use source::GrammarSource;

/// The name of a production.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier(s.to_owned())
    }
}

/// A literal string, kept as written between its quotes.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Terminal(pub String);

impl Display for Terminal {
    /// Double quotes unless the text contains one. Text holding both quote
    /// characters has no EBNF spelling.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let quote = if self.0.contains('"') { '\'' } else { '"' };
        write!(f, "{}{}{}", quote, self.0, quote)
    }
}

impl From<&str> for Terminal {
    fn from(s: &str) -> Self {
        Terminal(s.to_owned())
    }
}

/// The lhs of a production rule.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Lhs(pub Identifier);

impl Lhs {
    pub fn name(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Lhs {
    fn from(s: &str) -> Self {
        Lhs(s.into())
    }
}

impl Display for Lhs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The rhs of a production rule. Parentheses only group and leave no node
/// behind.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Rhs {
    Identifier(Identifier),
    Terminal(Terminal),
    Optional(Box<Rhs>),
    Repeat(Box<Rhs>),
    Exception(Box<Rhs>, Box<Rhs>),
    Alternation(Box<Rhs>, Box<Rhs>),
    Concatenation(Box<Rhs>, Box<Rhs>),
}

impl Rhs {
    pub fn ident(name: &str) -> Rhs {
        Rhs::Identifier(name.into())
    }

    pub fn term(text: &str) -> Rhs {
        Rhs::Terminal(text.into())
    }

    pub fn optional(rhs: Rhs) -> Rhs {
        Rhs::Optional(Box::new(rhs))
    }

    pub fn repeat(rhs: Rhs) -> Rhs {
        Rhs::Repeat(Box::new(rhs))
    }

    pub fn except(rhs: Rhs, excluded: Rhs) -> Rhs {
        Rhs::Exception(Box::new(rhs), Box::new(excluded))
    }

    pub fn alt(a: Rhs, b: Rhs) -> Rhs {
        Rhs::Alternation(Box::new(a), Box::new(b))
    }

    pub fn concat(a: Rhs, b: Rhs) -> Rhs {
        Rhs::Concatenation(Box::new(a), Box::new(b))
    }

    /// How tightly the outermost operator binds. Primaries bind tightest.
    fn precedence(&self) -> u8 {
        match self {
            Rhs::Alternation(..) => 1,
            Rhs::Concatenation(..) => 2,
            Rhs::Exception(..) => 3,
            _ => 4,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter, parenthesize: bool) -> fmt::Result {
        if parenthesize {
            write!(f, "( {} )", self)
        } else {
            write!(f, "{}", self)
        }
    }

    /// Chains nest to the right when parsed, so a left operand at the same
    /// level needs parentheses as well.
    fn fmt_binary(&self, f: &mut fmt::Formatter, op: &str, a: &Rhs, b: &Rhs) -> fmt::Result {
        let level = self.precedence();
        a.fmt_operand(f, a.precedence() <= level)?;
        write!(f, " {} ", op)?;
        b.fmt_operand(f, b.precedence() < level)
    }
}

impl Display for Rhs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rhs::Identifier(name) => name.fmt(f),
            Rhs::Terminal(text) => text.fmt(f),
            Rhs::Optional(inner) => write!(f, "[ {} ]", inner),
            Rhs::Repeat(inner) => write!(f, "{{ {} }}", inner),
            Rhs::Exception(a, b) => self.fmt_binary(f, "-", a, b),
            Rhs::Alternation(a, b) => self.fmt_binary(f, "|", a, b),
            Rhs::Concatenation(a, b) => self.fmt_binary(f, ",", a, b),
        }
    }
}

impl FromStr for Rhs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, rhs) = all_consuming(terminated(parser::rhs, multispace0))(s)?;
        Ok(rhs)
    }
}

/// A production rule.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Production {
    pub lhs: Lhs,
    pub rhs: Rhs,
}

impl Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {} ;", self.lhs, self.rhs)
    }
}

impl FromStr for Production {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, production) = all_consuming(terminated(parser::production, multispace0))(s)?;
        Ok(production)
    }
}

/// A set of rules.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Grammar {
    pub rules: Vec<Production>,
}

impl Grammar {
    pub fn get(&self, name: &str) -> Option<&Production> {
        self.rules.iter().find(|rule| rule.lhs.name() == name)
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}

impl FromStr for Grammar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, grammar) = all_consuming(parser::grammar)(s)?;
        Ok(grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Debug;
    use std::string::ToString;

    fn assert_lossless_conversion<T, E>(t: T)
    where
        T: ToString + FromStr<Err = E> + Eq + Debug,
        E: std::error::Error,
    {
        let s = t.to_string();
        let t_parse = T::from_str(&s).unwrap();
        assert_eq!(t, t_parse, "To string:\n{}\n", s);
    }

    #[test]
    fn lossless_rhs() {
        let a = || Rhs::ident("a");
        let b = || Rhs::ident("b");
        let c = || Rhs::term("c");
        let tests = vec![
            Rhs::except(Rhs::term("hello"), Rhs::ident("world")),
            Rhs::alt(a(), Rhs::alt(b(), Rhs::concat(c(), Rhs::term("d")))),
            Rhs::concat(Rhs::alt(a(), b()), c()),
            Rhs::concat(Rhs::concat(a(), b()), c()),
            Rhs::alt(Rhs::alt(a(), b()), c()),
            Rhs::except(Rhs::except(a(), b()), c()),
            Rhs::except(Rhs::concat(a(), b()), Rhs::alt(a(), c())),
            Rhs::repeat(Rhs::alt(a(), Rhs::optional(Rhs::concat(b(), c())))),
            Rhs::term("say \"hi\""),
            Rhs::term("it's"),
            Rhs::term(""),
        ];

        for test in tests {
            assert_lossless_conversion(test);
        }
    }

    #[test]
    fn display_parenthesizes_only_when_needed() {
        let a = || Rhs::ident("a");
        let b = || Rhs::ident("b");
        let c = || Rhs::ident("c");
        let tests = vec![
            (Rhs::concat(Rhs::alt(a(), b()), c()), "( a | b ) , c"),
            (Rhs::concat(a(), Rhs::concat(b(), c())), "a , b , c"),
            (Rhs::alt(Rhs::concat(a(), b()), c()), "a , b | c"),
            (Rhs::term("say \"hi\""), "'say \"hi\"'"),
        ];
        for (rhs, want) in tests {
            assert_eq!(rhs.to_string(), want);
        }
    }

    #[test]
    fn lossless_rule() {
        let rule = Production {
            lhs: "a".into(),
            rhs: Rhs::ident("b"),
        };

        assert_lossless_conversion(rule)
    }

    #[test]
    fn lossless_grammar() {
        let g = Grammar {
            rules: vec![
                Production {
                    lhs: "a".into(),
                    rhs: Rhs::concat(Rhs::ident("b"), Rhs::repeat(Rhs::term(","))),
                },
                Production {
                    lhs: "b".into(),
                    rhs: Rhs::except(Rhs::ident("c"), Rhs::term("x")),
                },
            ],
        };

        assert_lossless_conversion(g);
    }

    #[test]
    fn trailing_input_rejected() {
        assert!("a = b ; c".parse::<Grammar>().is_err());
        assert!("a b".parse::<Rhs>().is_err());
        assert!("a = b ;\n".parse::<Production>().is_ok());
    }

    #[test]
    fn get_production() {
        let g: Grammar = "a = 'x' ; b = a , a ;".parse().unwrap();
        assert_eq!(g.get("b").map(|p| p.rhs.to_string()), Some("a , a".to_owned()));
        assert!(g.get("c").is_none());
    }
}
