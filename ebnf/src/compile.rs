//! Turns EBNF productions into `fixparse` parsers.
//!
//! Every production becomes a member of one fix group, so rules may refer to
//! each other in any order and recursion, left recursion included, just
//! works. Terminals may use the escapes `\n`, `\r`, `\t` and `\\`.

use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, Context};
use fixparse::chars::{text, CharParser, ParseError};
use fixparse::{alt, bind, fail, fixpoint, map2, parse, pure, Fix, GroupView, Member, ParserResult};
use log::debug;

use crate::{Error, Grammar, GrammarSource, Rhs};

/// A node in a parse tree: the rule that matched and the text it covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub rule: String,
    pub text: String,
    pub children: Vec<Tree>,
}

impl Tree {
    /// Walks the tree depth first, parents before children.
    pub fn iter(&self) -> Dfs<'_> {
        Dfs { stack: vec![self] }
    }

    /// Every node matched by `rule`, in depth first order.
    pub fn find_all(&self, rule: &str) -> Vec<&Tree> {
        self.iter().filter(|tree| tree.rule == rule).collect()
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rule)?;
        if self.children.is_empty() {
            return write!(f, "({:?})", self.text);
        }
        write!(f, "(")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", child)?;
        }
        write!(f, ")")
    }
}

pub struct Dfs<'a> {
    stack: Vec<&'a Tree>,
}

impl<'a> Iterator for Dfs<'a> {
    type Item = &'a Tree;

    fn next(&mut self) -> Option<&'a Tree> {
        let tree = self.stack.pop()?;
        self.stack.extend(tree.children.iter().rev());
        Some(tree)
    }
}

/// What a rhs matched so far: its text and the rule matches inside it.
#[derive(Debug, Clone, Default)]
struct Fragment {
    text: String,
    children: Vec<Tree>,
}

impl Fragment {
    fn join(mut self, other: Fragment) -> Fragment {
        self.text.push_str(&other.text);
        self.children.extend(other.children);
        self
    }
}

/// A rhs with its rule references resolved.
enum Expr {
    Rule(Member<Tree>),
    Text(String),
    Optional(Box<Expr>),
    Repeat(Box<Expr>),
    Exception(Box<Expr>, Box<Expr>, String),
    Alternation(Box<Expr>, Box<Expr>),
    Concatenation(Box<Expr>, Box<Expr>),
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn resolve(rhs: &Rhs, rules: &HashMap<String, Member<Tree>>) -> Result<Expr, Error> {
    let pair = |a: &Rhs, b: &Rhs| -> Result<(Box<Expr>, Box<Expr>), Error> {
        Ok((Box::new(resolve(a, rules)?), Box::new(resolve(b, rules)?)))
    };
    Ok(match rhs {
        Rhs::Identifier(iden) => match rules.get(&iden.0) {
            Some(member) => Expr::Rule(*member),
            None => return Err(Error::UndefinedRule(iden.0.clone())),
        },
        Rhs::Terminal(term) => Expr::Text(unescape(&term.0)),
        Rhs::Optional(inner) => Expr::Optional(Box::new(resolve(inner, rules)?)),
        Rhs::Repeat(inner) => Expr::Repeat(Box::new(resolve(inner, rules)?)),
        Rhs::Exception(a, excluded) => {
            let description = format!("anything but {}", excluded);
            let (a, b) = pair(a, excluded)?;
            Expr::Exception(a, b, description)
        }
        Rhs::Alternation(a, b) => {
            let (a, b) = pair(a, b)?;
            Expr::Alternation(a, b)
        }
        Rhs::Concatenation(a, b) => {
            let (a, b) = pair(a, b)?;
            Expr::Concatenation(a, b)
        }
    })
}

type Group = GroupView<char, ParseError>;

fn build(expr: &Expr, group: &Group) -> CharParser<Fragment> {
    match expr {
        Expr::Rule(member) => group.get(*member).map(|tree: Tree| Fragment {
            text: tree.text.clone(),
            children: vec![tree],
        }),
        Expr::Text(s) => text(s).map(|text| Fragment {
            text,
            children: Vec::new(),
        }),
        Expr::Optional(inner) => alt(vec![pure(Fragment::default()), build(inner, group)]),
        Expr::Repeat(inner) => {
            let inner = build(inner, group);
            fixpoint("repeat", move |repeat| {
                alt(vec![
                    pure(Fragment::default()),
                    map2(Fragment::join, repeat, inner.clone()),
                ])
            })
        }
        Expr::Exception(a, b, description) => {
            // The excluded side runs as a separate parse over the matched
            // text, so it gets a group of its own.
            let excluded = build(b, &group.vacant());
            let description = description.clone();
            bind(build(a, group), move |fragment: Fragment| {
                if parse(&excluded, fragment.text.chars()).is_success() {
                    fail(ParseError::new(description.clone(), fragment.text))
                } else {
                    pure(fragment)
                }
            })
        }
        Expr::Alternation(a, b) => alt(vec![build(a, group), build(b, group)]),
        Expr::Concatenation(a, b) => map2(Fragment::join, build(a, group), build(b, group)),
    }
}

/// A grammar ready to parse input with any of its rules.
pub struct CompiledGrammar {
    group: Group,
    rules: HashMap<String, Member<Tree>>,
}

impl CompiledGrammar {
    pub fn new(grammar: &Grammar) -> Result<Self, Error> {
        let mut fix = Fix::new();
        let mut rules = HashMap::new();
        for production in &grammar.rules {
            let name = production.lhs.name();
            let member = fix.declare::<Tree>(name);
            if rules.insert(name.to_owned(), member).is_some() {
                return Err(Error::DuplicateRule(name.to_owned()));
            }
        }

        for production in &grammar.rules {
            let name = production.lhs.name().to_owned();
            let member = rules[&name];
            let expr = resolve(&production.rhs, &rules)?;
            fix.define(member, move |group| {
                let rule = name.clone();
                build(&expr, group).map(move |fragment: Fragment| Tree {
                    rule: rule.clone(),
                    text: fragment.text,
                    children: fragment.children,
                })
            });
        }

        let group = fix.finish()?;
        debug!("compiled grammar with {} rule(s)", rules.len());
        Ok(CompiledGrammar { group, rules })
    }

    pub fn from_source(source: &GrammarSource) -> anyhow::Result<Self> {
        let grammar = source.load()?;
        let compiled = CompiledGrammar::new(&grammar).context("compile grammar")?;
        Ok(compiled)
    }

    pub fn rules(&self) -> impl Iterator<Item = &str> {
        self.group.names()
    }

    pub fn parser(&self, rule: &str) -> Result<CharParser<Tree>, Error> {
        match self.rules.get(rule) {
            Some(member) => Ok(self.group.get(*member)),
            None => Err(Error::UnknownRule(rule.to_owned())),
        }
    }

    /// Parses all of `input` as `rule`, keeping every derivation.
    pub fn parse(&self, rule: &str, input: &str) -> Result<ParserResult<ParseError, Tree>, Error> {
        let parser = self.parser(rule)?;
        Ok(parse(&parser, input.chars()))
    }

    /// Parses all of `input` as `rule`, which must match in exactly one way.
    pub fn parse_tree(&self, rule: &str, input: &str) -> anyhow::Result<Tree> {
        match self.parse(rule, input)? {
            ParserResult::Success { values } if values.len() == 1 => Ok(values.first().clone()),
            ParserResult::Success { values } => {
                Err(anyhow!("input is ambiguous: {} derivations", values.len()))
            }
            ParserResult::Failure { errors } => match errors.head() {
                Some(error) => Err(anyhow!("parsing failed: {}", error)),
                None => Err(anyhow!("parsing failed: unexpected end of input")),
            },
        }
    }
}
