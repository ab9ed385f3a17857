use std::any::{self, Any};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::fix::FixRef;
use crate::list::List;

/// A produced value or a token, type-erased while it travels through the
/// machine. The typed arrow that consumes it knows its concrete type.
pub(crate) type Value = Rc<dyn Any>;

/// Maps a delivered value to the next parser description.
pub(crate) type Arrow<T, E> = Rc<dyn Fn(Value) -> Rc<Node<T, E>>>;

/// An inert parser description. Nothing is evaluated at construction time.
pub(crate) enum Node<T, E> {
    Pure(Value),
    Fail(E),
    Read(Arrow<T, E>),
    Bind(Rc<Node<T, E>>, Arrow<T, E>),
    Alt(Vec<Rc<Node<T, E>>>),
    Fix(FixRef<T, E>),
}

impl<T, E> Node<T, E> {
    fn kind(&self) -> &'static str {
        match self {
            Node::Pure(_) => "pure",
            Node::Fail(_) => "fail",
            Node::Read(_) => "read",
            Node::Bind(_, _) => "bind",
            Node::Alt(_) => "alt",
            Node::Fix(_) => "fix",
        }
    }
}

/// Recovers a value of the type its consumer expects.
pub(crate) fn take<A: Clone + 'static>(value: &Value) -> A {
    match value.downcast_ref::<A>() {
        Some(value) => value.clone(),
        None => unreachable!(
            "value delivered to a continuation expecting {}",
            any::type_name::<A>()
        ),
    }
}

/// A parser consuming tokens of type `T`, failing with errors of type `E` and
/// producing values of type `A`.
///
/// Parsers are descriptions; they are cheap to clone and may be shared
/// between grammars and between parses.
pub struct Parser<T, E, A> {
    pub(crate) node: Rc<Node<T, E>>,
    marker: PhantomData<fn() -> A>,
}

impl<T, E, A> Parser<T, E, A> {
    pub(crate) fn from_node(node: Node<T, E>) -> Self {
        Parser::from_rc(Rc::new(node))
    }

    pub(crate) fn from_rc(node: Rc<Node<T, E>>) -> Self {
        Parser {
            node,
            marker: PhantomData,
        }
    }
}

impl<T, E, A> Clone for Parser<T, E, A> {
    fn clone(&self) -> Self {
        Parser::from_rc(Rc::clone(&self.node))
    }
}

impl<T, E, A> fmt::Debug for Parser<T, E, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &*self.node {
            Node::Alt(parsers) => write!(f, "Parser(alt/{})", parsers.len()),
            Node::Fix(fix) => write!(f, "Parser(fix {})", fix.name()),
            node => write!(f, "Parser({})", node.kind()),
        }
    }
}

impl<T, E, A> Parser<T, E, A>
where
    T: Clone + 'static,
    E: Clone + 'static,
    A: Clone + 'static,
{
    pub fn map<B, F>(self, f: F) -> Parser<T, E, B>
    where
        B: Clone + 'static,
        F: Fn(A) -> B + 'static,
    {
        map(f, self)
    }

    pub fn bind<B, F>(self, f: F) -> Parser<T, E, B>
    where
        B: Clone + 'static,
        F: Fn(A) -> Parser<T, E, B> + 'static,
    {
        bind(self, f)
    }
}

/// Succeeds with `value` without consuming anything.
pub fn pure<T, E, A>(value: A) -> Parser<T, E, A>
where
    A: Clone + 'static,
{
    Parser::from_node(Node::Pure(Rc::new(value)))
}

/// Fails with `error` without consuming anything.
pub fn fail<T, E, A>(error: E) -> Parser<T, E, A> {
    Parser::from_node(Node::Fail(error))
}

/// Consumes exactly one token and continues as `f(token)`.
pub fn read<T, E, A, F>(f: F) -> Parser<T, E, A>
where
    T: Clone + 'static,
    F: Fn(T) -> Parser<T, E, A> + 'static,
{
    Parser::from_node(Node::Read(Rc::new(move |token: Value| {
        f(take::<T>(&token)).node
    })))
}

/// Runs `parser`, then continues with whatever `f` builds from its result.
pub fn bind<T, E, A, B, F>(parser: Parser<T, E, A>, f: F) -> Parser<T, E, B>
where
    A: Clone + 'static,
    F: Fn(A) -> Parser<T, E, B> + 'static,
{
    Parser::from_node(Node::Bind(
        parser.node,
        Rc::new(move |value: Value| f(take::<A>(&value)).node),
    ))
}

/// Non-deterministic choice. Every alternative is explored; results and
/// errors of all of them are kept.
pub fn alt<T, E, A, I>(parsers: I) -> Parser<T, E, A>
where
    I: IntoIterator<Item = Parser<T, E, A>>,
{
    Parser::from_node(Node::Alt(
        parsers.into_iter().map(|parser| parser.node).collect(),
    ))
}

pub fn map<T, E, A, B, F>(f: F, parser: Parser<T, E, A>) -> Parser<T, E, B>
where
    A: Clone + 'static,
    B: Clone + 'static,
    F: Fn(A) -> B + 'static,
{
    bind(parser, move |a| pure(f(a)))
}

pub fn map2<T, E, A, B, C, F>(f: F, pa: Parser<T, E, A>, pb: Parser<T, E, B>) -> Parser<T, E, C>
where
    T: 'static,
    E: 'static,
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    F: Fn(A, B) -> C + 'static,
{
    let f = Rc::new(f);
    bind(pa, move |a: A| {
        let f = Rc::clone(&f);
        map(move |b| f(a.clone(), b), pb.clone())
    })
}

pub fn map3<T, E, A, B, C, D, F>(
    f: F,
    pa: Parser<T, E, A>,
    pb: Parser<T, E, B>,
    pc: Parser<T, E, C>,
) -> Parser<T, E, D>
where
    T: 'static,
    E: 'static,
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
    F: Fn(A, B, C) -> D + 'static,
{
    let f = Rc::new(f);
    bind(pa, move |a: A| {
        let f = Rc::clone(&f);
        map2(move |b, c| f(a.clone(), b, c), pb.clone(), pc.clone())
    })
}

pub fn map4<T, E, A, B, C, D, G, F>(
    f: F,
    pa: Parser<T, E, A>,
    pb: Parser<T, E, B>,
    pc: Parser<T, E, C>,
    pd: Parser<T, E, D>,
) -> Parser<T, E, G>
where
    T: 'static,
    E: 'static,
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
    G: Clone + 'static,
    F: Fn(A, B, C, D) -> G + 'static,
{
    let f = Rc::new(f);
    bind(pa, move |a: A| {
        let f = Rc::clone(&f);
        map3(
            move |b, c, d| f(a.clone(), b, c, d),
            pb.clone(),
            pc.clone(),
            pd.clone(),
        )
    })
}

pub fn map5<T, E, A, B, C, D, G, H, F>(
    f: F,
    pa: Parser<T, E, A>,
    pb: Parser<T, E, B>,
    pc: Parser<T, E, C>,
    pd: Parser<T, E, D>,
    pg: Parser<T, E, G>,
) -> Parser<T, E, H>
where
    T: 'static,
    E: 'static,
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: Clone + 'static,
    G: Clone + 'static,
    H: Clone + 'static,
    F: Fn(A, B, C, D, G) -> H + 'static,
{
    let f = Rc::new(f);
    bind(pa, move |a: A| {
        let f = Rc::clone(&f);
        map4(
            move |b, c, d, g| f(a.clone(), b, c, d, g),
            pb.clone(),
            pc.clone(),
            pd.clone(),
            pg.clone(),
        )
    })
}

/// Runs every parser in order and combines all of their results with `f`.
pub fn map_all<T, E, A, B, F>(f: F, parsers: Vec<Parser<T, E, A>>) -> Parser<T, E, B>
where
    T: 'static,
    E: 'static,
    A: Clone + 'static,
    B: Clone + 'static,
    F: Fn(Vec<A>) -> B + 'static,
{
    fn step<T, E, A, B>(
        f: Rc<dyn Fn(Vec<A>) -> B>,
        parsers: Rc<[Parser<T, E, A>]>,
        collected: List<A>,
        index: usize,
    ) -> Parser<T, E, B>
    where
        T: 'static,
        E: 'static,
        A: Clone + 'static,
        B: Clone + 'static,
    {
        let parser = match parsers.get(index) {
            Some(parser) => parser.clone(),
            None => {
                let mut results: Vec<A> = collected.iter().cloned().collect();
                results.reverse();
                return pure(f(results));
            }
        };
        bind(parser, move |head: A| {
            step(
                Rc::clone(&f),
                Rc::clone(&parsers),
                collected.cons(head),
                index + 1,
            )
        })
    }

    step(Rc::new(f), parsers.into(), List::new(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    type P<A> = Parser<char, String, A>;

    #[test]
    fn construction_is_inert() {
        // The read arrow panics if it is ever called, building must not call it.
        let p: P<u8> = read(|_| panic!("evaluated during construction"));
        let p = map2(|a, b| a + b, p.clone(), p);
        let p = alt(vec![p, fail("nope".to_owned()), pure(1)]);
        assert_eq!(format!("{:?}", p), "Parser(alt/3)");
    }

    #[test]
    fn take_recovers_values() {
        let value: Value = Rc::new(String::from("hello"));
        assert_eq!(take::<String>(&value), "hello");
    }

    #[test]
    #[should_panic]
    fn take_rejects_other_types() {
        let value: Value = Rc::new(1u32);
        let _ = take::<String>(&value);
    }
}
