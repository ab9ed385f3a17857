//! The trampolined evaluator.
//!
//! Evaluation never recurses on the Rust stack. All pending work is kept in
//! two places: the continuation of the value being produced (`Cont`) and the
//! morphism describing what to do once the current branch returns
//! (`Morphism`). A single loop in `Machine::run` steps through them.
//!
//! Left recursion is handled per member and per input position. The first
//! entry into a member occupies its slot and evaluates the body with a
//! collector as continuation. Entries made while the slot is occupied only
//! queue their continuation. When the body returns, the entry is tied: the
//! queue is released, values collected so far are replayed into every queued
//! continuation, and any value reaching the collector later is forwarded to
//! them as well.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::mem;
use std::rc::{Rc, Weak};

use log::trace;

use crate::fix::Slot;
use crate::list::{List, WeakList};
use crate::parser::{take, Arrow, Node, Value};
use crate::state::ParserResult;

/// What to do with a produced value, innermost frame first.
pub(crate) type Cont<T, E> = List<Frame<T, E>>;

pub(crate) enum Frame<T, E> {
    /// Feed the value to a bind arrow and keep evaluating.
    Compose(Arrow<T, E>),
    /// Hand the value to the collector of a member entry.
    Collect(Weak<Collector<T, E>>),
    /// Deliver the value to each of these continuations, oldest first.
    Concat(List<Cont<T, E>>),
    /// The value is a result of the whole parse.
    Complete,
}

enum Collected<T, E> {
    Seeds(List<Value>),
    Tied(Cont<T, E>),
}

/// Receives the values of one member entry.
pub(crate) struct Collector<T, E> {
    state: RefCell<Collected<T, E>>,
}

impl<T, E> Collector<T, E> {
    fn new() -> Self {
        Collector {
            state: RefCell::new(Collected::Seeds(List::new())),
        }
    }

    fn tied(&self) -> Option<Cont<T, E>> {
        match &*self.state.borrow() {
            Collected::Seeds(_) => None,
            Collected::Tied(cont) => Some(cont.clone()),
        }
    }

    fn seed(&self, value: Value) {
        let mut state = self.state.borrow_mut();
        if let Collected::Seeds(seeds) = &mut *state {
            *seeds = seeds.cons(value);
        }
    }

    /// Switches to forwarding, returning the seeds collected so far.
    fn tie(&self, cont: Cont<T, E>) -> List<Value> {
        match self.state.replace(Collected::Tied(cont)) {
            Collected::Seeds(seeds) => seeds,
            Collected::Tied(_) => List::new(),
        }
    }
}

/// Owns every collector created during one parse. Frames only hold weak
/// references, so continuations never keep each other alive in a cycle.
///
/// The pool also tracks, weakly, every continuation list handed out to
/// callers. A sweep keeps exactly the collectors reachable from those that
/// are still alive.
pub(crate) struct Pool<T, E> {
    collectors: RefCell<Vec<Rc<Collector<T, E>>>>,
    roots: RefCell<Vec<WeakList<Cont<T, E>>>>,
    swept: Cell<usize>,
}

pub(crate) const SWEEP_THRESHOLD: usize = 256;

impl<T, E> Pool<T, E> {
    pub(crate) fn new() -> Self {
        Pool {
            collectors: RefCell::new(Vec::new()),
            roots: RefCell::new(Vec::new()),
            swept: Cell::new(0),
        }
    }

    fn register(&self) -> Rc<Collector<T, E>> {
        let collector = Rc::new(Collector::new());
        self.collectors.borrow_mut().push(Rc::clone(&collector));
        collector
    }

    /// Records `conts` as live for as long as some handle to it exists.
    pub(crate) fn track(&self, conts: &List<Cont<T, E>>) {
        if !conts.is_empty() {
            self.roots.borrow_mut().push(conts.downgrade());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.collectors.borrow().len()
    }

    /// Drops collectors no live continuation can reach. Only does work once
    /// the pool has doubled since the last sweep.
    pub(crate) fn sweep(&self) {
        self.roots.borrow_mut().retain(WeakList::is_live);
        let len = self.len();
        if len < SWEEP_THRESHOLD.max(2 * self.swept.get()) {
            return;
        }
        let marked = self.mark();
        let collectors = mem::take(&mut *self.collectors.borrow_mut());
        let live: Vec<_> = collectors
            .into_iter()
            .filter(|collector| marked.contains(&Rc::as_ptr(collector)))
            .collect();
        trace!("swept collector pool: {} -> {}", len, live.len());
        self.swept.set(live.len());
        self.collectors.borrow_mut().extend(live);
    }

    /// Walks every frame reachable from the live roots, through tied
    /// collectors and concatenated continuations.
    ///
    /// Everything visited is owned by a root or by the pool for the whole
    /// walk, so node addresses identify nodes.
    fn mark(&self) -> HashSet<*const Collector<T, E>> {
        let mut marked = HashSet::new();
        let mut seen = HashSet::new();
        let mut lists: Vec<List<Cont<T, E>>> = self
            .roots
            .borrow()
            .iter()
            .filter_map(WeakList::upgrade)
            .collect();
        let mut conts: Vec<Cont<T, E>> = Vec::new();

        loop {
            if let Some(list) = lists.pop() {
                let mut rest = &list;
                while let Some((cont, tail)) = rest.uncons() {
                    if !seen.insert(rest.id()) {
                        break;
                    }
                    conts.push(cont.clone());
                    rest = tail;
                }
            } else if let Some(cont) = conts.pop() {
                let mut rest = &cont;
                while let Some((frame, tail)) = rest.uncons() {
                    if !seen.insert(rest.id()) {
                        break;
                    }
                    match frame {
                        Frame::Collect(weak) => {
                            if let Some(collector) = weak.upgrade() {
                                if marked.insert(Rc::as_ptr(&collector)) {
                                    conts.extend(collector.tied());
                                }
                            }
                        }
                        Frame::Concat(queued) => lists.push(queued.clone()),
                        Frame::Compose(_) | Frame::Complete => {}
                    }
                    rest = tail;
                }
            } else {
                return marked;
            }
        }
    }
}

/// Work to do once the current branch has returned.
pub(crate) enum Morphism<T, E> {
    Done,
    Run {
        node: Rc<Node<T, E>>,
        cont: Cont<T, E>,
        then: Box<Morphism<T, E>>,
    },
    Resume {
        cont: Cont<T, E>,
        value: Value,
        then: Box<Morphism<T, E>>,
    },
    Tie {
        slot: Rc<Slot<T, E>>,
        collector: Rc<Collector<T, E>>,
        then: Box<Morphism<T, E>>,
    },
}

/// The machine's work register.
pub(crate) enum Work<T, E> {
    Eval {
        node: Rc<Node<T, E>>,
        cont: Cont<T, E>,
        then: Morphism<T, E>,
    },
    Deliver {
        cont: Cont<T, E>,
        value: Value,
        then: Morphism<T, E>,
    },
    Return(Morphism<T, E>),
}

/// Chains `Resume`s delivering `value` to every continuation in `conts`.
/// `conts` is newest first; the chain resumes the oldest first.
fn resume_all<T, E>(
    conts: &List<Cont<T, E>>,
    value: &Value,
    then: Morphism<T, E>,
) -> Morphism<T, E> {
    conts.iter().fold(then, |then, cont| Morphism::Resume {
        cont: cont.clone(),
        value: Rc::clone(value),
        then: Box::new(then),
    })
}

pub(crate) struct Machine<'a, T, E, R> {
    result: ParserResult<E, R>,
    continuations: List<Cont<T, E>>,
    pool: &'a Pool<T, E>,
}

impl<'a, T, E, R> Machine<'a, T, E, R>
where
    E: Clone,
    R: Clone + 'static,
{
    pub(crate) fn new(pool: &'a Pool<T, E>) -> Self {
        Machine {
            result: ParserResult::empty(),
            continuations: List::new(),
            pool,
        }
    }

    /// Evaluates `node` at the current position, completing the parse with
    /// every value it produces.
    pub(crate) fn start(self, node: Rc<Node<T, E>>) -> (ParserResult<E, R>, List<Cont<T, E>>) {
        let cont = List::new().cons(Frame::Complete);
        self.run(Work::Eval {
            node,
            cont,
            then: Morphism::Done,
        })
    }

    /// Delivers `token` to every suspended read in `conts`.
    pub(crate) fn feed(
        self,
        conts: &List<Cont<T, E>>,
        token: Value,
    ) -> (ParserResult<E, R>, List<Cont<T, E>>) {
        let cont = List::new().cons(Frame::Concat(conts.clone()));
        self.run(Work::Deliver {
            cont,
            value: token,
            then: Morphism::Done,
        })
    }

    fn run(mut self, mut work: Work<T, E>) -> (ParserResult<E, R>, List<Cont<T, E>>) {
        loop {
            work = match work {
                Work::Eval { node, cont, then } => self.eval(node, cont, then),
                Work::Deliver { cont, value, then } => self.deliver(cont, value, then),
                Work::Return(then) => match then {
                    Morphism::Done => break,
                    Morphism::Run { node, cont, then } => Work::Eval {
                        node,
                        cont,
                        then: *then,
                    },
                    Morphism::Resume { cont, value, then } => Work::Deliver {
                        cont,
                        value,
                        then: *then,
                    },
                    Morphism::Tie {
                        slot,
                        collector,
                        then,
                    } => self.tie(&slot, &collector, *then),
                },
            };
        }
        (self.result, self.continuations)
    }

    fn eval(&mut self, node: Rc<Node<T, E>>, cont: Cont<T, E>, then: Morphism<T, E>) -> Work<T, E> {
        match &*node {
            Node::Pure(value) => Work::Deliver {
                cont,
                value: Rc::clone(value),
                then,
            },
            Node::Fail(error) => {
                self.result.fail(error.clone());
                Work::Return(then)
            }
            Node::Read(arrow) => {
                let suspended = cont.cons(Frame::Compose(Rc::clone(arrow)));
                self.continuations = self.continuations.cons(suspended);
                Work::Return(then)
            }
            Node::Bind(parser, arrow) => Work::Eval {
                node: Rc::clone(parser),
                cont: cont.cons(Frame::Compose(Rc::clone(arrow))),
                then,
            },
            Node::Alt(parsers) => {
                // Last alternative is scheduled first so that prepended
                // results and errors end up in declaration order.
                let then = parsers.iter().fold(then, |then, parser| Morphism::Run {
                    node: Rc::clone(parser),
                    cont: cont.clone(),
                    then: Box::new(then),
                });
                Work::Return(then)
            }
            Node::Fix(fix) => {
                let (entry, slot) = fix.slot();
                if slot.occupy(cont) {
                    trace!("queued re-entry of {}", entry.name());
                    return Work::Return(then);
                }
                trace!("entering {}", entry.name());
                let collector = self.pool.register();
                let cont = List::new().cons(Frame::Collect(Rc::downgrade(&collector)));
                Work::Eval {
                    node: entry.body(),
                    cont,
                    then: Morphism::Tie {
                        slot,
                        collector,
                        then: Box::new(then),
                    },
                }
            }
        }
    }

    fn deliver(&mut self, cont: Cont<T, E>, value: Value, then: Morphism<T, E>) -> Work<T, E> {
        let (frame, rest) = match cont.uncons() {
            Some(split) => split,
            None => return Work::Return(then),
        };
        match frame {
            Frame::Compose(arrow) => Work::Eval {
                node: arrow(value),
                cont: rest.clone(),
                then,
            },
            Frame::Collect(collector) => {
                let collector = match collector.upgrade() {
                    Some(collector) => collector,
                    None => return Work::Return(then),
                };
                match collector.tied() {
                    Some(cont) => Work::Deliver { cont, value, then },
                    None => {
                        collector.seed(value);
                        Work::Return(then)
                    }
                }
            }
            Frame::Concat(conts) => Work::Return(resume_all(conts, &value, then)),
            Frame::Complete => {
                self.result.succeed(take::<R>(&value));
                Work::Return(then)
            }
        }
    }

    fn tie(
        &mut self,
        slot: &Slot<T, E>,
        collector: &Collector<T, E>,
        then: Morphism<T, E>,
    ) -> Work<T, E> {
        let pending = slot.release();
        trace!("tying entry with {} queued continuation(s)", pending.len());
        let cont = List::new().cons(Frame::Concat(pending));
        let seeds = collector.tie(cont.clone());
        // Seeds are newest first, replay oldest first.
        let then = seeds.iter().fold(then, |then, seed| Morphism::Resume {
            cont: cont.clone(),
            value: Rc::clone(seed),
            then: Box::new(then),
        });
        Work::Return(then)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{alt, fail, pure, read, Parser};

    type P<A> = Parser<char, &'static str, A>;

    type Outcome<A> = (ParserResult<&'static str, A>, List<Cont<char, &'static str>>);

    fn start<A: Clone + 'static>(pool: &Pool<char, &'static str>, p: &P<A>) -> Outcome<A> {
        Machine::new(pool).start(Rc::clone(&p.node))
    }

    #[test]
    fn pure_completes_immediately() {
        let pool = Pool::new();
        let (result, conts) = start(&pool, &pure::<char, &str, u8>(7));
        assert_eq!(result.values().map(|v| v.to_vec()), Some(vec![7]));
        assert!(conts.is_empty());
    }

    #[test]
    fn read_suspends() {
        let pool = Pool::new();
        let p: P<char> = read(pure);
        let (result, conts) = start(&pool, &p);
        assert!(!result.is_success());
        assert_eq!(conts.len(), 1);

        let (result, conts) = Machine::<_, _, char>::new(&pool).feed(&conts, Rc::new('z'));
        assert_eq!(result.values().map(|v| v.to_vec()), Some(vec!['z']));
        assert!(conts.is_empty());
    }

    #[test]
    fn alt_keeps_declaration_order() {
        let pool = Pool::new();
        let p: P<u8> = alt(vec![fail("x"), pure(1), fail("y"), pure(2)]);
        let (result, _) = start(&pool, &p);
        assert_eq!(result.values().map(|v| v.to_vec()), Some(vec![1, 2]));

        let p: P<u8> = alt(vec![fail("x"), fail("y"), fail("z")]);
        let (result, _) = start(&pool, &p);
        let errors: Vec<_> = result.errors().map(|e| e.iter().copied().collect()).unwrap();
        assert_eq!(errors, vec!["x", "y", "z"]);
    }

    #[test]
    fn sweep_keeps_collectors_reachable_from_live_roots() {
        let pool: Pool<char, &str> = Pool::new();

        // Reachable from a root through the tied continuation of another.
        let inner = pool.register();
        let outer = pool.register();
        outer.tie(List::new().cons(Frame::Collect(Rc::downgrade(&inner))));
        let root = List::new().cons(List::new().cons(Frame::Collect(Rc::downgrade(&outer))));
        pool.track(&root);

        // Tied to itself, nothing else refers to it.
        let cyclic = pool.register();
        cyclic.tie(List::new().cons(Frame::Collect(Rc::downgrade(&cyclic))));

        let weak = (Rc::downgrade(&inner), Rc::downgrade(&outer), Rc::downgrade(&cyclic));
        drop((inner, outer, cyclic));
        let (inner, outer, cyclic) = weak;
        for _ in 0..SWEEP_THRESHOLD {
            drop(pool.register());
        }
        pool.sweep();
        assert_eq!(pool.len(), 2);
        assert!(inner.upgrade().is_some());
        assert!(outer.upgrade().is_some());
        assert!(cyclic.upgrade().is_none());

        drop(root);
        for _ in 0..SWEEP_THRESHOLD {
            drop(pool.register());
        }
        pool.sweep();
        assert_eq!(pool.len(), 0);
        assert!(outer.upgrade().is_none());
    }
}
