//! Mutually recursive grammar groups.
//!
//! A group is declared up front and defined member by member. Each member's
//! definition receives a [`GroupView`] through which it refers to any member,
//! itself included, before the group is complete. Left recursion through
//! these references is resolved by the machine, see `machine.rs`.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::mem;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::FixError;
use crate::machine::Cont;
use crate::list::List;
use crate::parser::{Node, Parser};

static NEXT_GROUP_ID: AtomicUsize = AtomicUsize::new(0);

fn next_group_id() -> usize {
    NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed)
}

type Define<T, E> = Rc<dyn Fn(&GroupView<T, E>) -> Rc<Node<T, E>>>;

/// Typed handle on one member of a fix group.
pub struct Member<A> {
    group: usize,
    index: usize,
    marker: PhantomData<fn() -> A>,
}

impl<A> Clone for Member<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Member<A> {}

impl<A> std::fmt::Debug for Member<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Member({}/{})", self.group, self.index)
    }
}

struct Group<T, E> {
    id: usize,
    names: Vec<String>,
    defs: Vec<Define<T, E>>,
}

/// Occupancy of one member for one grammar instantiation. Vacant while the
/// queue is empty; while occupied the queue holds the entering continuation
/// followed by every continuation that re-entered without consuming a token.
pub(crate) struct Slot<T, E> {
    pending: RefCell<List<Cont<T, E>>>,
}

impl<T, E> Slot<T, E> {
    fn new() -> Self {
        Slot {
            pending: RefCell::new(List::new()),
        }
    }

    /// Queues `cont`, returning whether the slot was already occupied.
    pub(crate) fn occupy(&self, cont: Cont<T, E>) -> bool {
        let mut pending = self.pending.borrow_mut();
        let occupied = !pending.is_empty();
        *pending = pending.cons(cont);
        occupied
    }

    /// Empties the queue, leaving the slot vacant.
    pub(crate) fn release(&self) -> List<Cont<T, E>> {
        mem::take(&mut *self.pending.borrow_mut())
    }
}

/// A group's members as seen from one grammar instantiation.
///
/// A view handed out by [`Fix::finish`] has no slots and is never mutated, so
/// any number of parses may start from it. The machine derives a fresh view,
/// sharing the slots of members already being evaluated, the first time a
/// member is entered through a view lacking that member's slot.
pub struct GroupView<T, E> {
    group: Rc<Group<T, E>>,
    slots: Rc<[Option<Rc<Slot<T, E>>>]>,
}

impl<T, E> Clone for GroupView<T, E> {
    fn clone(&self) -> Self {
        GroupView {
            group: Rc::clone(&self.group),
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<T, E> GroupView<T, E> {
    fn new(group: Group<T, E>) -> Self {
        let slots = (0..group.defs.len()).map(|_| None).collect();
        GroupView {
            group: Rc::new(group),
            slots,
        }
    }

    /// Returns the parser for `member`.
    ///
    /// # Panics
    ///
    /// If `member` was declared by a different group.
    pub fn get<A>(&self, member: Member<A>) -> Parser<T, E, A> {
        assert_eq!(
            member.group, self.group.id,
            "member belongs to a different fix group"
        );
        Parser::from_node(Node::Fix(FixRef {
            index: member.index,
            view: self.clone(),
        }))
    }

    /// The same group with every slot vacant, for starting an independent
    /// parse of one of its members.
    pub fn vacant(&self) -> Self {
        let slots = self.slots.iter().map(|_| None).collect();
        GroupView {
            group: Rc::clone(&self.group),
            slots,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.group.names.iter().map(String::as_str)
    }

    /// The view to evaluate member `index` through, along with its slot.
    fn enter(&self, index: usize) -> (GroupView<T, E>, Rc<Slot<T, E>>) {
        if let Some(slot) = &self.slots[index] {
            return (self.clone(), Rc::clone(slot));
        }
        let slot = Rc::new(Slot::new());
        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, existing)| {
                if i == index {
                    Some(Rc::clone(&slot))
                } else {
                    existing.clone()
                }
            })
            .collect();
        let view = GroupView {
            group: Rc::clone(&self.group),
            slots,
        };
        (view, slot)
    }
}

/// A reference to one member through one view.
pub(crate) struct FixRef<T, E> {
    index: usize,
    view: GroupView<T, E>,
}

impl<T, E> FixRef<T, E> {
    pub(crate) fn name(&self) -> &str {
        &self.view.group.names[self.index]
    }

    /// Finds the slot for this member, deriving a view with a fresh slot when
    /// needed.
    pub(crate) fn slot(&self) -> (FixRef<T, E>, Rc<Slot<T, E>>) {
        let (view, slot) = self.view.enter(self.index);
        let entry = FixRef {
            index: self.index,
            view,
        };
        (entry, slot)
    }

    /// Builds this member's body. Definitions run once per entry.
    pub(crate) fn body(&self) -> Rc<Node<T, E>> {
        (self.view.group.defs[self.index])(&self.view)
    }
}

/// Builder for a group of mutually recursive parsers.
///
/// ```
/// use fixparse::chars::{char, ParseError};
/// use fixparse::{alt, map2, parse, pure, Fix};
///
/// let mut fix = Fix::<char, ParseError>::new();
/// let ba = fix.declare::<String>("ba");
/// fix.define(ba, move |g| {
///     alt(vec![
///         pure(String::new()),
///         map2(|mut s: String, c| { s.push(c); s }, g.get(ba), char('b')),
///         map2(|mut s: String, c| { s.push(c); s }, g.get(ba), char('a')),
///     ])
/// });
/// let group = fix.finish().unwrap();
///
/// let result = parse(&group.get(ba), "abba".chars());
/// assert_eq!(result.values().unwrap().to_vec(), vec!["abba".to_owned()]);
/// ```
pub struct Fix<T, E> {
    id: usize,
    names: Vec<String>,
    defs: Vec<Option<Define<T, E>>>,
    errors: Vec<FixError>,
}

impl<T, E> Default for Fix<T, E> {
    fn default() -> Self {
        Fix::new()
    }
}

impl<T, E> Fix<T, E> {
    pub fn new() -> Self {
        Fix {
            id: next_group_id(),
            names: Vec::new(),
            defs: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn declare<A>(&mut self, name: impl Into<String>) -> Member<A> {
        let index = self.names.len();
        self.names.push(name.into());
        self.defs.push(None);
        Member {
            group: self.id,
            index,
            marker: PhantomData,
        }
    }

    /// Defines a declared member. Mistakes are reported by `finish`.
    pub fn define<A, F>(&mut self, member: Member<A>, f: F) -> &mut Self
    where
        F: Fn(&GroupView<T, E>) -> Parser<T, E, A> + 'static,
    {
        if member.group != self.id {
            self.errors.push(FixError::ForeignMember);
            return self;
        }
        let def: Define<T, E> = Rc::new(move |view: &GroupView<T, E>| f(view).node);
        if self.defs[member.index].replace(def).is_some() {
            let name = self.names[member.index].clone();
            self.errors.push(FixError::Redefined(name));
        }
        self
    }

    pub fn finish(mut self) -> Result<GroupView<T, E>, FixError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }
        let mut defs = Vec::with_capacity(self.defs.len());
        for (name, def) in self.names.iter().zip(self.defs) {
            match def {
                Some(def) => defs.push(def),
                None => return Err(FixError::Undefined(name.clone())),
            }
        }
        Ok(GroupView::new(Group {
            id: self.id,
            names: self.names,
            defs,
        }))
    }
}

/// A single recursive parser: `f` receives the parser being defined.
pub fn fixpoint<T, E, A, F>(name: impl Into<String>, f: F) -> Parser<T, E, A>
where
    A: 'static,
    F: Fn(Parser<T, E, A>) -> Parser<T, E, A> + 'static,
{
    let id = next_group_id();
    let member: Member<A> = Member {
        group: id,
        index: 0,
        marker: PhantomData,
    };
    let def: Define<T, E> = Rc::new(move |view: &GroupView<T, E>| f(view.get(member)).node);
    let view = GroupView::new(Group {
        id,
        names: vec![name.into()],
        defs: vec![def],
    });
    view.get(member)
}
