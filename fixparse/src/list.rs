use std::fmt;
use std::iter::FromIterator;
use std::rc::{Rc, Weak};

/// An immutable singly linked list.
///
/// Cloning a list is O(1) and lists built on top of a common tail share it.
/// Nodes are never mutated after creation.
pub struct List<A> {
    head: Option<Rc<Node<A>>>,
}

struct Node<A> {
    value: A,
    tail: List<A>,
}

impl<A> List<A> {
    pub fn new() -> Self {
        List { head: None }
    }

    /// Returns a new list with `value` in front of this one.
    pub fn cons(&self, value: A) -> Self {
        List {
            head: Some(Rc::new(Node {
                value,
                tail: self.clone(),
            })),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn head(&self) -> Option<&A> {
        self.head.as_deref().map(|node| &node.value)
    }

    /// Splits the list into its first element and the rest.
    pub fn uncons(&self) -> Option<(&A, &List<A>)> {
        self.head.as_deref().map(|node| (&node.value, &node.tail))
    }

    /// Walks the whole list, prefer `is_empty` where possible.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> Iter<'_, A> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Address of the first node. Lists sharing it share every later node.
    pub(crate) fn id(&self) -> Option<*const ()> {
        self.head.as_ref().map(|node| Rc::as_ptr(node) as *const ())
    }

    pub(crate) fn downgrade(&self) -> WeakList<A> {
        WeakList {
            head: self.head.as_ref().map(Rc::downgrade),
        }
    }
}

/// A list handle that does not keep its nodes alive.
pub(crate) struct WeakList<A> {
    head: Option<Weak<Node<A>>>,
}

impl<A> WeakList<A> {
    /// Whether some `List` still holds the first node. Empty lists never are.
    pub(crate) fn is_live(&self) -> bool {
        self.head.as_ref().map_or(false, |head| head.strong_count() > 0)
    }

    pub(crate) fn upgrade(&self) -> Option<List<A>> {
        let head = self.head.as_ref()?.upgrade()?;
        Some(List { head: Some(head) })
    }
}

impl<A> Clone for List<A> {
    fn clone(&self) -> Self {
        List {
            head: self.head.clone(),
        }
    }
}

impl<A> Default for List<A> {
    fn default() -> Self {
        List::new()
    }
}

// Unlinks uniquely owned nodes one at a time so long lists don't recurse.
impl<A> Drop for List<A> {
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.tail.head.take(),
                Err(_) => break,
            }
        }
    }
}

impl<A: PartialEq> PartialEq for List<A> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<A: Eq> Eq for List<A> {}

impl<A: fmt::Debug> fmt::Debug for List<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<A> FromIterator<A> for List<A> {
    /// The first item yielded ends up at the head of the list.
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        let items: Vec<A> = iter.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(List::new(), |list, item| list.cons(item))
    }
}

impl<'a, A> IntoIterator for &'a List<A> {
    type Item = &'a A;
    type IntoIter = Iter<'a, A>;

    fn into_iter(self) -> Iter<'a, A> {
        self.iter()
    }
}

/// Borrowing iterator over a `List`, head first.
pub struct Iter<'a, A> {
    next: Option<&'a Node<A>>,
}

impl<'a, A> Iterator for Iter<'a, A> {
    type Item = &'a A;

    fn next(&mut self) -> Option<&'a A> {
        let node = self.next?;
        self.next = node.tail.head.as_deref();
        Some(&node.value)
    }
}

/// A list holding at least one element.
pub struct NonEmpty<A> {
    node: Rc<Node<A>>,
}

impl<A> NonEmpty<A> {
    pub fn new(head: A, tail: List<A>) -> Self {
        NonEmpty {
            node: Rc::new(Node { value: head, tail }),
        }
    }

    pub fn first(&self) -> &A {
        &self.node.value
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> Iter<'_, A> {
        Iter {
            next: Some(&*self.node),
        }
    }

    pub fn to_list(&self) -> List<A> {
        List {
            head: Some(Rc::clone(&self.node)),
        }
    }

    pub fn to_vec(&self) -> Vec<A>
    where
        A: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<A> Clone for NonEmpty<A> {
    fn clone(&self) -> Self {
        NonEmpty {
            node: Rc::clone(&self.node),
        }
    }
}

impl<A: PartialEq> PartialEq for NonEmpty<A> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<A: Eq> Eq for NonEmpty<A> {}

impl<A: fmt::Debug> fmt::Debug for NonEmpty<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, A> IntoIterator for &'a NonEmpty<A> {
    type Item = &'a A;
    type IntoIter = Iter<'a, A>;

    fn into_iter(self) -> Iter<'a, A> {
        self.iter()
    }
}
