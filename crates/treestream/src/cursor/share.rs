//! Several views over one token iterator

use std::cell::RefCell;
use std::rc::Rc;

/// Cloneable handle pulling from one shared iterator.
///
/// Every clone advances the same underlying iterator, so cursors can be
/// layered over a source that another cursor has partially consumed. Only
/// one handle may pull at a time.
pub struct Shared<I> {
    inner: Rc<RefCell<I>>,
}

/// Share `source` between several consumers.
pub fn share<I>(source: I) -> Shared<I::IntoIter>
where
    I: IntoIterator,
{
    Shared {
        inner: Rc::new(RefCell::new(source.into_iter())),
    }
}

impl<I> Clone for Shared<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<I: Iterator> Iterator for Shared<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        self.inner.borrow_mut().next()
    }
}
