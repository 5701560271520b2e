use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

pub type SubId = usize;

type Subscriber<T> = Rc<dyn Fn(&T)>;

/// Observable single-threaded value. Clones share the same value.
pub struct Signal<T: 'static>(Rc<RefCell<Inner<T>>>);

struct Inner<T: 'static> {
    value: T,
    next_sub: SubId,
    subs: SmallVec<[(SubId, Subscriber<T>); 2]>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(Inner {
            value,
            next_sub: 0,
            subs: SmallVec::new(),
        })))
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().value.clone()
    }

    /// Stores `v` and notifies every subscriber once.
    ///
    /// Subscribers run after the value borrow is released, so they may read
    /// or write this signal.
    pub fn set(&self, v: T)
    where
        T: Clone,
    {
        let subs = {
            let mut inner = self.0.borrow_mut();
            inner.value = v.clone();
            inner.subs.clone()
        };
        for (_, s) in &subs {
            s(&v);
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let v = {
            let mut inner = self.0.borrow_mut();
            f(&mut inner.value);
            inner.value.clone()
        };
        let subs = self.0.borrow().subs.clone();
        for (_, s) in &subs {
            s(&v);
        }
    }

    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> SubId {
        let mut inner = self.0.borrow_mut();
        let id = inner.next_sub;
        inner.next_sub += 1;
        inner.subs.push((id, Rc::new(f)));
        id
    }

    pub fn unsubscribe(&self, id: SubId) -> bool {
        let mut inner = self.0.borrow_mut();
        let before = inner.subs.len();
        inner.subs.retain(|(sid, _)| *sid != id);
        inner.subs.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.borrow().subs.len()
    }
}

pub fn signal<T>(t: T) -> Signal<T> {
    Signal::new(t)
}
