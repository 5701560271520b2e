//! Ownership scopes.
//!
//! A [`Scope`] plays the role a component instance plays in a UI framework:
//! schedulers created while it is current register their teardown with it,
//! and [`Scope::dispose`] tears all of them down together.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<Weak<ScopeInner>>> = const { RefCell::new(None) };
}

pub struct Scope {
    inner: Rc<ScopeInner>,
}

type DisposerId = u64;

#[derive(Default)]
struct ScopeInner {
    disposers: RefCell<Vec<(DisposerId, Box<dyn FnOnce()>)>>,
    next_id: Cell<DisposerId>,
    children: RefCell<Vec<Scope>>,
}

impl ScopeInner {
    fn push(&self, disposer: Box<dyn FnOnce()>) -> DisposerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.disposers.borrow_mut().push((id, disposer));
        id
    }

    fn remove(&self, id: DisposerId) {
        let removed = {
            let mut disposers = self.disposers.borrow_mut();
            disposers
                .iter()
                .position(|(i, _)| *i == id)
                .map(|pos| disposers.remove(pos))
        };
        drop(removed);
    }

    fn teardown(&self) {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children {
            child.inner.teardown();
        }

        // Later registrations may depend on earlier ones.
        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        for (_, disposer) in disposers.into_iter().rev() {
            disposer();
        }
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ScopeInner::default()),
        }
    }

    /// Runs `f` with this scope as the current one.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let prev = CURRENT_SCOPE.with(|current| {
            current
                .borrow_mut()
                .replace(Rc::downgrade(&self.inner))
        });
        let result = f();
        CURRENT_SCOPE.with(|current| *current.borrow_mut() = prev);
        result
    }

    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) {
        self.inner.push(Box::new(disposer));
    }

    pub fn disposer_count(&self) -> usize {
        self.inner.disposers.borrow().len()
    }

    pub fn child(&self) -> Scope {
        let child = Scope::new();
        self.inner.children.borrow_mut().push(child.clone());
        child
    }

    /// Tears down children first, then this scope's own disposers, newest
    /// first. Safe to call more than once.
    pub fn dispose(&self) {
        self.inner.teardown();
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub fn current_scope() -> Option<Scope> {
    CURRENT_SCOPE.with(|current| {
        current
            .borrow()
            .as_ref()
            .and_then(|weak| weak.upgrade().map(|inner| Scope { inner }))
    })
}

/// A scheduler's registration with the scope that was current when it was
/// created. Dropping the link withdraws the disposer.
pub(crate) struct ScopeLink {
    scope: Weak<ScopeInner>,
    id: DisposerId,
}

impl ScopeLink {
    pub(crate) fn register(disposer: impl FnOnce() + 'static) -> Option<Self> {
        let scope = current_scope()?;
        let id = scope.inner.push(Box::new(disposer));
        Some(Self {
            scope: Rc::downgrade(&scope.inner),
            id,
        })
    }
}

impl Drop for ScopeLink {
    fn drop(&mut self) {
        if let Some(scope) = self.scope.upgrade() {
            scope.remove(self.id);
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.teardown();
    }
}
