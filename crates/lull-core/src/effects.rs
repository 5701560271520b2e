use std::cell::RefCell;
use std::rc::Rc;

type Cleanup = Box<dyn FnOnce()>;

/// A cleanup that runs at most once, however many clones call [`Dispose::run`].
#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Cleanup>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    pub fn noop() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    pub fn run(&self) {
        // take first: the cleanup may drop the last clone of this guard
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn is_done(&self) -> bool {
        self.0.borrow().is_none()
    }
}

/// Runs `f()` now and ties the returned cleanup to the current scope, if any.
pub fn effect<F>(f: F) -> Dispose
where
    F: FnOnce() -> Dispose + 'static,
{
    let d = f();
    if let Some(scope) = crate::scope::current_scope() {
        let d2 = d.clone();
        scope.add_disposer(move || d2.run());
    }
    d
}
