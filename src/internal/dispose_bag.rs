//! Internal disposal bag for managing cleanup hooks.

pub(crate) type Disposer = Box<dyn FnOnce() + Send>;

/// Container for disposal hooks with LIFO execution order.
///
/// Once closed the bag refuses new hooks: the owning scope is disposing or
/// disposed, and anything pushed afterwards would never run.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<Disposer>,
    closed: bool,
}

impl DisposeBag {
    /// Adds a hook, handing it back if the bag is already closed.
    pub(crate) fn push(&mut self, f: Disposer) -> Result<(), Disposer> {
        if self.closed {
            return Err(f);
        }
        self.hooks.push(f);
        Ok(())
    }

    /// Closes the bag and returns its hooks in execution (reverse) order.
    pub(crate) fn close(&mut self) -> Vec<Disposer> {
        self.closed = true;
        let mut hooks = std::mem::take(&mut self.hooks);
        hooks.reverse();
        hooks
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}
