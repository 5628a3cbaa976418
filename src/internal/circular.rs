//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::registration::RegistrationId;

struct Frame {
    registration: RegistrationId,
    service: String,
}

/// Registrations currently being activated by one resolve operation.
///
/// Each operation owns its stack, so concurrent resolutions on other threads
/// never observe each other's frames.
pub(crate) struct ResolveStack {
    frames: RefCell<Vec<Frame>>,
    max_depth: usize,
}

impl ResolveStack {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            frames: RefCell::new(Vec::new()),
            max_depth,
        }
    }

    /// Pushes a frame for `registration`, failing when it is already being
    /// activated further up the stack or the depth limit is reached.
    pub(crate) fn enter(&self, registration: RegistrationId, service: &str) -> DiResult<StackGuard<'_>> {
        let mut frames = self.frames.borrow_mut();

        // Circular detection BEFORE pushing the new frame
        if frames.iter().any(|f| f.registration == registration) {
            let mut path: Vec<String> = frames.iter().map(|f| f.service.clone()).collect();
            path.push(service.to_string());
            return Err(DiError::Circular(path));
        }

        if frames.len() >= self.max_depth {
            return Err(DiError::DepthExceeded(frames.len()));
        }

        frames.push(Frame {
            registration,
            service: service.to_string(),
        });
        Ok(StackGuard { stack: self })
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

/// Pops the frame pushed by [`ResolveStack::enter`] when dropped.
pub(crate) struct StackGuard<'a> {
    stack: &'a ResolveStack,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.frames.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_the_whole_chain() {
        let stack = ResolveStack::new(16);
        let a = RegistrationId::next();
        let b = RegistrationId::next();

        let _ga = stack.enter(a, "A").unwrap();
        let _gb = stack.enter(b, "B").unwrap();
        match stack.enter(a, "A") {
            Err(DiError::Circular(path)) => assert_eq!(path, vec!["A", "B", "A"]),
            _ => panic!("expected a circular dependency"),
        }
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn guard_pops_and_depth_is_bounded() {
        let stack = ResolveStack::new(1);
        let a = RegistrationId::next();
        {
            let _g = stack.enter(a, "A").unwrap();
            assert!(matches!(stack.enter(RegistrationId::next(), "B"), Err(DiError::DepthExceeded(1))));
        }
        assert_eq!(stack.depth(), 0);
        assert!(stack.enter(a, "A").is_ok());
    }
}
