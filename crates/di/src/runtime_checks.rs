//! Cycle detection for resolutions running on the current thread.

use std::cell::RefCell;

use crate::errors::{InjectionError, InjectionResult};
use crate::key::Key;

thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<Key>> = const { RefCell::new(Vec::new()) };
}

/// Marks a key as under construction until dropped
#[derive(Debug)]
pub(crate) struct ResolutionGuard {
    active: bool,
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        if self.active {
            RESOLUTION_STACK.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
    }
}

/// Push `key` on the resolution stack, failing if it is already being built
pub(crate) fn enter(key: &Key, enabled: bool) -> InjectionResult<ResolutionGuard> {
    if !enabled {
        return Ok(ResolutionGuard { active: false });
    }

    RESOLUTION_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.contains(key) {
            let path = stack
                .iter()
                .map(Key::to_string)
                .chain(std::iter::once(key.to_string()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(InjectionError::CyclicDependency {
                path,
                type_name: key.to_string(),
            });
        }
        stack.push(key.clone());
        Ok(ResolutionGuard { active: true })
    })
}

/// Number of keys currently under construction on this thread
#[cfg(test)]
pub(crate) fn depth() -> usize {
    RESOLUTION_STACK.with(|stack| stack.borrow().len())
}
