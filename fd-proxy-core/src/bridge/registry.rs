use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::access_mode::{AccessMode, HandleId};
use crate::models::error::ProxyError;
use crate::traits::proxy_handler::{ProxyHandler, SharedHandler};

struct Slot {
    mode: AccessMode,
    /// Keeps the allocation's identity valid while the slot exists, so a
    /// freed handler's address can never alias a new one.
    handler: Weak<Mutex<dyn ProxyHandler>>,
}

impl Slot {
    fn is_bound_to(&self, handler: &SharedHandler) -> bool {
        Weak::ptr_eq(&self.handler, &Arc::downgrade(handler))
    }
}

/// Descriptor table of one bridge.
///
/// A slot is taken on open and freed by the worker after `Release`.
pub(crate) struct Registry {
    capacity: usize,
    slots: HashMap<HandleId, Slot>,
}

impl Registry {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: HashMap::new(),
        }
    }

    pub(crate) fn register(
        &mut self,
        id: HandleId,
        mode: AccessMode,
        handler: &SharedHandler,
    ) -> Result<(), ProxyError> {
        if self.slots.values().any(|slot| slot.is_bound_to(handler)) {
            return Err(ProxyError::AlreadyBound);
        }
        if self.slots.len() >= self.capacity {
            return Err(ProxyError::ResourceExhausted(format!(
                "descriptor table full ({} open)",
                self.capacity
            )));
        }
        self.slots.insert(
            id,
            Slot {
                mode,
                handler: Arc::downgrade(handler),
            },
        );
        Ok(())
    }

    /// Free the slot, returning the mode it was opened with.
    pub(crate) fn unregister(&mut self, id: HandleId) -> Option<AccessMode> {
        self.slots.remove(&id).map(|slot| slot.mode)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::null_handler::NullHandler;

    fn shared() -> SharedHandler {
        Arc::new(Mutex::new(NullHandler::new()))
    }

    #[test]
    fn register_and_unregister() {
        let mut registry = Registry::new(2);
        let id = HandleId::next();
        registry.register(id, AccessMode::WriteOnly, &shared()).unwrap();

        assert_eq!(registry.len(), 1);

        assert_eq!(registry.unregister(id), Some(AccessMode::WriteOnly));
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.unregister(id), None);
    }

    #[test]
    fn full_table_is_exhausted() {
        let mut registry = Registry::new(1);
        let first = shared();
        let second = shared();
        registry.register(HandleId::next(), AccessMode::ReadOnly, &first).unwrap();

        let err = registry
            .register(HandleId::next(), AccessMode::ReadOnly, &second)
            .unwrap_err();
        assert!(matches!(err, ProxyError::ResourceExhausted(_)));
    }

    #[test]
    fn dropped_handler_does_not_alias_a_new_one() {
        let mut registry = Registry::new(4);
        let id = HandleId::next();
        registry.register(id, AccessMode::WriteOnly, &shared()).unwrap();

        // The first handler's allocation is gone; whatever address the
        // allocator hands out next must not be mistaken for it.
        for _ in 0..8 {
            let fresh = shared();
            let fresh_id = HandleId::next();
            registry.register(fresh_id, AccessMode::WriteOnly, &fresh).unwrap();
            registry.unregister(fresh_id);
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_handler_twice_is_already_bound() {
        let mut registry = Registry::new(4);
        let handler = shared();
        registry.register(HandleId::next(), AccessMode::WriteOnly, &handler).unwrap();

        let err = registry
            .register(HandleId::next(), AccessMode::WriteOnly, &handler)
            .unwrap_err();
        assert_eq!(err, ProxyError::AlreadyBound);
    }
}
