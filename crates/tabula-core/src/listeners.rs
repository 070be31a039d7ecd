//! Ordered listener registry, shared by the scroll surface and the table.

use smallvec::SmallVec;

/// Callback receiving each published event. Listeners get `&mut E`; whether
/// a modification is read back is up to the publisher.
pub type Listener<E> = Box<dyn FnMut(&mut E)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct Listeners<E> {
    next_id: u64,
    entries: SmallVec<[(ListenerId, Listener<E>); 2]>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: SmallVec::new(),
        }
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("count", &self.entries.len()).finish()
    }
}

impl<E> Listeners<E> {
    pub fn add(&mut self, listener: impl FnMut(&mut E) + 'static) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, Box::new(listener)));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delivers `event` to every listener in registration order and returns
    /// it with any modifications applied.
    pub fn emit(&mut self, mut event: E) -> E {
        for (_, listener) in self.entries.iter_mut() {
            listener(&mut event);
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, PartialEq)]
    enum Ping {
        Target(u32),
    }

    #[test]
    fn listeners_run_in_order_and_can_rewrite_the_event() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        let log = Rc::clone(&seen);
        listeners.add(move |event: &mut Ping| {
            log.borrow_mut().push(1);
            let Ping::Target(target) = event;
            *target = 300;
        });
        let log = Rc::clone(&seen);
        let second = listeners.add(move |_: &mut Ping| log.borrow_mut().push(2));

        assert_eq!(listeners.emit(Ping::Target(430)), Ping::Target(300));
        assert_eq!(*seen.borrow(), vec![1, 2]);

        assert!(listeners.remove(second));
        assert!(!listeners.remove(second));
        assert_eq!(listeners.len(), 1);
    }
}
