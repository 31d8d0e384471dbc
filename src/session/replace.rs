use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// A higher-LOD model taking over from one loaded at a lower LOD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub key: String,
    pub retired_name: String,
    pub replacement_name: String,
    pub lod: i32,
}

pub type ReplacementBatch = Vec<Replacement>;

/// LIFO handoff between feature producers and the consumer applying swaps.
#[derive(Debug)]
pub struct ReplacementStack<T> {
    items: Mutex<Vec<T>>,
    ready: Condvar,
}

impl<T> Default for ReplacementStack<T> {
    fn default() -> Self { Self { items: Mutex::new(Vec::new()), ready: Condvar::new() } }
}

impl<T> ReplacementStack<T> {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, item: T) {
        self.lock().push(item);
        self.ready.notify_one();
    }

    pub fn pop(&self) -> Option<T> { self.lock().pop() }

    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.lock().last().cloned()
    }

    pub fn is_empty(&self) -> bool { self.lock().is_empty() }

    pub fn len(&self) -> usize { self.lock().len() }

    /// Block until an item is available, or until `timeout` elapses.
    pub fn wait_pop(&self, timeout: Option<Duration>) -> Option<T> {
        let guard = self.lock();
        let mut guard = match timeout {
            Some(t) => self
                .ready
                .wait_timeout_while(guard, t, |items| items.is_empty())
                .map(|(g, _)| g)
                .unwrap_or_else(|e| e.into_inner().0),
            None => self
                .ready
                .wait_while(guard, |items| items.is_empty())
                .unwrap_or_else(|e| e.into_inner()),
        };
        guard.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn last_in_first_out() {
        let stack = ReplacementStack::new();
        stack.push(1);
        stack.push(2);
        assert_eq!(stack.peek(), Some(2));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert!(stack.is_empty());
        assert_eq!(stack.wait_pop(Some(Duration::from_millis(5))), None);
    }

    #[test]
    fn blocking_consumer_wakes() {
        let stack = Arc::new(ReplacementStack::new());
        let consumer = {
            let stack = Arc::clone(&stack);
            std::thread::spawn(move || stack.wait_pop(None))
        };
        stack.push(vec![Replacement {
            key: "AL015_000_house.flt".into(),
            retired_name: "a".into(),
            replacement_name: "b".into(),
            lod: 3,
        }]);
        let batch = consumer.join().unwrap().unwrap();
        assert_eq!(batch[0].lod, 3);
    }
}
