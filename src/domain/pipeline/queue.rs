use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

struct QueueInner<T> {
    items: VecDeque<T>,
    /// One-shot listener armed by a consumer waiting on several queues.
    listener: Option<Arc<Notify>>,
}

/// An unbounded FIFO shared between one producer side and one consumer
/// side of a pipeline edge.
///
/// `put` never blocks; flow control is achieved by the demand protocol,
/// not by bounding the queue. A consumer that must wait on several queues
/// at once arms the same one-shot listener on each of them and parks on it
/// once, instead of polling.
pub struct Queue<T> {
    inner: Mutex<QueueInner<T>>,
    takers: Notify,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Queue { inner: Mutex::new(QueueInner { items: VecDeque::new(), listener: None }), takers: Notify::new() }
    }

    /// Appends a value, wakes one blocked `take` and fires the installed
    /// one-shot listener.
    pub fn put(&self, value: T) {
        let listener = {
            let mut inner = self.inner.lock().expect("queue lock poisoned");
            inner.items.push_back(value);
            inner.listener.take()
        };

        self.takers.notify_one();
        if let Some(listener) = listener {
            listener.notify_one();
        }
    }

    /// Removes the head element, parking until one is available.
    pub async fn take(&self) -> T {
        loop {
            if let Some(value) = self.try_take() {
                return value;
            }
            self.takers.notified().await;
        }
    }

    /// Removes the head element if one is present.
    pub fn try_take(&self) -> Option<T> {
        self.inner.lock().expect("queue lock poisoned").items.pop_front()
    }

    /// Removes and returns the first element matching the predicate,
    /// leaving the rest of the queue untouched.
    pub fn take_matching(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        let position = inner.items.iter().position(|item| predicate(item))?;
        inner.items.remove(position)
    }

    /// Removes every queued element.
    pub fn drain(&self) -> Vec<T> {
        self.inner.lock().expect("queue lock poisoned").items.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("queue lock poisoned").items.is_empty()
    }

    /// Arms a one-shot notification for the next `put`.
    ///
    /// If the queue is non-empty at installation time the listener fires
    /// immediately, so a consumer racing a producer never parks on a
    /// queue that already has data.
    pub fn add_listener(&self, listener: Arc<Notify>) {
        let fire_now = {
            let mut inner = self.inner.lock().expect("queue lock poisoned");
            if inner.items.is_empty() {
                inner.listener = Some(listener.clone());
                false
            } else {
                true
            }
        };

        if fire_now {
            listener.notify_one();
        }
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_put_take_is_fifo() {
        let queue = Queue::new();
        queue.put(1);
        queue.put(2);
        queue.put(3);

        assert_eq!(queue.take().await, 1);
        assert_eq!(queue.take().await, 2);
        assert_eq!(queue.take().await, 3);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_take_blocks_until_put() {
        let queue = Arc::new(Queue::new());

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.take().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.put(42);

        let value = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("take did not complete")
            .expect("consumer task failed");
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_listener_fires_on_next_put() {
        let queue: Queue<u32> = Queue::new();
        let listener = Arc::new(Notify::new());

        queue.add_listener(listener.clone());
        queue.put(7);

        tokio::time::timeout(Duration::from_secs(1), listener.notified())
            .await
            .expect("listener was not notified");
    }

    #[tokio::test]
    async fn test_listener_fires_immediately_when_not_empty() {
        let queue: Queue<u32> = Queue::new();
        queue.put(7);

        let listener = Arc::new(Notify::new());
        queue.add_listener(listener.clone());

        tokio::time::timeout(Duration::from_secs(1), listener.notified())
            .await
            .expect("listener was not notified");
    }

    #[tokio::test]
    async fn test_listener_is_one_shot() {
        let queue: Queue<u32> = Queue::new();
        let listener = Arc::new(Notify::new());

        queue.add_listener(listener.clone());
        queue.put(1);
        listener.notified().await;

        // A second put must not fire the consumed listener again.
        queue.put(2);
        let second = tokio::time::timeout(Duration::from_millis(50), listener.notified()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_take_matching_leaves_other_elements() {
        let queue = Queue::new();
        queue.put(1);
        queue.put(2);
        queue.put(3);

        assert_eq!(queue.take_matching(|v| *v == 2), Some(2));
        assert_eq!(queue.take_matching(|v| *v == 9), None);
        assert_eq!(queue.drain(), vec![1, 3]);
    }
}
