use crate::model::ServerStatus;
use std::sync::Arc;
use tokio::sync::watch;

/// Latest known status, shared between the poller and any number of readers.
///
/// Publishing swaps the whole record, so a reader sees either the old value or
/// the new one, never a mix.
#[derive(Debug, Clone)]
pub struct StatusCache<T = ServerStatus> {
    sender: Arc<watch::Sender<T>>,
    receiver: watch::Receiver<T>,
}

impl<T: Clone> StatusCache<T> {
    pub fn new(initial: T) -> Self {
        let (sender, receiver) = watch::channel(initial);
        StatusCache {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn get(&self) -> T {
        self.receiver.borrow().clone()
    }

    pub fn publish(&self, value: T) {
        // send_replace succeeds even when no receiver is waiting
        self.sender.send_replace(value);
    }

    /// Waits for the next publish after this call.
    #[cfg(test)]
    pub async fn changed(&self) -> T {
        let mut receiver = self.sender.subscribe();
        // the sender is held by `self`, so this cannot observe a closed channel
        let _ = receiver.changed().await;
        let value = receiver.borrow_and_update().clone();
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_initial_value() {
        let cache = StatusCache::new(ServerStatus::placeholder("NovaX | Clan"));
        let status = cache.get();
        assert!(!status.is_online());
        assert_eq!(status.message(), Some("Checking status..."));
    }

    #[test]
    fn publish_is_visible_to_every_clone() {
        let cache = StatusCache::new(ServerStatus::placeholder("NovaX | Clan"));
        let reader = cache.clone();

        let status = ServerStatus::offline("NovaX | Clan", "Server is offline");
        cache.publish(status.clone());

        assert_eq!(reader.get(), status);
        assert_eq!(cache.get(), status);
    }

    #[tokio::test]
    async fn changed_resolves_on_publish() {
        let cache = StatusCache::new(0u32);
        let reader = cache.clone();
        let waiter = tokio::spawn(async move { reader.changed().await });
        tokio::task::yield_now().await;

        cache.publish(7);
        assert_eq!(waiter.await.unwrap(), 7);
    }
}
