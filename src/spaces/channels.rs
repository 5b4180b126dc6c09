use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// One broadcast channel per visual space. A subscriber only ever receives
/// what was published to its own space id, so messages cannot leak across
/// workspaces. Senders also receive their own publishes back through the
/// channel.
#[derive(Clone, Default)]
pub struct SpaceChannels {
    inner: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
}

impl SpaceChannels {
    pub fn subscribe(&self, space_id: &str) -> broadcast::Receiver<String> {
        let mut map = self.inner.lock().expect("channel registry poisoned");
        map.entry(space_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn publish(&self, space_id: &str, payload: String) {
        let map = self.inner.lock().expect("channel registry poisoned");
        if let Some(tx) = map.get(space_id) {
            // no subscribers is fine; the row is already persisted
            let _ = tx.send(payload);
        }
    }

    /// Drops a space's channel once its last subscriber is gone. Called on
    /// socket teardown so idle spaces do not accumulate channels.
    pub fn release(&self, space_id: &str) {
        let mut map = self.inner.lock().expect("channel registry poisoned");
        if map.get(space_id).is_some_and(|tx| tx.receiver_count() == 0) {
            map.remove(space_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[tokio::test]
    async fn publish_reaches_only_the_matching_space() {
        let channels = SpaceChannels::default();
        let mut rx_42 = channels.subscribe("42");
        let mut rx_99 = channels.subscribe("99");

        channels.publish("99", "for 99".to_string());

        assert!(matches!(rx_42.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(rx_99.try_recv().unwrap(), "for 99");
    }

    #[tokio::test]
    async fn sender_receives_its_own_publish() {
        let channels = SpaceChannels::default();
        let mut rx = channels.subscribe("42");

        channels.publish("42", "hello".to_string());
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn resubscribing_to_another_space_never_sees_the_old_one() {
        let channels = SpaceChannels::default();
        let rx_old = channels.subscribe("42");
        drop(rx_old);
        channels.release("42");

        let mut rx_new = channels.subscribe("99");
        channels.publish("42", "stale".to_string());
        assert!(matches!(rx_new.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn release_after_an_aborted_forwarder_drops_the_channel() {
        let channels = SpaceChannels::default();
        let mut rx = channels.subscribe("42");
        let forwarder = tokio::spawn(async move { while rx.recv().await.is_ok() {} });

        // socket teardown order: stop the forwarder, wait it out, release
        forwarder.abort();
        let _ = forwarder.await;
        channels.release("42");
        assert_eq!(channels.len(), 0);
    }

    #[tokio::test]
    async fn release_drops_idle_channels_and_keeps_live_ones() {
        let channels = SpaceChannels::default();
        let rx_a = channels.subscribe("a");
        let rx_b = channels.subscribe("b");
        assert_eq!(channels.len(), 2);

        drop(rx_b);
        channels.release("b");
        assert_eq!(channels.len(), 1);

        channels.release("a");
        assert_eq!(channels.len(), 1);
        drop(rx_a);
    }
}
