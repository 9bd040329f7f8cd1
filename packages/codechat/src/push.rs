//! Push Hub
//!
//! Fans bridge events out to every connected viewer. Fire-and-forget: no
//! acknowledgements, no replay for late joiners, and a viewer that falls
//! behind the channel capacity skips what it missed.

use chat_session::PushEvent;
use tokio::sync::broadcast;
use tracing::debug;

pub struct PushHub {
    tx: broadcast::Sender<PushEvent>,
}

impl PushHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send `event` to every current subscriber. Returns how many received it.
    pub fn publish(&self, event: PushEvent) -> usize {
        let name = event.name();
        match self.tx.send(event) {
            Ok(n) => {
                debug!("Pushed {} to {} viewer(s)", name, n);
                n
            }
            Err(_) => {
                debug!("Pushed {} with no viewers connected", name);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.tx.subscribe()
    }

    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_session::Chat;

    #[test]
    fn publish_without_viewers_is_not_an_error() {
        let hub = PushHub::new(8);
        assert_eq!(hub.publish(PushEvent::Qr("x".into())), 0);
    }

    #[tokio::test]
    async fn every_subscriber_gets_each_event() {
        let hub = PushHub::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.viewer_count(), 2);

        let event = PushEvent::Ready(vec![Chat::new("a", "Alice")]);
        assert_eq!(hub.publish(event.clone()), 2);
        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn late_subscriber_gets_no_replay() {
        let hub = PushHub::new(8);
        let _early = hub.subscribe();
        hub.publish(PushEvent::Qr("first".into()));

        let mut late = hub.subscribe();
        hub.publish(PushEvent::Qr("second".into()));
        assert_eq!(late.recv().await.unwrap(), PushEvent::Qr("second".into()));
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let hub = PushHub::new(2);
        let mut slow = hub.subscribe();
        for i in 0..5 {
            hub.publish(PushEvent::Qr(i.to_string()));
        }
        assert!(matches!(
            slow.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(slow.recv().await.unwrap(), PushEvent::Qr("3".into()));
    }
}
