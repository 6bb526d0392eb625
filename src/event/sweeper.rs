use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument};

use super::bus::EventBus;

/// Periodically releases lanes of topics that lost all their subscribers
///
/// Lanes are also released at the end of every submit; this catches topics
/// that went quiet after their last subscriber left.
#[instrument(skip(bus))]
pub async fn start_lane_sweeper(bus: EventBus, every: Duration) {
    info!(
        interval_secs = every.as_secs(),
        "Starting lane sweeper background task"
    );

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let released = bus.release_idle_lanes();
        if released > 0 {
            info!(released, remaining = bus.lane_count(), "Released idle lanes");
        } else {
            debug!(remaining = bus.lane_count(), "No idle lanes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DomainEvent, FanoutDispatcher, TopicKey};
    use crate::metrics::DispatchMetrics;
    use crate::schema::{default_registry, PacketVersion, WireFormat};
    use crate::subscriber::{ChannelConfig, Subscriber, TopicIndex};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sweeper_releases_abandoned_lanes() {
        let bus = EventBus::new(FanoutDispatcher::new(
            Arc::new(default_registry().unwrap()),
            TopicIndex::new(),
            Arc::new(DispatchMetrics::new()),
        ));
        let (alice, _rx) =
            Subscriber::new(PacketVersion::V1, WireFormat::Json, ChannelConfig::default());
        bus.topic_index()
            .subscribe(&TopicKey::new("c1"), &alice)
            .unwrap();
        bus.submit(DomainEvent::post_reaction_add("c1", "p1", "👍", None, "alice"))
            .await
            .unwrap();
        bus.topic_index().disconnect(&alice);
        assert_eq!(bus.lane_count(), 1);

        let sweeper = tokio::spawn(start_lane_sweeper(bus.clone(), Duration::from_millis(20)));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(bus.lane_count(), 0);
        sweeper.abort();
    }
}
