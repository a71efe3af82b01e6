use crate::domain::{
    check_completeness, infer_direction, Appended, AssetBuffer, BufferIndex, CloseAttempt,
};
use async_trait::async_trait;
use common::domain::{DomainResult, MovementDecision, ReadContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

/// Default silence window: how long an asset must go unseen before its
/// buffer is closed
pub const DEFAULT_SILENCE_WINDOW: Duration = Duration::from_secs(2);

/// Accepts resolved reads for aggregation
#[cfg_attr(test, mockall::automock)]
pub trait ReadAggregator: Send + Sync {
    /// Add a read to its asset's buffer. Never blocks.
    fn add_read(&self, read: ReadContext);
}

/// Receives one decision per closed buffer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionSink: Send + Sync {
    async fn dispatch(&self, decision: MovementDecision) -> DomainResult<()>;
}

/// Buffers reads per asset and emits a movement decision once the asset has
/// been silent for the full window.
///
/// Every read postpones closure (sliding window). Each open buffer is
/// watched by its own task, which removes the buffer from the index before
/// processing it, so later reads for the same asset open a new buffer.
///
/// `add_read` spawns onto the current tokio runtime and must be called from
/// within one.
#[derive(Clone)]
pub struct TagAggregator {
    inner: Arc<AggregatorInner>,
}

struct AggregatorInner {
    index: BufferIndex,
    silence_window: Duration,
    sink: Arc<dyn DecisionSink>,
}

impl TagAggregator {
    pub fn new(silence_window: Duration, sink: Arc<dyn DecisionSink>) -> Self {
        Self {
            inner: Arc::new(AggregatorInner {
                index: BufferIndex::new(),
                silence_window,
                sink,
            }),
        }
    }

    pub fn silence_window(&self) -> Duration {
        self.inner.silence_window
    }

    /// Number of assets with a live buffer
    pub fn open_buffers(&self) -> usize {
        self.inner.index.open_buffers()
    }

    pub fn pending_reads(&self, asset_id: &str) -> usize {
        self.inner.index.pending_reads(asset_id)
    }
}

impl ReadAggregator for TagAggregator {
    fn add_read(&self, read: ReadContext) {
        let asset_id = read.asset_id.clone();
        let deadline = Instant::now() + self.inner.silence_window;

        match self.inner.index.append(read, deadline) {
            Appended::Opened {
                buffer_id,
                deadline,
            } => {
                debug!(asset_id = %asset_id, buffer_id, "opened asset buffer");
                let span = info_span!(
                    parent: Span::none(),
                    "asset_buffer",
                    asset_id = %asset_id,
                    buffer_id,
                );
                let inner = Arc::clone(&self.inner);
                tokio::spawn(
                    async move { inner.watch_buffer(asset_id, buffer_id, deadline).await }
                        .instrument(span),
                );
            }
            Appended::Extended { buffer_id } => {
                debug!(asset_id = %asset_id, buffer_id, "extended asset buffer");
            }
        }
    }
}

impl AggregatorInner {
    /// Sleep until the buffer's deadline, re-arming while reads keep arriving
    async fn watch_buffer(&self, asset_id: String, buffer_id: u64, mut deadline: Instant) {
        loop {
            tokio::time::sleep_until(deadline).await;

            match self.index.close_if_expired(&asset_id, buffer_id, Instant::now()) {
                CloseAttempt::Closed(buffer) => {
                    self.close_and_process(buffer).await;
                    return;
                }
                CloseAttempt::Postponed(next) => deadline = next,
                CloseAttempt::Gone => {
                    debug!("buffer already closed");
                    return;
                }
            }
        }
    }

    async fn close_and_process(&self, buffer: AssetBuffer) {
        let initial = buffer.initial_context().clone();
        let reads = buffer.into_reads();
        if reads.is_empty() {
            return;
        }

        let Some(decision) = decide(&initial, &reads) else {
            return;
        };

        if !decision.is_complete {
            warn!(
                asset_id = %decision.asset_id,
                policy_class = %initial.policy_class,
                tag_count = decision.tag_count,
                message = %decision.validation_message,
                "incomplete read for asset"
            );
        }

        info!(
            asset_id = %decision.asset_id,
            policy_class = %initial.policy_class,
            tag_count = decision.tag_count,
            read_count = reads.len(),
            direction = %decision.direction,
            message = %decision.validation_message,
            "asset buffer closed"
        );

        let asset_id = decision.asset_id.clone();
        let gate_id = decision.gate_id.clone();
        if let Err(e) = self.sink.dispatch(decision).await {
            error!(
                asset_id = %asset_id,
                gate_id = %gate_id,
                error = %e,
                "failed to dispatch movement decision"
            );
        }
    }
}

/// Build the decision for a closed buffer's reads.
///
/// Static fields come from the buffer's first read. The decision timestamp
/// is the latest read, i.e. when the asset was last seen at the gate.
pub fn decide(initial: &ReadContext, reads: &[ReadContext]) -> Option<MovementDecision> {
    let last_seen = reads.iter().map(|read| read.timestamp).max()?;
    let completeness = check_completeness(initial.policy_class, reads);

    Some(MovementDecision {
        asset_id: initial.asset_id.clone(),
        reader_id: initial.reader_id.clone(),
        gate_id: initial.gate_id.clone(),
        direction: infer_direction(reads),
        is_complete: completeness.is_complete,
        validation_message: completeness.message,
        tag_count: completeness.distinct_tags,
        timestamp: last_seen,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use common::domain::{AssetPolicyClass, Direction, DomainError};
    use tokio::sync::mpsc;

    const WINDOW: Duration = Duration::from_secs(2);

    /// Forwards every decision into a channel the test can inspect
    struct ChannelSink {
        sender: mpsc::UnboundedSender<MovementDecision>,
    }

    #[async_trait]
    impl DecisionSink for ChannelSink {
        async fn dispatch(&self, decision: MovementDecision) -> DomainResult<()> {
            let _ = self.sender.send(decision);
            Ok(())
        }
    }

    fn aggregator() -> (TagAggregator, mpsc::UnboundedReceiver<MovementDecision>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            TagAggregator::new(WINDOW, Arc::new(ChannelSink { sender })),
            receiver,
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 6, 8, 0, 0).unwrap()
    }

    fn read(asset_id: &str, policy: AssetPolicyClass, epc: &str, antenna: u16, secs: i64) -> ReadContext {
        ReadContext {
            asset_id: asset_id.to_string(),
            policy_class: policy,
            epc: epc.to_string(),
            antenna_id: antenna,
            timestamp: t0() + chrono::Duration::seconds(secs),
            reader_id: "fx-1".to_string(),
            gate_id: "gate-1".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_within_window_produce_one_decision() {
        let (aggregator, mut decisions) = aggregator();

        aggregator.add_read(read("a1", AssetPolicyClass::Container, "E1", 1, 0));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        aggregator.add_read(read("a1", AssetPolicyClass::Container, "E2", 1, 1));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        aggregator.add_read(read("a1", AssetPolicyClass::Container, "E3", 2, 2));

        // 3s after the first read, but the window keeps sliding
        assert!(decisions.try_recv().is_err());
        assert_eq!(aggregator.open_buffers(), 1);
        assert_eq!(aggregator.pending_reads("a1"), 3);

        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;

        let decision = decisions.recv().await.unwrap();
        assert_eq!(decision.asset_id, "a1");
        assert_eq!(decision.tag_count, 3);
        assert!(decision.is_complete);
        assert_eq!(decision.validation_message, "OK");
        assert_eq!(decision.direction, Direction::In);
        assert_eq!(decision.timestamp, t0() + chrono::Duration::seconds(2));
        assert!(decisions.try_recv().is_err());
        assert_eq!(aggregator.open_buffers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_separated_by_silence_produce_separate_decisions() {
        let (aggregator, mut decisions) = aggregator();

        aggregator.add_read(read("a1", AssetPolicyClass::Normal, "E1", 1, 0));
        aggregator.add_read(read("a1", AssetPolicyClass::Normal, "E1", 2, 1));
        tokio::time::sleep(WINDOW + Duration::from_millis(500)).await;

        aggregator.add_read(read("a1", AssetPolicyClass::Normal, "E1", 2, 10));
        aggregator.add_read(read("a1", AssetPolicyClass::Normal, "E1", 1, 11));
        tokio::time::sleep(WINDOW + Duration::from_millis(500)).await;

        let first = decisions.recv().await.unwrap();
        let second = decisions.recv().await.unwrap();
        assert_eq!(first.direction, Direction::In);
        assert_eq!(first.timestamp, t0() + chrono::Duration::seconds(1));
        assert_eq!(second.direction, Direction::Out);
        assert_eq!(second.timestamp, t0() + chrono::Duration::seconds(11));
        assert!(decisions.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_incomplete_container_is_still_dispatched() {
        let (aggregator, mut decisions) = aggregator();

        aggregator.add_read(read("c1", AssetPolicyClass::Container, "E1", 1, 0));
        aggregator.add_read(read("c1", AssetPolicyClass::Container, "E2", 1, 0));
        aggregator.add_read(read("c1", AssetPolicyClass::Container, "E2", 2, 1));
        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;

        let decision = decisions.recv().await.unwrap();
        assert!(!decision.is_complete);
        assert_eq!(decision.tag_count, 2);
        assert_eq!(
            decision.validation_message,
            "Expected 3 tags for Container, found 2"
        );
        assert_eq!(decision.direction, Direction::In);
    }

    #[tokio::test(start_paused = true)]
    async fn test_assets_are_aggregated_independently() {
        let (aggregator, mut decisions) = aggregator();

        aggregator.add_read(read("a1", AssetPolicyClass::Vehicle, "V1", 2, 0));
        aggregator.add_read(read("a2", AssetPolicyClass::Vehicle, "W1", 3, 0));
        aggregator.add_read(read("a1", AssetPolicyClass::Vehicle, "V2", 1, 1));
        aggregator.add_read(read("a2", AssetPolicyClass::Vehicle, "W2", 4, 1));
        assert_eq!(aggregator.open_buffers(), 2);

        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;

        let mut received = vec![
            decisions.recv().await.unwrap(),
            decisions.recv().await.unwrap(),
        ];
        received.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));

        assert_eq!(received[0].asset_id, "a1");
        assert_eq!(received[0].direction, Direction::Out);
        assert_eq!(received[0].tag_count, 2);
        assert_eq!(received[1].asset_id, "a2");
        assert_eq!(received[1].direction, Direction::Transition { from: 3, to: 4 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_decision_uses_initial_context_for_static_fields() {
        let (aggregator, mut decisions) = aggregator();

        let mut first = read("a1", AssetPolicyClass::Vehicle, "V1", 1, 0);
        first.reader_id = "fx-north".to_string();
        first.gate_id = "gate-north".to_string();
        let mut second = read("a1", AssetPolicyClass::Normal, "V1", 1, 1);
        second.reader_id = "fx-south".to_string();
        second.gate_id = "gate-south".to_string();

        aggregator.add_read(first);
        aggregator.add_read(second);
        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;

        let decision = decisions.recv().await.unwrap();
        assert_eq!(decision.reader_id, "fx-north");
        assert_eq!(decision.gate_id, "gate-north");
        // Vehicle policy from the first read, one distinct tag
        assert!(!decision.is_complete);
        assert_eq!(decision.validation_message, "Expected 2 tags for Vehicle, found 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_reads_for_same_asset_are_never_lost() {
        let (aggregator, mut decisions) = aggregator();

        let mut handles = Vec::new();
        for i in 0..50 {
            let aggregator = aggregator.clone();
            handles.push(tokio::spawn(async move {
                aggregator.add_read(read(
                    "a1",
                    AssetPolicyClass::Normal,
                    &format!("E{}", i),
                    1,
                    i,
                ));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(aggregator.open_buffers(), 1);
        assert_eq!(aggregator.pending_reads("a1"), 50);

        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;

        let decision = decisions.recv().await.unwrap();
        assert_eq!(decision.tag_count, 50);
        assert!(decisions.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_reads_racing_buffer_closes_are_all_accounted_for() {
        const TASKS: usize = 8;
        const READS_PER_TASK: usize = 2_500;

        let (sender, mut decisions) = mpsc::unbounded_channel();
        let aggregator =
            TagAggregator::new(Duration::from_millis(3), Arc::new(ChannelSink { sender }));

        let mut handles = Vec::new();
        for task in 0..TASKS {
            let aggregator = aggregator.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..READS_PER_TASK {
                    aggregator.add_read(read(
                        "a1",
                        AssetPolicyClass::Normal,
                        &format!("E{}-{}", task, i),
                        1,
                        i as i64,
                    ));
                    // Pause past the window now and then so buffers close mid-stream
                    if i % 500 == 499 {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let expected = TASKS * READS_PER_TASK;
        let mut tags = 0;
        while tags < expected {
            let decision = tokio::time::timeout(Duration::from_secs(10), decisions.recv())
                .await
                .expect("timed out waiting for decisions")
                .unwrap();
            tags += decision.tag_count;
        }

        assert_eq!(tags, expected);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(decisions.try_recv().is_err());
        assert_eq!(aggregator.open_buffers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_after_close_opens_new_buffer() {
        let (aggregator, mut decisions) = aggregator();

        aggregator.add_read(read("a1", AssetPolicyClass::Normal, "E1", 1, 0));
        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;
        let first = decisions.recv().await.unwrap();
        assert_eq!(first.tag_count, 1);
        assert_eq!(aggregator.open_buffers(), 0);

        aggregator.add_read(read("a1", AssetPolicyClass::Normal, "E2", 2, 5));
        assert_eq!(aggregator.open_buffers(), 1);
        assert_eq!(aggregator.pending_reads("a1"), 1);

        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;
        let second = decisions.recv().await.unwrap();
        assert_eq!(second.direction, Direction::Out);
        assert_eq!(second.tag_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_does_not_affect_other_buffers() {
        let mut sink = MockDecisionSink::new();
        sink.expect_dispatch()
            .withf(|decision| decision.asset_id == "broken")
            .times(1)
            .returning(|_| Err(DomainError::RepositoryError(anyhow::anyhow!("db down"))));
        sink.expect_dispatch()
            .withf(|decision| decision.asset_id == "healthy")
            .times(1)
            .returning(|_| Ok(()));

        let aggregator = TagAggregator::new(WINDOW, Arc::new(sink));
        aggregator.add_read(read("broken", AssetPolicyClass::Normal, "E1", 1, 0));
        aggregator.add_read(read("healthy", AssetPolicyClass::Normal, "E2", 1, 0));

        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;
        // Let both buffer tasks finish dispatching
        tokio::task::yield_now().await;
        assert_eq!(aggregator.open_buffers(), 0);
    }

    #[test]
    fn test_decide_on_single_read() {
        let only = read("a1", AssetPolicyClass::Normal, "E1", 3, 0);
        let decision = decide(&only, std::slice::from_ref(&only)).unwrap();

        assert_eq!(decision.direction, Direction::Unknown);
        assert_eq!(decision.tag_count, 1);
        assert!(decision.is_complete);
        assert_eq!(decision.timestamp, t0());
    }

    #[test]
    fn test_decide_on_no_reads() {
        let initial = read("a1", AssetPolicyClass::Normal, "E1", 1, 0);
        assert!(decide(&initial, &[]).is_none());
    }
}
