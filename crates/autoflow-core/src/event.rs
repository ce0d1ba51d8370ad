use tokio::sync::broadcast;

use crate::types::{RunEvent, RunId};

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of [`RunEvent`]s to any number of observers.
///
/// Slow subscribers lag and lose the oldest events; publishers never block.
pub struct EventBus {
    tx: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Returns how many subscribers will see it.
    pub fn publish(&self, event: RunEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RunEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::NodeProgress { run_id, .. }
            | Self::RunFinished { run_id, .. } => run_id,
        }
    }
}

/// Wait until `run_id` finishes, collecting its events along the way.
///
/// Returns `None` if the bus closes first.
pub async fn collect_run(
    rx: &mut broadcast::Receiver<RunEvent>,
    run_id: &RunId,
) -> Option<Vec<RunEvent>> {
    let mut events = Vec::new();
    loop {
        match rx.recv().await {
            Ok(event) if event.run_id() == run_id => {
                let done = matches!(event, RunEvent::RunFinished { .. });
                events.push(event);
                if done {
                    return Some(events);
                }
            }
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeProgress;

    #[tokio::test]
    async fn test_collect_run_filters_other_runs() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let mine = RunId::from_string("r1");
        let other = RunId::from_string("r2");

        bus.publish(RunEvent::RunStarted {
            run_id: mine.clone(),
            workflow_id: "wf".into(),
        });
        bus.publish(RunEvent::RunStarted {
            run_id: other.clone(),
            workflow_id: "wf".into(),
        });
        bus.publish(RunEvent::NodeProgress {
            run_id: mine.clone(),
            node_id: "a".into(),
            progress: NodeProgress::Running,
        });
        assert_eq!(
            bus.publish(RunEvent::RunFinished {
                run_id: mine.clone(),
                success: true,
                cancelled: false,
            }),
            1
        );

        let events = collect_run(&mut rx, &mine).await.unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.run_id() == &mine));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        let delivered = bus.publish(RunEvent::RunFinished {
            run_id: RunId::new(),
            success: true,
            cancelled: false,
        });
        assert_eq!(delivered, 0);
    }
}
