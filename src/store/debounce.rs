use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::store::{save_state, PersistedState, SaveOutcome, StatePort};

/// Coalesces state snapshots and writes the latest one after `delay` of quiet.
pub struct DebouncedSaver {
    tx: mpsc::UnboundedSender<PersistedState>,
    handle: JoinHandle<()>,
}

impl DebouncedSaver {
    pub fn spawn(port: Arc<dyn StatePort>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(port, delay, rx));
        Self { tx, handle }
    }

    pub fn schedule(&self, state: PersistedState) {
        if self.tx.send(state).is_err() {
            warn!("state saver is gone; snapshot not persisted");
        }
    }

    /// Flushes the pending snapshot, if any, and stops the task.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(err) = self.handle.await {
            error!("state saver task failed: {err}");
        }
    }
}

async fn run(
    port: Arc<dyn StatePort>,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<PersistedState>,
) {
    let mut pending: Option<PersistedState> = None;
    loop {
        if pending.is_none() {
            match rx.recv().await {
                Some(state) => pending = Some(state),
                None => break,
            }
            continue;
        }
        tokio::select! {
            next = rx.recv() => match next {
                Some(state) => pending = Some(state),
                None => break,
            },
            _ = tokio::time::sleep(delay) => {
                if let Some(state) = pending.take() {
                    write(port.as_ref(), &state);
                }
            }
        }
    }
    if let Some(state) = pending.take() {
        write(port.as_ref(), &state);
    }
}

fn write(port: &dyn StatePort, state: &PersistedState) {
    match save_state(port, state) {
        Ok(SaveOutcome::Saved) => {}
        Ok(SaveOutcome::PlanDropped) => warn!("storage quota reached; plan was not persisted"),
        Err(err) => error!("failed persisting state: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{load_state, MemoryStateStore};
    use crate::trips::fixtures::context;
    use crate::trips::UserContext;

    fn state(monthly: f64) -> PersistedState {
        PersistedState {
            context: context(0.0, monthly),
            ..PersistedState::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_collapse_into_one_write_of_the_latest_state() {
        let store = Arc::new(MemoryStateStore::new());
        let saver = DebouncedSaver::spawn(store.clone(), Duration::from_millis(1000));

        saver.schedule(state(1.0));
        saver.schedule(state(2.0));
        saver.schedule(state(3.0));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.put_count(), 0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(store.put_count(), 3);
        let saved = load_state(store.as_ref(), UserContext::default()).unwrap();
        assert!((saved.context.monthly_savings - 3.0).abs() < 1e-9);

        saver.shutdown().await;
        assert_eq!(store.put_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_snapshot() {
        let store = Arc::new(MemoryStateStore::new());
        let saver = DebouncedSaver::spawn(store.clone(), Duration::from_secs(60));
        saver.schedule(state(9.0));
        saver.shutdown().await;

        let saved = load_state(store.as_ref(), UserContext::default()).unwrap();
        assert!((saved.context.monthly_savings - 9.0).abs() < 1e-9);
    }
}
