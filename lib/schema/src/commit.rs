//! Debounced persistence of parameter trees.
//!
//! The editor schedules the tree after every edit. A background task holds
//! only the latest scheduled state and hands it to the sink once no new state
//! has arrived for the quiet period. Superseded states are dropped, never
//! queued, and a version that was already committed is not committed again.

use crate::document::ParameterDocument;
use crate::settings::EditorSettings;
use crate::tree::ParameterTree;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, instrument};

/// A state handed to the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    /// Tree version of the committed state.
    pub version: u64,
    /// The persisted form.
    pub document: ParameterDocument,
    /// When the commit was issued.
    pub committed_at: DateTime<Utc>,
}

/// Receives committed states, typically to write them into the node's data.
#[async_trait]
pub trait CommitSink: Send + Sync + 'static {
    /// Persists one commit.
    async fn commit(&self, commit: Commit);
}

enum Message {
    Schedule { version: u64, document: ParameterDocument },
    Flush(oneshot::Sender<()>),
}

/// Coalesces rapid edits into single commits.
///
/// Dropping the debouncer without calling `shutdown` still commits the
/// pending state; the task finishes on its own once the channel closes.
pub struct CommitDebouncer {
    sender: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
}

impl CommitDebouncer {
    /// Spawns the debounce task on the current tokio runtime.
    #[must_use]
    pub fn spawn<S: CommitSink>(quiet_period: Duration, sink: S) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(quiet_period, Arc::new(sink), receiver));
        Self { sender, task }
    }

    /// Spawns the debounce task with the quiet period from `settings`.
    #[must_use]
    pub fn from_settings<S: CommitSink>(settings: &EditorSettings, sink: S) -> Self {
        Self::spawn(settings.commit_debounce(), sink)
    }

    /// Schedules the tree's current state, replacing any pending state.
    pub fn schedule(&self, tree: &ParameterTree) {
        let message = Message::Schedule {
            version: tree.version(),
            document: tree.to_document(),
        };
        if self.sender.send(message).is_err() {
            debug!("commit task has stopped, dropping scheduled state");
        }
    }

    /// Commits the pending state now, if there is one.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(Message::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Flushes and stops the task.
    pub async fn shutdown(self) {
        self.flush().await;
        drop(self.sender);
        let _ = self.task.await;
    }
}

struct Pending {
    version: u64,
    document: ParameterDocument,
    deadline: Instant,
}

async fn run<S: CommitSink>(
    quiet_period: Duration,
    sink: Arc<S>,
    mut receiver: mpsc::UnboundedReceiver<Message>,
) {
    let mut pending: Option<Pending> = None;
    let mut last_committed: Option<u64> = None;

    loop {
        let message = match pending.as_ref().map(|state| state.deadline) {
            Some(deadline) => {
                tokio::select! {
                    message = receiver.recv() => message,
                    () = sleep_until(deadline) => {
                        if let Some(state) = pending.take() {
                            commit(sink.as_ref(), state, &mut last_committed).await;
                        }
                        continue;
                    }
                }
            }
            None => receiver.recv().await,
        };

        match message {
            Some(Message::Schedule { version, document }) => {
                pending = Some(Pending {
                    version,
                    document,
                    deadline: Instant::now() + quiet_period,
                });
            }
            Some(Message::Flush(ack)) => {
                if let Some(state) = pending.take() {
                    commit(sink.as_ref(), state, &mut last_committed).await;
                }
                let _ = ack.send(());
            }
            None => {
                if let Some(state) = pending.take() {
                    commit(sink.as_ref(), state, &mut last_committed).await;
                }
                break;
            }
        }
    }
}

#[instrument(skip(sink, state, last_committed), fields(version = state.version))]
async fn commit<S: CommitSink>(sink: &S, state: Pending, last_committed: &mut Option<u64>) {
    if last_committed.is_some_and(|version| version >= state.version) {
        debug!("state already committed");
        return;
    }
    *last_committed = Some(state.version);
    sink.commit(Commit {
        version: state.version,
        document: state.document,
        committed_at: Utc::now(),
    })
    .await;
    debug!("parameters committed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PropertyPath;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        commits: Arc<Mutex<Vec<Commit>>>,
    }

    impl RecordingSink {
        fn versions(&self) -> Vec<u64> {
            self.commits
                .lock()
                .expect("lock")
                .iter()
                .map(|commit| commit.version)
                .collect()
        }
    }

    #[async_trait]
    impl CommitSink for RecordingSink {
        async fn commit(&self, commit: Commit) {
            self.commits.lock().expect("lock").push(commit);
        }
    }

    fn add(tree: &mut ParameterTree, name: &str) {
        tree.add_property(&PropertyPath::root(), Some(name))
            .expect("add");
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_produce_one_commit() {
        let sink = RecordingSink::default();
        let debouncer = CommitDebouncer::spawn(Duration::from_millis(300), sink.clone());
        let mut tree = ParameterTree::new();

        for name in ["a", "b", "c"] {
            add(&mut tree, name);
            debouncer.schedule(&tree);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(sink.versions().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(sink.versions(), vec![3]);

        let commits = sink.commits.lock().expect("lock");
        assert_eq!(
            commits[0].document.values,
            serde_json::json!({"a": "", "b": "", "c": ""})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn separated_edits_commit_separately() {
        let sink = RecordingSink::default();
        let debouncer = CommitDebouncer::spawn(Duration::from_millis(300), sink.clone());
        let mut tree = ParameterTree::new();

        add(&mut tree, "a");
        debouncer.schedule(&tree);
        tokio::time::sleep(Duration::from_millis(500)).await;
        add(&mut tree, "b");
        debouncer.schedule(&tree);
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(sink.versions(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_commits_immediately_and_once() {
        let sink = RecordingSink::default();
        let debouncer = CommitDebouncer::spawn(Duration::from_secs(60), sink.clone());
        let mut tree = ParameterTree::new();

        add(&mut tree, "a");
        debouncer.schedule(&tree);
        debouncer.flush().await;
        assert_eq!(sink.versions(), vec![1]);

        debouncer.schedule(&tree);
        debouncer.shutdown().await;
        assert_eq!(sink.versions(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_commits_pending_state() {
        let sink = RecordingSink::default();
        let debouncer = CommitDebouncer::spawn(Duration::from_secs(60), sink.clone());
        let mut tree = ParameterTree::new();

        add(&mut tree, "a");
        add(&mut tree, "b");
        debouncer.schedule(&tree);
        debouncer.shutdown().await;

        assert_eq!(sink.versions(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_debouncer_commits_pending_state() {
        let sink = RecordingSink::default();
        let debouncer = CommitDebouncer::spawn(Duration::from_secs(60), sink.clone());
        let mut tree = ParameterTree::new();

        add(&mut tree, "a");
        debouncer.schedule(&tree);
        drop(debouncer);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(sink.versions(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_period_comes_from_settings() {
        let sink = RecordingSink::default();
        let settings = EditorSettings {
            commit_debounce_ms: 1_000,
            ..EditorSettings::default()
        };
        let debouncer = CommitDebouncer::from_settings(&settings, sink.clone());
        let mut tree = ParameterTree::new();

        add(&mut tree, "a");
        debouncer.schedule(&tree);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(sink.versions().is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.versions(), vec![1]);
        debouncer.shutdown().await;
    }
}
