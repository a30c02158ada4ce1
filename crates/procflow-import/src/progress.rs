//! Progress side channel
//!
//! Import reports `completed/total` after every instantiated operator. Sinks
//! are optional and best-effort: a sink that can no longer deliver simply
//! drops the report.

use crossbeam::channel::{self, Receiver, Sender};

/// Progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Receiver of progress reports
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn report(&self, progress: Progress) {
        self(progress);
    }
}

/// Sink forwarding reports into a channel
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: Sender<Progress>,
}

impl ChannelProgress {
    /// Unbounded channel sink
    #[must_use]
    pub fn unbounded() -> (Self, Receiver<Progress>) {
        let (sender, receiver) = channel::unbounded();
        (Self { sender }, receiver)
    }

    /// Bounded channel sink; reports are dropped while the channel is full
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, Receiver<Progress>) {
        let (sender, receiver) = channel::bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, progress: Progress) {
        // Full or disconnected: the listener is gone or slow.
        let _ = self.sender.try_send(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_receiver_is_ignored() {
        let (sink, receiver) = ChannelProgress::unbounded();
        sink.report(Progress { completed: 1, total: 2 });
        assert_eq!(receiver.recv().unwrap(), Progress { completed: 1, total: 2 });
        drop(receiver);
        sink.report(Progress { completed: 2, total: 2 });
    }

    #[test]
    fn full_channel_drops_reports() {
        let (sink, receiver) = ChannelProgress::bounded(1);
        sink.report(Progress { completed: 1, total: 3 });
        sink.report(Progress { completed: 2, total: 3 });
        assert_eq!(receiver.try_iter().count(), 1);
    }
}
