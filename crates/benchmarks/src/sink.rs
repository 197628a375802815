//! Event sinks.
//!
//! The orchestrator emits every [`BenchmarkEvent`] through an [`EventSink`]
//! and awaits each emission before moving on. Batch callers discard or
//! collect events; streaming callers forward them over a bounded channel,
//! which gives backpressure for free.

use crate::event::BenchmarkEvent;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// The consumer of a sink went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Destination of run events.
#[async_trait]
pub trait EventSink: Send {
    /// Deliver one event. Returns [`SinkClosed`] once the consumer is gone.
    async fn emit(&mut self, event: BenchmarkEvent) -> Result<(), SinkClosed>;
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn emit(&mut self, _event: BenchmarkEvent) -> Result<(), SinkClosed> {
        Ok(())
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    events: Vec<BenchmarkEvent>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    pub fn events(&self) -> &[BenchmarkEvent] {
        &self.events
    }

    /// Consume the sink and return its events.
    pub fn into_events(self) -> Vec<BenchmarkEvent> {
        self.events
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn emit(&mut self, event: BenchmarkEvent) -> Result<(), SinkClosed> {
        self.events.push(event);
        Ok(())
    }
}

/// Sink forwarding events over a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<BenchmarkEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving half of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<BenchmarkEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Whether the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, event: BenchmarkEvent) -> Result<(), SinkClosed> {
        self.tx.send(event).await.map_err(|_| SinkClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collecting_sink_keeps_order() {
        let mut sink = CollectingSink::new();
        sink.emit(BenchmarkEvent::progress(1, 2)).await.unwrap();
        sink.emit(BenchmarkEvent::progress(2, 2)).await.unwrap();
        assert_eq!(
            sink.into_events(),
            vec![BenchmarkEvent::progress(1, 2), BenchmarkEvent::progress(2, 2)]
        );
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closed_receiver() {
        let (mut sink, mut rx) = ChannelSink::channel(4);
        sink.emit(BenchmarkEvent::progress(1, 2)).await.unwrap();
        assert_eq!(rx.recv().await, Some(BenchmarkEvent::progress(1, 2)));

        drop(rx);
        assert!(sink.is_closed());
        assert_eq!(sink.emit(BenchmarkEvent::progress(2, 2)).await, Err(SinkClosed));
    }
}
