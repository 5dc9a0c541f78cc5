//! Position sources: where fixes come from.
//!
//! A source hands out a [`FixSubscription`], a non-restartable stream of fixes
//! that ends either when the source closes or with a terminal
//! [`AcquisitionError`]. Dropping the subscription unsubscribes.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::{config::WatchOptions, errors::AcquisitionError, models::Fix};

pub type FixEvent = Result<Fix, AcquisitionError>;

#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Subscribes to a continuous stream of fixes.
    async fn watch(&self, options: &WatchOptions) -> Result<FixSubscription, AcquisitionError>;

    /// One-shot request for the current position.
    async fn current_fix(&self, options: &WatchOptions) -> Result<Fix, AcquisitionError>;
}

/// Receiving half of a watch.
#[derive(Debug)]
pub struct FixSubscription {
    rx: mpsc::Receiver<FixEvent>,
    timeout: Option<Duration>,
}

impl FixSubscription {
    pub fn new(rx: mpsc::Receiver<FixEvent>) -> Self {
        Self { rx, timeout: None }
    }

    /// Fails with [`AcquisitionError::Timeout`] when no event arrives in time.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Next event, or `None` once the source has closed.
    pub async fn next(&mut self) -> Option<FixEvent> {
        match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.rx.recv()).await {
                Ok(event) => event,
                Err(_) => Some(Err(AcquisitionError::Timeout)),
            },
            None => self.rx.recv().await,
        }
    }

    /// Stops accepting new fixes. Events already queued are still returned.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Replays a recorded list of events, then closes.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    events: Vec<FixEvent>,
}

impl ReplaySource {
    pub fn new(fixes: Vec<Fix>) -> Self {
        Self {
            events: fixes.into_iter().map(Ok).collect(),
        }
    }

    /// Appends a terminal failure after the recorded fixes.
    pub fn failing_with(mut self, error: AcquisitionError) -> Self {
        self.events.push(Err(error));
        self
    }
}

#[async_trait]
impl PositionSource for ReplaySource {
    async fn watch(&self, _options: &WatchOptions) -> Result<FixSubscription, AcquisitionError> {
        let (tx, rx) = mpsc::channel(self.events.len().max(1));
        for event in &self.events {
            tx.try_send(*event)
                .map_err(|_| AcquisitionError::PositionUnavailable)?;
        }
        Ok(FixSubscription::new(rx))
    }

    async fn current_fix(&self, _options: &WatchOptions) -> Result<Fix, AcquisitionError> {
        self.events
            .iter()
            .rev()
            .find_map(|e| e.ok())
            .ok_or(AcquisitionError::PositionUnavailable)
    }
}

/// Live source fed from another task through a [`FixSender`].
///
/// Only one watch is possible; the stream cannot be restarted.
#[derive(Debug, Clone)]
pub struct ChannelSource {
    rx: Arc<Mutex<Option<mpsc::Receiver<FixEvent>>>>,
    latest: Arc<Mutex<Option<Fix>>>,
}

/// Feeding half of a [`ChannelSource`].
#[derive(Debug, Clone)]
pub struct FixSender {
    tx: mpsc::Sender<FixEvent>,
    latest: Arc<Mutex<Option<Fix>>>,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (Self, FixSender) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let latest = Arc::new(Mutex::new(None));
        let source = Self {
            rx: Arc::new(Mutex::new(Some(rx))),
            latest: latest.clone(),
        };
        (source, FixSender { tx, latest })
    }
}

impl FixSender {
    /// Delivers a fix. Returns false once the subscriber has gone away.
    pub async fn send(&self, fix: Fix) -> bool {
        *self.latest.lock().await = Some(fix);
        self.tx.send(Ok(fix)).await.is_ok()
    }

    /// Delivers a terminal failure.
    pub async fn fail(&self, error: AcquisitionError) -> bool {
        self.tx.send(Err(error)).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl PositionSource for ChannelSource {
    async fn watch(&self, options: &WatchOptions) -> Result<FixSubscription, AcquisitionError> {
        let rx = self.rx.lock().await.take().ok_or(AcquisitionError::Closed)?;
        let subscription = FixSubscription::new(rx);
        if options.timeout_ms > 0 {
            Ok(subscription.with_timeout(Duration::from_millis(options.timeout_ms)))
        } else {
            Ok(subscription)
        }
    }

    async fn current_fix(&self, _options: &WatchOptions) -> Result<Fix, AcquisitionError> {
        self.latest
            .lock()
            .await
            .ok_or(AcquisitionError::PositionUnavailable)
    }
}
