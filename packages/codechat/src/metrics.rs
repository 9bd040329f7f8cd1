//! Server metrics for observability
//!
//! Provides runtime metrics for monitoring the bridge and its viewers.

use chat_session::SessionState;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Server-wide metrics
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Viewer connection metrics
    /// Currently connected push sockets
    pub active_viewers: AtomicU64,
    /// Push sockets opened since server start
    pub total_viewers: AtomicU64,

    // Push metrics
    /// Events published to the push hub
    pub pushes_published: AtomicU64,
    /// Frames written to viewer sockets
    pub frames_sent: AtomicU64,
    /// Events a lagging viewer skipped
    pub frames_dropped: AtomicU64,

    // Session metrics
    /// Login challenges relayed
    pub challenges: AtomicU64,
    /// Messages observed on the session
    pub messages_observed: AtomicU64,
    /// Messages sent through the REST endpoint
    pub messages_sent: AtomicU64,

    // Error metrics
    /// Failed history or send requests
    pub request_errors: AtomicU64,
    /// Failed relay steps (chat listing, QR encoding)
    pub relay_errors: AtomicU64,
    /// Push socket errors
    pub websocket_errors: AtomicU64,

    /// Server start time (for uptime calculation)
    start_time: Option<Instant>,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    // Viewer tracking
    pub fn viewer_connected(&self) {
        self.active_viewers.fetch_add(1, Ordering::Relaxed);
        self.total_viewers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn viewer_disconnected(&self) {
        self.active_viewers.fetch_sub(1, Ordering::Relaxed);
    }

    // Push tracking
    pub fn push_published(&self) {
        self.pushes_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_dropped(&self, n: u64) {
        self.frames_dropped.fetch_add(n, Ordering::Relaxed);
    }

    // Session tracking
    pub fn challenge_relayed(&self) {
        self.challenges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_observed(&self) {
        self.messages_observed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    // Error tracking
    pub fn request_error(&self) {
        self.request_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn relay_error(&self) {
        self.relay_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn websocket_error(&self) {
        self.websocket_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    /// Create a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            viewers: ViewerMetrics {
                active: self.active_viewers.load(Ordering::Relaxed),
                total: self.total_viewers.load(Ordering::Relaxed),
            },
            pushes: PushMetrics {
                published: self.pushes_published.load(Ordering::Relaxed),
                frames_sent: self.frames_sent.load(Ordering::Relaxed),
                frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            },
            session: SessionMetrics {
                challenges: self.challenges.load(Ordering::Relaxed),
                messages_observed: self.messages_observed.load(Ordering::Relaxed),
                messages_sent: self.messages_sent.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                requests: self.request_errors.load(Ordering::Relaxed),
                relay: self.relay_errors.load(Ordering::Relaxed),
                websocket: self.websocket_errors.load(Ordering::Relaxed),
            },
        }
    }
}

/// Serializable snapshot of metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub viewers: ViewerMetrics,
    pub pushes: PushMetrics,
    pub session: SessionMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerMetrics {
    pub active: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMetrics {
    pub published: u64,
    pub frames_sent: u64,
    pub frames_dropped: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub challenges: u64,
    pub messages_observed: u64,
    pub messages_sent: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub requests: u64,
    pub relay: u64,
    pub websocket: u64,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub session: SessionState,
    pub viewers: u64,
    pub uptime_secs: u64,
}
