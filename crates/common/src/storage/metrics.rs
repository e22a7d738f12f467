//! Storage metrics tracking
//!
//! Lock-free counters for connection acquisition. Read by health checks and
//! logged at pool creation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Connection pool metrics tracker
#[derive(Debug)]
pub struct StorageMetrics {
    /// Number of connections successfully acquired from the pool
    pub connections_acquired: AtomicU64,

    /// Number of connection acquisition timeouts
    pub connections_timeout: AtomicU64,

    /// Number of connection errors
    pub connections_error: AtomicU64,

    total_connection_time_ms: AtomicU64,

    max_pool_size: u32,
}

impl StorageMetrics {
    /// Create a new metrics tracker
    pub fn new(max_pool_size: u32) -> Self {
        Self {
            connections_acquired: AtomicU64::new(0),
            connections_timeout: AtomicU64::new(0),
            connections_error: AtomicU64::new(0),
            total_connection_time_ms: AtomicU64::new(0),
            max_pool_size,
        }
    }

    /// Record a successful connection acquisition
    pub fn record_connection_acquired(&self, duration_ms: u64) {
        self.connections_acquired.fetch_add(1, Ordering::Relaxed);
        self.total_connection_time_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }

    /// Record a connection timeout
    pub fn record_connection_timeout(&self) {
        self.connections_timeout.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection error
    pub fn record_connection_error(&self) {
        self.connections_error.fetch_add(1, Ordering::Relaxed);
    }

    /// Average connection acquisition time in milliseconds
    pub fn avg_connection_time_ms(&self) -> u64 {
        let total = self.total_connection_time_ms.load(Ordering::Relaxed);
        let count = self.connections_acquired.load(Ordering::Relaxed);
        if count == 0 {
            0
        } else {
            total / count
        }
    }

    /// Configured maximum pool size
    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_zero_without_acquisitions() {
        let metrics = StorageMetrics::new(4);
        assert_eq!(metrics.avg_connection_time_ms(), 0);
        assert_eq!(metrics.max_pool_size(), 4);
    }

    #[test]
    fn average_tracks_acquisitions() {
        let metrics = StorageMetrics::new(4);
        metrics.record_connection_acquired(10);
        metrics.record_connection_acquired(30);
        metrics.record_connection_error();

        assert_eq!(metrics.avg_connection_time_ms(), 20);
        assert_eq!(metrics.connections_error.load(Ordering::Relaxed), 1);
    }
}
