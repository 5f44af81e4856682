use std::sync::atomic::{AtomicU64, Ordering};

/// Track codec metrics without external dependencies.
pub(crate) struct Metrics;

static ENCODED_MESSAGES: AtomicU64 = AtomicU64::new(0);
static ENCODED_BYTES: AtomicU64 = AtomicU64::new(0);
static DECODED_MESSAGES: AtomicU64 = AtomicU64::new(0);
static DECODED_BYTES: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static ENUM_SENTINELS: AtomicU64 = AtomicU64::new(0);

impl Metrics {
    #[inline]
    pub(crate) fn record_encoded(len: usize) {
        ENCODED_MESSAGES.fetch_add(1, Ordering::Relaxed);
        ENCODED_BYTES.fetch_add(len as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_decoded(len: usize) {
        DECODED_MESSAGES.fetch_add(1, Ordering::Relaxed);
        DECODED_BYTES.fetch_add(len as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_error() {
        ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_enum_sentinel() {
        ENUM_SENTINELS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn totals() -> MetricsSnapshot {
        MetricsSnapshot {
            encoded_messages: ENCODED_MESSAGES.load(Ordering::Relaxed),
            encoded_bytes: ENCODED_BYTES.load(Ordering::Relaxed),
            decoded_messages: DECODED_MESSAGES.load(Ordering::Relaxed),
            decoded_bytes: DECODED_BYTES.load(Ordering::Relaxed),
            total_errors: ERROR_COUNT.load(Ordering::Relaxed),
            enum_sentinels: ENUM_SENTINELS.load(Ordering::Relaxed),
        }
    }
}

/// Process-wide codec counters.
#[must_use]
pub fn metrics_snapshot() -> MetricsSnapshot {
    Metrics::totals()
}

/// Lightweight snapshot of codec counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Messages finished by an encoder
    pub encoded_messages: u64,
    /// Bytes produced by finished encoders
    pub encoded_bytes: u64,
    /// Messages finished by a decoder
    pub decoded_messages: u64,
    /// Bytes consumed by finished decoders
    pub decoded_bytes: u64,
    /// Header mismatches and failed record encodes/decodes
    pub total_errors: u64,
    /// Undeclared enum values replaced by the sentinel
    pub enum_sentinels: u64,
}

impl MetricsSnapshot {
    /// Average encoded message length in bytes.
    #[must_use]
    pub fn avg_encoded_len(&self) -> Option<u64> {
        average(self.encoded_bytes, self.encoded_messages)
    }

    /// Average decoded message length in bytes.
    #[must_use]
    pub fn avg_decoded_len(&self) -> Option<u64> {
        average(self.decoded_bytes, self.decoded_messages)
    }
}

fn average(total: u64, count: u64) -> Option<u64> {
    if count == 0 {
        return None;
    }
    Some(total / count)
}
