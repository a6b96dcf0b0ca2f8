use std::sync::atomic::{AtomicUsize, Ordering};

/// Browser-like user agents sent on outbound calls
pub const DEFAULT_IDENTITIES: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

/// Round-robin over a fixed pool of client identities
#[derive(Debug)]
pub struct IdentityRotator {
    pool: Vec<String>,
    cursor: AtomicUsize,
}

impl IdentityRotator {
    /// Rotator over `pool`. An empty pool yields no identity at all.
    pub fn new<S: Into<String>>(pool: impl IntoIterator<Item = S>) -> Self {
        Self {
            pool: pool.into_iter().map(Into::into).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next identity in the pool, wrapping at the end
    pub fn next(&self) -> Option<&str> {
        if self.pool.is_empty() {
            return None;
        }
        let len = self.pool.len();
        let idx = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or_default();
        self.pool.get(idx).map(String::as_str)
    }

    /// Number of identities in the pool
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

impl Default for IdentityRotator {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTITIES)
    }
}
