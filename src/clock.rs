use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Source of booking ids and confirmation codes (PNRs).
pub trait IdGenerator: Send + Sync {
    /// `prefix` followed by digits, e.g. `FL482913`.
    fn next_id(&self, prefix: &str) -> String;

    /// Upper-case alphanumeric code of `len` characters.
    fn next_code(&self, len: usize) -> String;
}

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
        format!("{prefix}{n}")
    }

    fn next_code(&self, len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
            .collect()
    }
}

/// Deterministic ids: `FL1000`, `FL1001`, ... shared across prefixes.
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}{n}")
    }

    fn next_code(&self, len: usize) -> String {
        let mut n = self.next.fetch_add(1, Ordering::Relaxed);
        let base = CODE_ALPHABET.len() as u64;
        let mut code = vec![CODE_ALPHABET[0]; len];
        for slot in code.iter_mut().rev() {
            *slot = CODE_ALPHABET[(n % base) as usize];
            n /= base;
        }
        code.into_iter().map(char::from).collect()
    }
}
