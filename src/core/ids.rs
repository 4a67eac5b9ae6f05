use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Source of response and tool-call identifiers.
pub trait IdGenerator: Send + Sync {
    /// Top-level response id.
    fn response_id(&self) -> String;

    /// Tool-use block id, `call_` followed by 24 hex digits.
    fn tool_call_id(&self) -> String;
}

/// Random hex identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn response_id(&self) -> String {
        random_hex(32)
    }

    fn tool_call_id(&self) -> String {
        format!("call_{}", random_hex(24))
    }
}

/// Predictable identifiers (`resp_1`, `call_000...001`, ...), one shared
/// counter for both kinds. Intended for tests.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl IdGenerator for SequentialIds {
    fn response_id(&self) -> String {
        format!("resp_{}", self.bump())
    }

    fn tool_call_id(&self) -> String {
        format!("call_{:024x}", self.bump())
    }
}

/// Generate a random lowercase hex string of the given length
pub fn random_hex(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char)
        .collect()
}
