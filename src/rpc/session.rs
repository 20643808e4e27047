//! Per-connection state: frame decoder plus request rate limiter.

use burster::Limiter;
use core::time::Duration;
use log::warn;

use super::codec::FrameDecoder;

/// Burst capacity of the per-connection token bucket.
pub const RATE_BURST: usize = 10;

/// One connected client.
pub struct Session {
    peer: String,
    decoder: FrameDecoder,
    rate_limiter: burster::TokenBucket<fn() -> Duration>,
    served: u64,
}

impl Session {
    pub fn new(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            decoder: FrameDecoder::new(),
            rate_limiter: burster::TokenBucket::new_with_time_provider(
                10,
                10, // 10 requests per second, 10 burst capacity
                platform_now as fn() -> Duration,
            ),
            served: 0,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn decoder(&mut self) -> &mut FrameDecoder {
        &mut self.decoder
    }

    /// Take one token.  `false` means the request must be refused.
    pub fn check_rate_limit(&mut self) -> bool {
        let ok = self.rate_limiter.try_consume(1).is_ok();
        if !ok {
            warn!("rpc[{}]: rate limit exceeded", self.peer);
        }
        ok
    }

    pub fn record_served(&mut self) {
        self.served = self.served.saturating_add(1);
    }

    pub fn served(&self) -> u64 {
        self.served
    }
}

fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}
