//! Standard library host.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use super::{ActionHost, FrameRef, SendVarsMethod};
use crate::value::ObjectId;

/// Host for command line use: `trace` goes to stdout, timers use the
/// monotonic clock, randomness comes from a time-seeded xorshift64.
/// Navigation and network actions are logged and otherwise ignored.
pub struct StdActionHost {
    epoch: Instant,
    state: u64,
}

impl StdActionHost {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x12345678_9abcdef0);
        Self::with_seed(seed)
    }

    /// Deterministic random sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            epoch: Instant::now(),
            state: if seed == 0 { 0x12345678_9abcdef0 } else { seed },
        }
    }
}

impl Default for StdActionHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionHost for StdActionHost {
    fn goto_frame(&mut self, clip: ObjectId, frame: FrameRef, play: bool) {
        log::debug!("goto {:?} on {:?} (play: {})", frame, clip, play);
    }

    fn get_url(&mut self, url: &str, target: &str, method: SendVarsMethod) {
        log::info!("getURL {} -> {} ({:?})", url, target, method);
    }

    fn load_movie(&mut self, url: &str, target: &str, method: SendVarsMethod) {
        log::info!("loadMovie {} -> {} ({:?})", url, target, method);
    }

    fn load_variables(&mut self, url: &str, target: &str, method: SendVarsMethod) {
        log::info!("loadVariables {} -> {} ({:?})", url, target, method);
    }

    fn fscommand(&mut self, command: &str, args: &str) {
        log::info!("fscommand {} {}", command, args);
    }

    fn get_timer(&mut self) -> f64 {
        self.epoch.elapsed().as_millis() as f64
    }

    fn random(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        // upper 53 bits
        ((x >> 11) as f64) / ((1u64 << 53) as f64)
    }

    fn trace(&mut self, message: &str) {
        println!("{message}");
    }
}
