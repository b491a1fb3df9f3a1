//! Per-participant chat throttle
//!
//! Every `say` frame counts against a fixed window keyed by arena and
//! participant name. Flooding a ballot number or phrase only burns the
//! sender's own budget.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Key -> (frames in window, window start)
    windows: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    max_frames: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_frames: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            max_frames,
            window,
        }
    }

    /// Build from `(max frames, window)`; None disables throttling
    pub fn from_limit(limit: Option<(u32, Duration)>) -> Option<Self> {
        limit.map(|(max_frames, window)| Self::new(max_frames, window))
    }

    fn key(arena: &str, participant: &str) -> String {
        format!("{}:{}", arena, participant)
    }

    /// Count one frame. Returns false once the participant is over the limit.
    pub async fn check(&self, arena: &str, participant: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.write().await;

        let (count, started) = windows
            .entry(Self::key(arena, participant))
            .or_insert((0, now));
        if now.duration_since(*started) >= self.window {
            *count = 0;
            *started = now;
        }
        if *count >= self.max_frames {
            return false;
        }
        *count += 1;
        true
    }

    /// Drop windows that expired a while ago
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        windows.retain(|_, (_, started)| now.duration_since(*started) < self.window * 2);
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.windows.read().await.len()
    }

    /// Periodically forget idle participants
    pub fn spawn_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval((limiter.window * 2).max(Duration::from_secs(1)));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        })
    }
}
