//! Countdown with "N seconds left" milestones
//!
//! A countdown is a precomputed list of waits. Each step sleeps for the gap
//! until the next milestone and then reports how many seconds remain; the last
//! step sleeps out the rest of the duration and completes.

use std::time::Duration;

/// Default milestone marks for a phase of `secs` seconds, ascending
pub fn default_milestones(secs: u64) -> Vec<u64> {
    let half = secs / 2;
    let mut marks = vec![1, 2, 3, half];
    if half > 15 {
        marks.push(10);
    }
    marks.sort_unstable();
    marks.dedup();
    marks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// How long to wait before this step fires
    pub wait: Duration,
    /// Seconds left when this step fires, None for completion
    pub remaining: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    total: u64,
    /// Descending, each strictly inside (0, total)
    milestones: Vec<u64>,
}

impl Countdown {
    pub fn new(total_secs: u64) -> Self {
        Self::with_milestones(total_secs, &default_milestones(total_secs))
    }

    /// Milestones outside (0, total) cannot be reached and are dropped
    pub fn with_milestones(total_secs: u64, milestones: &[u64]) -> Self {
        let mut milestones: Vec<u64> = milestones
            .iter()
            .copied()
            .filter(|&m| m > 0 && m < total_secs)
            .collect();
        milestones.sort_unstable_by(|a, b| b.cmp(a));
        milestones.dedup();
        Self {
            total: total_secs,
            milestones,
        }
    }

    pub fn total(&self) -> Duration {
        Duration::from_secs(self.total)
    }

    pub fn milestones(&self) -> &[u64] {
        &self.milestones
    }

    /// Steps in firing order: milestones highest first, then completion
    pub fn steps(&self) -> Steps<'_> {
        Steps {
            countdown: self,
            next: 0,
            remaining: self.total,
            done: false,
        }
    }
}

pub struct Steps<'a> {
    countdown: &'a Countdown,
    next: usize,
    remaining: u64,
    done: bool,
}

impl Iterator for Steps<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        if self.done {
            return None;
        }
        match self.countdown.milestones.get(self.next) {
            Some(&mark) => {
                let wait = Duration::from_secs(self.remaining - mark);
                self.remaining = mark;
                self.next += 1;
                Some(Step {
                    wait,
                    remaining: Some(mark),
                })
            }
            None => {
                self.done = true;
                Some(Step {
                    wait: Duration::from_secs(self.remaining),
                    remaining: None,
                })
            }
        }
    }
}
