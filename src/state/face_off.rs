//! Face-off between the two leaders
//!
//! A face-off is a fixed number of contest rounds. Submission phases run one
//! after another; each finished round waits in a FIFO for the single voting
//! slot so a ballot number is never ambiguous about which round it targets.
//! Cumulative scores decide the match, then the count of rounds answered
//! fastest, and beyond that the match is a tie.

use super::round::{Round, RoundEvent};
use super::score::accumulate;
use super::tally::tally;
use crate::types::*;
use rand::Rng;
use std::collections::{BTreeMap, VecDeque};
use tokio::time::Instant;

/// Single-slot work queue for voting phases
#[derive(Debug, Clone, Default)]
pub struct VoteQueue {
    pending: VecDeque<usize>,
    active: Option<usize>,
}

impl VoteQueue {
    /// Queue a round. Returns it back if the slot was free and it now holds it.
    pub fn enqueue(&mut self, round: usize) -> Option<usize> {
        if self.active.is_none() {
            self.active = Some(round);
            Some(round)
        } else {
            self.pending.push_back(round);
            None
        }
    }

    /// Release the slot and hand it to the next waiting round, if any
    pub fn finish(&mut self) -> Option<usize> {
        self.active = self.pending.pop_front();
        self.active
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// What one face-off round contributed to the match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceOffOutcome {
    pub round: usize,
    pub points: BTreeMap<ParticipantId, u32>,
    pub fastest: Option<ParticipantId>,
    /// Submitters in the round (0, 1 or 2)
    pub submitted: usize,
}

#[derive(Debug, Clone)]
pub struct FaceOff {
    contestants: [ParticipantId; 2],
    rounds: Vec<Round>,
    submitting: Option<usize>,
    queue: VoteQueue,
    scores: BTreeMap<ParticipantId, u32>,
    fastest_counts: BTreeMap<ParticipantId, u32>,
    completed: usize,
}

impl FaceOff {
    /// Round `i` uses `min_letters + i` letters
    pub fn new(contestants: [ParticipantId; 2], min_letters: usize, rounds: usize) -> Self {
        let rounds = (0..rounds)
            .map(|i| Round::contest(min_letters + i, contestants.iter().cloned()))
            .collect();
        let zeroes: BTreeMap<ParticipantId, u32> =
            contestants.iter().map(|id| (id.clone(), 0)).collect();
        Self {
            scores: zeroes.clone(),
            fastest_counts: zeroes,
            contestants,
            rounds,
            submitting: None,
            queue: VoteQueue::default(),
            completed: 0,
        }
    }

    pub fn contestants(&self) -> &[ParticipantId; 2] {
        &self.contestants
    }

    pub fn round(&self, index: usize) -> Option<&Round> {
        self.rounds.get(index)
    }

    pub fn round_mut(&mut self, index: usize) -> Option<&mut Round> {
        self.rounds.get_mut(index)
    }

    pub fn submitting(&self) -> Option<usize> {
        self.submitting
    }

    /// Round currently holding the voting slot
    pub fn voting(&self) -> Option<usize> {
        self.queue.active()
    }

    pub fn scores(&self) -> &BTreeMap<ParticipantId, u32> {
        &self.scores
    }

    pub fn fastest_counts(&self) -> &BTreeMap<ParticipantId, u32> {
        &self.fastest_counts
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.rounds.len()
    }

    pub fn open_submissions<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        pool: &str,
        now: Instant,
        rng: &mut R,
    ) -> Result<RoundEvent, String> {
        if let Some(open) = self.submitting {
            return Err(format!("Face-off round {} is still collecting", open + 1));
        }
        let round = self
            .rounds
            .get_mut(index)
            .ok_or_else(|| format!("No face-off round {}", index + 1))?;
        let event = round.start_submissions(pool, now, rng)?;
        self.submitting = Some(index);
        Ok(event)
    }

    pub fn close_submissions<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        rng: &mut R,
    ) -> Option<RoundEvent> {
        let event = self.rounds.get_mut(index)?.close_submissions(rng)?;
        if self.submitting == Some(index) {
            self.submitting = None;
        }
        Some(event)
    }

    /// Queue a closed round for voting; returns the round that takes the slot now
    pub fn enqueue_vote(&mut self, index: usize) -> Option<usize> {
        self.queue.enqueue(index)
    }

    /// Free the voting slot; returns the next round to run
    ///
    /// A round counts as concluded once it gives up the slot, so the match is
    /// only complete after the last round's results are out.
    pub fn finish_vote(&mut self) -> Option<usize> {
        if self.queue.active().is_some() {
            self.completed += 1;
        }
        self.queue.finish()
    }

    /// Whether a round has enough entries to be voted on
    pub fn needs_vote(&self, index: usize) -> bool {
        self.rounds
            .get(index)
            .is_some_and(|round| round.submissions().len() >= 2)
    }

    /// Contestants type into the round collecting submissions, everyone else
    /// into the round holding the voting slot
    pub fn route_input(
        &mut self,
        id: &str,
        text: &str,
        now: Instant,
    ) -> Option<(usize, RoundEvent)> {
        let target = if self.contestants.iter().any(|c| c == id) {
            self.submitting?
        } else {
            self.queue.active()?
        };
        let event = self.rounds.get_mut(target)?.handle_input(id, text, now)?;
        Some((target, event))
    }

    /// Score a finished round into the match totals
    ///
    /// No entries pays nothing. A lone entry is awarded the acronym length.
    /// Two entries earn their vote counts.
    pub fn settle(&mut self, index: usize) -> Option<FaceOffOutcome> {
        let round = self.rounds.get(index)?;
        let submitted = round.submissions().len();

        let (points, fastest): (BTreeMap<ParticipantId, u32>, Option<ParticipantId>) = match submitted {
            0 => (BTreeMap::new(), None),
            1 => {
                let (id, _) = round.submissions().iter().next()?;
                let bonus = round.letters() as u32;
                ([(id.clone(), bonus)].into(), Some(id.clone()))
            }
            _ => {
                let result = round
                    .tally()
                    .cloned()
                    .unwrap_or_else(|| tally(round.submissions(), &BTreeMap::new()));
                let points = self
                    .contestants
                    .iter()
                    .map(|c| (c.clone(), result.acro_votes.get(c).copied().unwrap_or(0)))
                    .collect();
                (points, result.fastest)
            }
        };

        accumulate(&mut self.scores, &points);
        if let Some(id) = &fastest {
            *self.fastest_counts.entry(id.clone()).or_insert(0) += 1;
        }

        Some(FaceOffOutcome {
            round: index,
            points,
            fastest,
            submitted,
        })
    }

    /// Winner of the match so far, None for an unbreakable tie
    pub fn resolve(&self) -> Option<ParticipantId> {
        resolve(&self.contestants, &self.scores, &self.fastest_counts)
    }
}

/// Higher score wins; equal scores fall back to rounds answered fastest
pub fn resolve(
    contestants: &[ParticipantId; 2],
    scores: &BTreeMap<ParticipantId, u32>,
    fastest_counts: &BTreeMap<ParticipantId, u32>,
) -> Option<ParticipantId> {
    let [a, b] = contestants;
    let get = |map: &BTreeMap<ParticipantId, u32>, id: &ParticipantId| {
        map.get(id).copied().unwrap_or(0)
    };

    let by_score = get(scores, a).cmp(&get(scores, b));
    let by_speed = get(fastest_counts, a).cmp(&get(fastest_counts, b));
    match by_score.then(by_speed) {
        std::cmp::Ordering::Greater => Some(a.clone()),
        std::cmp::Ordering::Less => Some(b.clone()),
        std::cmp::Ordering::Equal => None,
    }
}
