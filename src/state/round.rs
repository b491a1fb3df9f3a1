//! Phase-gated round: collect phrases, then votes, then tally
//!
//! A round is idle until its owner opens a phase. Input is only routed while a
//! phase is open; everything else is dropped without a signal. Timing lives
//! with the owner, the round only records when a phase opened so it can stamp
//! submissions.

use super::acronym::{acronym_of, Acronym};
use super::tally::tally;
use crate::types::*;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tokio::time::Instant;

/// Signals produced by a round
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum RoundEvent {
    SubmissionsOpened {
        acronym: String,
    },
    Milestone {
        phase: Phase,
        remaining: u64,
    },
    SubmissionsClosed {
        ballot: Vec<ParticipantId>,
        submissions: BTreeMap<ParticipantId, Submission>,
    },
    SubmissionAccepted {
        id: ParticipantId,
        first: bool,
    },
    SubmissionRejected {
        id: ParticipantId,
        computed: String,
    },
    VotingOpened {
        ballot: Vec<ParticipantId>,
        submissions: BTreeMap<ParticipantId, Submission>,
    },
    VoteAccepted {
        id: ParticipantId,
        first: bool,
    },
    VoteRejected {
        id: ParticipantId,
        reason: VoteRejection,
    },
    VotingClosed {
        tally: Tally,
    },
}

#[derive(Debug, Clone)]
pub struct Round {
    letters: usize,
    acronym: Option<Acronym>,
    phase: Phase,
    opened_at: Option<Instant>,
    submissions: BTreeMap<ParticipantId, Submission>,
    votes: BTreeMap<ParticipantId, ParticipantId>,
    ballot: Vec<ParticipantId>,
    tally: Option<Tally>,
    next_seq: u64,
    /// When set, only these may submit and none of them may vote
    contestants: Option<BTreeSet<ParticipantId>>,
}

impl Round {
    /// Open round: anyone may submit and vote
    pub fn new(letters: usize) -> Self {
        Self {
            letters,
            acronym: None,
            phase: Phase::Idle,
            opened_at: None,
            submissions: BTreeMap::new(),
            votes: BTreeMap::new(),
            ballot: Vec::new(),
            tally: None,
            next_seq: 0,
            contestants: None,
        }
    }

    /// Closed round: only `contestants` submit, everyone else votes
    pub fn contest(letters: usize, contestants: impl IntoIterator<Item = ParticipantId>) -> Self {
        Self {
            contestants: Some(contestants.into_iter().collect()),
            ..Self::new(letters)
        }
    }

    /// Round with a fixed acronym
    pub fn with_acronym(acronym: Acronym) -> Self {
        Self {
            letters: acronym.len(),
            acronym: Some(acronym),
            ..Self::new(0)
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn letters(&self) -> usize {
        self.letters
    }

    pub fn acronym(&self) -> Option<&Acronym> {
        self.acronym.as_ref()
    }

    pub fn submissions(&self) -> &BTreeMap<ParticipantId, Submission> {
        &self.submissions
    }

    /// 1-based voting order, fixed when submissions close
    pub fn ballot(&self) -> &[ParticipantId] {
        &self.ballot
    }

    pub fn tally(&self) -> Option<&Tally> {
        self.tally.as_ref()
    }

    pub fn is_contestant(&self, id: &str) -> bool {
        self.contestants
            .as_ref()
            .is_some_and(|contestants| contestants.contains(id))
    }

    /// Open the submission phase. The acronym is drawn once per round.
    pub fn start_submissions<R: Rng + ?Sized>(
        &mut self,
        pool: &str,
        now: Instant,
        rng: &mut R,
    ) -> Result<RoundEvent, String> {
        if self.phase != Phase::Idle {
            return Err(format!("Cannot open submissions while {:?}", self.phase));
        }
        let letters = self.letters;
        let acronym = self
            .acronym
            .get_or_insert_with(|| Acronym::generate(pool, letters, rng))
            .clone();

        self.phase = Phase::CollectingSubmissions;
        self.opened_at = Some(now);
        tracing::debug!(acronym = %acronym, "Submissions opened");

        Ok(RoundEvent::SubmissionsOpened {
            acronym: acronym.to_string(),
        })
    }

    /// Close submissions and shuffle the submitters into the ballot order
    pub fn close_submissions<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<RoundEvent> {
        if self.phase != Phase::CollectingSubmissions {
            return None;
        }
        let mut ballot: Vec<ParticipantId> = self.submissions.keys().cloned().collect();
        ballot.shuffle(rng);

        self.ballot = ballot;
        self.phase = Phase::Idle;
        tracing::debug!(submitted = self.ballot.len(), "Submissions closed");

        Some(RoundEvent::SubmissionsClosed {
            ballot: self.ballot.clone(),
            submissions: self.submissions.clone(),
        })
    }

    pub fn start_voting(&mut self) -> Result<RoundEvent, String> {
        if self.phase != Phase::Idle {
            return Err(format!("Cannot open voting while {:?}", self.phase));
        }
        self.phase = Phase::CollectingVotes;

        Ok(RoundEvent::VotingOpened {
            ballot: self.ballot.clone(),
            submissions: self.submissions.clone(),
        })
    }

    /// Close voting and compute the tally. No vote is accepted after this.
    pub fn close_voting(&mut self) -> Option<RoundEvent> {
        if self.phase != Phase::CollectingVotes {
            return None;
        }
        self.phase = Phase::Idle;
        let result = tally(&self.submissions, &self.votes);
        self.tally = Some(result.clone());

        Some(RoundEvent::VotingClosed { tally: result })
    }

    /// Milestone for `phase`, or nothing if that phase is no longer open
    pub fn milestone(&self, phase: Phase, remaining: u64) -> Option<RoundEvent> {
        (self.phase == phase && phase != Phase::Idle)
            .then_some(RoundEvent::Milestone { phase, remaining })
    }

    /// Route raw text according to the open phase
    pub fn handle_input(&mut self, id: &str, text: &str, now: Instant) -> Option<RoundEvent> {
        match self.phase {
            Phase::Idle => None,
            Phase::CollectingSubmissions => self.handle_submission(id, text, now),
            Phase::CollectingVotes => self.handle_vote(id, text),
        }
    }

    fn handle_submission(&mut self, id: &str, text: &str, now: Instant) -> Option<RoundEvent> {
        if self.contestants.is_some() && !self.is_contestant(id) {
            return None;
        }
        let acronym = self.acronym.as_ref()?;

        if !acronym.matches(text) {
            return Some(RoundEvent::SubmissionRejected {
                id: id.to_string(),
                computed: acronym_of(text),
            });
        }

        let submitted_ms = self
            .opened_at
            .map(|opened| {
                u64::try_from(now.saturating_duration_since(opened).as_millis()).unwrap_or(u64::MAX)
            })
            .unwrap_or(0);
        let seq = self.next_seq;
        self.next_seq += 1;

        let first = self
            .submissions
            .insert(
                id.to_string(),
                Submission {
                    phrase: text.trim().to_string(),
                    submitted_ms,
                    seq,
                },
            )
            .is_none();

        Some(RoundEvent::SubmissionAccepted {
            id: id.to_string(),
            first,
        })
    }

    fn handle_vote(&mut self, id: &str, text: &str) -> Option<RoundEvent> {
        if self.is_contestant(id) {
            return None;
        }
        // Chatter during voting is not a ballot
        let choice = ballot_choice(text)?;

        let Some(target) = choice
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.ballot.get(i))
        else {
            return Some(RoundEvent::VoteRejected {
                id: id.to_string(),
                reason: VoteRejection::Invalid,
            });
        };
        if target == id {
            return Some(RoundEvent::VoteRejected {
                id: id.to_string(),
                reason: VoteRejection::OwnEntry,
            });
        }

        let first = self
            .votes
            .insert(id.to_string(), target.clone())
            .is_none();

        Some(RoundEvent::VoteAccepted {
            id: id.to_string(),
            first,
        })
    }
}

/// Numeric vote text. `None` for chatter; `Some(None)` for a number that
/// cannot be a ballot position (signed or too large).
fn ballot_choice(text: &str) -> Option<Option<usize>> {
    let text = text.trim();
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() != text.len() {
        return Some(None);
    }
    Some(digits.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    /// Round for "BAD" with submissions already collected and closed
    fn round_with_ballot(entries: &[(&str, &str)]) -> (Round, Instant) {
        let mut round = Round::with_acronym(Acronym::from("BAD"));
        let start = Instant::now();
        round.start_submissions("", start, &mut rng()).unwrap();
        for (i, (id, phrase)) in entries.iter().enumerate() {
            round.handle_input(id, phrase, start + Duration::from_millis(i as u64 * 100));
        }
        round.close_submissions(&mut rng()).unwrap();
        round.start_voting().unwrap();
        (round, start)
    }

    fn ballot_number(round: &Round, id: &str) -> String {
        let index = round.ballot().iter().position(|p| p == id).unwrap();
        (index + 1).to_string()
    }

    #[test]
    fn test_round_lifecycle() {
        let mut round = Round::new(4);
        let now = Instant::now();
        assert_eq!(round.phase(), Phase::Idle);

        let opened = round.start_submissions("ABC", now, &mut rng()).unwrap();
        let RoundEvent::SubmissionsOpened { acronym } = opened else {
            panic!("Expected SubmissionsOpened");
        };
        assert_eq!(acronym.len(), 4);
        assert_eq!(round.phase(), Phase::CollectingSubmissions);

        assert!(round.start_voting().is_err());
        assert!(round.close_voting().is_none());

        assert!(round.close_submissions(&mut rng()).is_some());
        assert_eq!(round.phase(), Phase::Idle);
        assert!(round.close_submissions(&mut rng()).is_none());

        round.start_voting().unwrap();
        assert_eq!(round.phase(), Phase::CollectingVotes);

        let closed = round.close_voting();
        assert!(matches!(closed, Some(RoundEvent::VotingClosed { .. })));
        assert_eq!(round.phase(), Phase::Idle);
        assert!(round.tally().is_some());
    }

    #[test]
    fn test_acronym_is_drawn_once() {
        let mut round = Round::new(5);
        let now = Instant::now();
        round.start_submissions("ABCDEFGH", now, &mut rng()).unwrap();
        let first = round.acronym().cloned();
        round.close_submissions(&mut rng());

        round
            .start_submissions("ABCDEFGH", now, &mut StdRng::seed_from_u64(99))
            .unwrap();
        assert_eq!(round.acronym().cloned(), first);
    }

    #[test]
    fn test_submission_accept_reject_and_resubmit() {
        let mut round = Round::with_acronym(Acronym::from("BAD"));
        let start = Instant::now();
        round.start_submissions("", start, &mut rng()).unwrap();

        let rejected = round.handle_input("alice", "big old dog", start);
        assert_eq!(
            rejected,
            Some(RoundEvent::SubmissionRejected {
                id: "alice".to_string(),
                computed: "BOD".to_string(),
            })
        );

        let accepted = round.handle_input("alice", "big angry dog", start + Duration::from_millis(250));
        assert_eq!(
            accepted,
            Some(RoundEvent::SubmissionAccepted {
                id: "alice".to_string(),
                first: true,
            })
        );
        assert_eq!(round.submissions()["alice"].submitted_ms, 250);

        let resubmitted = round.handle_input("alice", "bring a dragon", start + Duration::from_secs(2));
        assert_eq!(
            resubmitted,
            Some(RoundEvent::SubmissionAccepted {
                id: "alice".to_string(),
                first: false,
            })
        );
        assert_eq!(round.submissions().len(), 1);
        assert_eq!(round.submissions()["alice"].phrase, "bring a dragon");
        assert_eq!(round.submissions()["alice"].submitted_ms, 2000);
    }

    #[test]
    fn test_input_outside_phase_is_ignored() {
        let mut round = Round::with_acronym(Acronym::from("BAD"));
        let now = Instant::now();
        assert_eq!(round.handle_input("alice", "big angry dog", now), None);

        round.start_submissions("", now, &mut rng()).unwrap();
        round.handle_input("alice", "big angry dog", now);
        round.close_submissions(&mut rng());

        assert_eq!(round.handle_input("bob", "bad apple dance", now), None);
        assert_eq!(round.handle_input("bob", "1", now), None);
        assert_eq!(round.submissions().len(), 1);
    }

    #[test]
    fn test_ballot_is_permutation_of_submitters() {
        let (round, _) = round_with_ballot(&[
            ("alice", "big angry dog"),
            ("bob", "bad apple dance"),
            ("carol", "be a dear"),
        ]);

        let mut ballot = round.ballot().to_vec();
        ballot.sort();
        assert_eq!(ballot, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_single_submitter_still_closes() {
        let mut round = Round::with_acronym(Acronym::from("BAD"));
        let now = Instant::now();
        round.start_submissions("", now, &mut rng()).unwrap();
        round.handle_input("alice", "big angry dog", now);

        let closed = round.close_submissions(&mut rng());
        let Some(RoundEvent::SubmissionsClosed { ballot, .. }) = closed else {
            panic!("Expected SubmissionsClosed");
        };
        assert_eq!(ballot, vec!["alice".to_string()]);
    }

    #[test]
    fn test_vote_validation() {
        let (mut round, now) = round_with_ballot(&[("alice", "big angry dog"), ("bob", "bad apple dance")]);

        assert_eq!(
            round.handle_input("carol", "0", now),
            Some(RoundEvent::VoteRejected {
                id: "carol".to_string(),
                reason: VoteRejection::Invalid,
            })
        );
        assert_eq!(
            round.handle_input("carol", "3", now),
            Some(RoundEvent::VoteRejected {
                id: "carol".to_string(),
                reason: VoteRejection::Invalid,
            })
        );
        assert_eq!(round.handle_input("carol", "lol nice", now), None);

        let own = ballot_number(&round, "alice");
        assert_eq!(
            round.handle_input("alice", &own, now),
            Some(RoundEvent::VoteRejected {
                id: "alice".to_string(),
                reason: VoteRejection::OwnEntry,
            })
        );

        let bob = ballot_number(&round, "bob");
        assert_eq!(
            round.handle_input("alice", &bob, now),
            Some(RoundEvent::VoteAccepted {
                id: "alice".to_string(),
                first: true,
            })
        );
        assert_eq!(
            round.handle_input("carol", &format!(" {} ", bob), now),
            Some(RoundEvent::VoteAccepted {
                id: "carol".to_string(),
                first: true,
            })
        );

        let alice = ballot_number(&round, "alice");
        assert_eq!(
            round.handle_input("carol", &alice, now),
            Some(RoundEvent::VoteAccepted {
                id: "carol".to_string(),
                first: false,
            })
        );

        round.close_voting();
        let tally = round.tally().unwrap();
        assert_eq!(tally.acro_votes.get("bob"), Some(&1));
        assert_eq!(tally.acro_votes.get("alice"), Some(&1));
        assert_eq!(tally.non_voters, vec!["bob".to_string()]);
        // Earliest submitter wins the tie
        assert_eq!(tally.winner.as_deref(), Some("alice"));
    }

    #[test]
    fn test_signed_and_oversized_numbers_are_invalid() {
        let (mut round, now) = round_with_ballot(&[("alice", "big angry dog"), ("bob", "bad apple dance")]);
        let invalid = Some(RoundEvent::VoteRejected {
            id: "carol".to_string(),
            reason: VoteRejection::Invalid,
        });

        assert_eq!(round.handle_input("carol", "99999999999999999999999", now), invalid);
        assert_eq!(round.handle_input("carol", "-1", now), invalid);
        assert_eq!(round.handle_input("carol", "+1", now), invalid);
        assert_eq!(round.handle_input("carol", "-", now), None);
        assert_eq!(round.handle_input("carol", "1st", now), None);

        round.close_voting();
        assert!(round.tally().unwrap().acro_votes.is_empty());
    }

    #[test]
    fn test_no_votes_after_close() {
        let (mut round, now) = round_with_ballot(&[("alice", "big angry dog"), ("bob", "bad apple dance")]);
        round.close_voting();

        let bob = ballot_number(&round, "bob");
        assert_eq!(round.handle_input("carol", &bob, now), None);
        assert!(round.tally().unwrap().acro_votes.is_empty());
    }

    #[test]
    fn test_contest_round_restrictions() {
        let mut round = Round::contest(3, ["alice".to_string(), "bob".to_string()]);
        let now = Instant::now();
        round.start_submissions("B", now, &mut rng()).unwrap();

        assert_eq!(round.handle_input("carol", "big bad bear", now), None);
        assert!(round.handle_input("alice", "big bad bear", now).is_some());
        assert!(round.handle_input("bob", "bring better beer", now).is_some());
        round.close_submissions(&mut rng());
        round.start_voting().unwrap();

        assert_eq!(round.handle_input("alice", "1", now), None);
        assert!(matches!(
            round.handle_input("carol", "1", now),
            Some(RoundEvent::VoteAccepted { .. })
        ));
    }

    #[test]
    fn test_milestone_is_dropped_after_phase_change() {
        let mut round = Round::with_acronym(Acronym::from("BAD"));
        let now = Instant::now();
        round.start_submissions("", now, &mut rng()).unwrap();

        assert_eq!(
            round.milestone(Phase::CollectingSubmissions, 10),
            Some(RoundEvent::Milestone {
                phase: Phase::CollectingSubmissions,
                remaining: 10,
            })
        );

        round.close_submissions(&mut rng());
        assert_eq!(round.milestone(Phase::CollectingSubmissions, 3), None);
        assert_eq!(round.milestone(Phase::Idle, 3), None);
    }
}
