use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque ID types
pub type ArenaId = String;
pub type GameId = String;
pub type ParticipantId = String;

/// Phase of a single round's input collection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    CollectingSubmissions,
    CollectingVotes,
}

/// Where a game currently is, as seen from outside
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStage {
    Starting,
    Standard,
    FaceOff,
    Ended,
}

/// A participant's latest accepted phrase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
    pub phrase: String,
    /// Milliseconds since the submission phase opened
    pub submitted_ms: u64,
    /// Arrival sequence, breaks timestamp ties
    pub seq: u64,
}

/// Why a vote was turned down
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoteRejection {
    /// The ballot number points at the voter's own phrase
    #[serde(rename = "self")]
    OwnEntry,
    /// The ballot number is out of range
    Invalid,
}

/// Aggregated outcome of a voting phase. Immutable once computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tally {
    pub winner: Option<ParticipantId>,
    /// Present only when two or more entries share the top vote count
    pub tie: Option<Vec<ParticipantId>>,
    pub fastest: Option<ParticipantId>,
    pub fastest_with_vote: Option<ParticipantId>,
    /// Everyone who voted for the winner
    pub top_voters: Vec<ParticipantId>,
    /// Submitters who did not cast a vote
    pub non_voters: Vec<ParticipantId>,
    /// Votes received, for every entry with at least one vote
    pub acro_votes: BTreeMap<ParticipantId, u32>,
    pub submitters: Vec<ParticipantId>,
}

/// Serializable view of a game for clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: GameId,
    pub arena: ArenaId,
    pub stage: GameStage,
    pub round_no: u32,
    pub phase: Phase,
    pub acronym: Option<String>,
    /// 1-based ballot order of the round currently collecting votes
    pub ballot: Vec<ParticipantId>,
    pub scores: BTreeMap<ParticipantId, u32>,
}

/// Final result of a game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSummary {
    pub winner: Option<ParticipantId>,
    pub scores: BTreeMap<ParticipantId, u32>,
}
