use crate::types::*;
use std::collections::BTreeMap;

/// Bonus constants applied on top of raw vote counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bonuses {
    pub fastest_with_vote: u32,
    /// Winner bonus, the round's acronym length
    pub winner: u32,
    pub vote_for_winner: u32,
}

/// Points earned in a standard round
///
/// Every submitter gets an entry, zero included. Voters who backed the winner
/// get an entry even without a submission. Submitters who did not vote forfeit
/// everything, whatever else they earned.
pub fn assign_points(tally: &Tally, bonuses: Bonuses) -> BTreeMap<ParticipantId, u32> {
    let mut points: BTreeMap<ParticipantId, u32> = tally
        .submitters
        .iter()
        .map(|id| (id.clone(), 0))
        .collect();

    for (id, votes) in &tally.acro_votes {
        *points.entry(id.clone()).or_insert(0) += votes;
    }

    if let Some(fastest) = &tally.fastest_with_vote {
        *points.entry(fastest.clone()).or_insert(0) += bonuses.fastest_with_vote;
    }

    if let Some(winner) = &tally.winner {
        *points.entry(winner.clone()).or_insert(0) += bonuses.winner;
    }

    for voter in &tally.top_voters {
        *points.entry(voter.clone()).or_insert(0) += bonuses.vote_for_winner;
    }

    for non_voter in &tally.non_voters {
        points.insert(non_voter.clone(), 0);
    }

    points
}

/// Add a round's points into running totals
pub fn accumulate(totals: &mut BTreeMap<ParticipantId, u32>, round: &BTreeMap<ParticipantId, u32>) {
    for (id, points) in round {
        *totals.entry(id.clone()).or_insert(0) += points;
    }
}

/// Participants ordered by score, highest first, ties by id
pub fn leaderboard(totals: &BTreeMap<ParticipantId, u32>) -> Vec<(ParticipantId, u32)> {
    let mut board: Vec<(ParticipantId, u32)> =
        totals.iter().map(|(id, points)| (id.clone(), *points)).collect();
    board.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    board
}
