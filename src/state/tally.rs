use crate::types::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Ordering key for "who submitted first"
fn submitted_key(submission: &Submission) -> (u64, u64) {
    (submission.submitted_ms, submission.seq)
}

/// Compute the outcome of a voting phase
///
/// `votes` maps voter to the participant they voted for. Votes for someone
/// without a submission are ignored. Ties for most votes are ordered by who
/// submitted first, so the earliest submitter among the leaders is the winner.
pub fn tally(
    submissions: &BTreeMap<ParticipantId, Submission>,
    votes: &BTreeMap<ParticipantId, ParticipantId>,
) -> Tally {
    let mut acro_votes: BTreeMap<ParticipantId, u32> = BTreeMap::new();
    let mut voters_for: BTreeMap<&ParticipantId, Vec<ParticipantId>> = BTreeMap::new();

    for (voter, target) in votes {
        if !submissions.contains_key(target) {
            continue;
        }
        *acro_votes.entry(target.clone()).or_insert(0) += 1;
        voters_for.entry(target).or_default().push(voter.clone());
    }

    let mut non_voters = Vec::new();
    let mut fastest: Option<(&ParticipantId, &Submission)> = None;
    let mut fastest_with_vote: Option<(&ParticipantId, &Submission)> = None;

    for (id, submission) in submissions {
        if !votes.contains_key(id) {
            non_voters.push(id.clone());
        }
        if fastest.map_or(true, |(_, best)| submitted_key(submission) < submitted_key(best)) {
            fastest = Some((id, submission));
        }
        if acro_votes.contains_key(id)
            && fastest_with_vote
                .map_or(true, |(_, best)| submitted_key(submission) < submitted_key(best))
        {
            fastest_with_vote = Some((id, submission));
        }
    }

    let mut ranking: Vec<(&ParticipantId, u32)> =
        acro_votes.iter().map(|(id, count)| (id, *count)).collect();
    ranking.sort_by(|(a, a_votes), (b, b_votes)| match b_votes.cmp(a_votes) {
        Ordering::Equal => submitted_key(&submissions[*a]).cmp(&submitted_key(&submissions[*b])),
        other => other,
    });

    let winner = ranking.first().map(|(id, _)| (*id).clone());
    let tie = ranking.first().and_then(|(_, top)| {
        let leaders: Vec<ParticipantId> = ranking
            .iter()
            .take_while(|(_, count)| count == top)
            .map(|(id, _)| (*id).clone())
            .collect();
        (leaders.len() > 1).then_some(leaders)
    });

    let top_voters = winner
        .as_ref()
        .and_then(|w| voters_for.get(w).cloned())
        .unwrap_or_default();

    Tally {
        winner,
        tie,
        fastest: fastest.map(|(id, _)| id.clone()),
        fastest_with_vote: fastest_with_vote.map(|(id, _)| id.clone()),
        top_voters,
        non_voters,
        acro_votes,
        submitters: submissions.keys().cloned().collect(),
    }
}
