//! Chat text for round events and results

use super::face_off::FaceOffOutcome;
use super::round::RoundEvent;
use super::score::leaderboard;
use crate::error::GameError;
use crate::types::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Public(String),
    Private(ParticipantId, String),
}

fn count(n: u32, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

fn plural(n: u32, word: &str) -> String {
    count(n, word, &format!("{}s", word))
}

pub fn round_event(event: &RoundEvent, label: &str) -> Vec<Line> {
    match event {
        RoundEvent::SubmissionsOpened { acronym } => vec![Line::Public(format!(
            "{}The acronym is {}. Send a phrase whose words start with those letters!",
            label, acronym
        ))],
        RoundEvent::Milestone { phase, remaining } => {
            let action = match phase {
                Phase::CollectingVotes => "vote",
                _ => "submit",
            };
            vec![Line::Public(format!(
                "{}{} left to {}",
                label,
                plural(u32::try_from(*remaining).unwrap_or(u32::MAX), "second"),
                action
            ))]
        }
        RoundEvent::SubmissionsClosed { ballot, .. } => vec![Line::Public(format!(
            "{}Time's up! {} in.",
            label,
            count(ballot.len() as u32, "entry", "entries")
        ))],
        RoundEvent::SubmissionAccepted { id, first } => {
            let text = if *first {
                "Your entry is in."
            } else {
                "Your entry has been replaced."
            };
            vec![Line::Private(id.clone(), text.to_string())]
        }
        RoundEvent::SubmissionRejected { id, computed } => vec![Line::Private(
            id.clone(),
            format!("That spells '{}', which doesn't match.", computed),
        )],
        RoundEvent::VotingOpened {
            ballot,
            submissions,
        } => {
            let mut lines = vec![Line::Public(format!(
                "{}Vote for your favourite by sending its number:",
                label
            ))];
            lines.extend(ballot.iter().enumerate().filter_map(|(i, id)| {
                submissions
                    .get(id)
                    .map(|s| Line::Public(format!("{}. {}", i + 1, s.phrase)))
            }));
            lines
        }
        RoundEvent::VoteAccepted { id, first } => {
            let text = if *first {
                "Vote counted."
            } else {
                "Vote changed."
            };
            vec![Line::Private(id.clone(), text.to_string())]
        }
        RoundEvent::VoteRejected { id, reason } => {
            let text = match reason {
                VoteRejection::OwnEntry => "You can't vote for your own entry.",
                VoteRejection::Invalid => "There's no entry with that number.",
            };
            vec![Line::Private(id.clone(), text.to_string())]
        }
        RoundEvent::VotingClosed { tally } => vec![Line::Public(format!(
            "{}Voting is closed, {} cast.",
            label,
            plural(tally.acro_votes.values().sum(), "vote")
        ))],
    }
}

/// Result lines for a standard round, most votes first
pub fn standard_results(
    tally: &Tally,
    submissions: &BTreeMap<ParticipantId, Submission>,
    points: &BTreeMap<ParticipantId, u32>,
    label: &str,
) -> Vec<String> {
    let mut entries: Vec<(&ParticipantId, &Submission)> = submissions.iter().collect();
    entries.sort_by_key(|(id, s)| {
        (
            std::cmp::Reverse(tally.acro_votes.get(*id).copied().unwrap_or(0)),
            s.submitted_ms,
            s.seq,
        )
    });

    let mut lines = vec![format!("{}Results:", label)];
    for (id, submission) in entries {
        let votes = tally.acro_votes.get(id).copied().unwrap_or(0);
        let mut line = format!(
            "{}: \"{}\" ({}, +{})",
            id,
            submission.phrase,
            plural(votes, "vote"),
            points.get(id).copied().unwrap_or(0)
        );
        if tally.non_voters.contains(id) {
            line.push_str(" forfeited for not voting");
        }
        lines.push(line);
    }

    if let Some(winner) = &tally.winner {
        match &tally.tie {
            Some(tie) => lines.push(format!(
                "{} tied at the top; {} wins by submitting first.",
                tie.join(", "),
                winner
            )),
            None => lines.push(format!("{} wins the round!", winner)),
        }
    }
    if let Some(fastest) = &tally.fastest_with_vote {
        lines.push(format!("Fastest answer with a vote: {}", fastest));
    }
    if !tally.top_voters.is_empty() {
        lines.push(format!("Voted for the winner: {}", tally.top_voters.join(", ")));
    }
    lines
}

pub fn scoreboard(totals: &BTreeMap<ParticipantId, u32>) -> String {
    let entries: Vec<String> = leaderboard(totals)
        .into_iter()
        .map(|(id, points)| format!("{} {}", id, points))
        .collect();
    if entries.is_empty() {
        "Scores: nobody has scored yet".to_string()
    } else {
        format!("Scores: {}", entries.join(" | "))
    }
}

pub fn failed_round(error: &GameError, label: &str) -> String {
    match error {
        GameError::InsufficientSubmissions { .. } => {
            format!("{}Not enough entries this round, need at least two.", label)
        }
        GameError::NoVotesCast => format!("{}Nobody voted, no points this round.", label),
        other => format!("{}{}", label, other),
    }
}

pub fn face_off_intro(contestants: &[ParticipantId; 2], rounds: usize) -> String {
    format!(
        "Face-off! {} vs {} over {} rounds. Only they submit, everyone else votes.",
        contestants[0], contestants[1], rounds
    )
}

pub fn face_off_results(
    outcome: &FaceOffOutcome,
    submissions: &BTreeMap<ParticipantId, Submission>,
    match_scores: &BTreeMap<ParticipantId, u32>,
    label: &str,
) -> Vec<String> {
    let mut lines = Vec::new();
    match outcome.submitted {
        0 => lines.push(format!("{}Nobody answered this round.", label)),
        1 => {
            if let Some(id) = &outcome.fastest {
                lines.push(format!(
                    "{}Only {} answered and takes {} points.",
                    label,
                    id,
                    outcome.points.get(id).copied().unwrap_or(0)
                ));
            }
        }
        _ => {
            lines.push(format!("{}Results:", label));
            for (id, points) in &outcome.points {
                let phrase = submissions.get(id).map(|s| s.phrase.as_str()).unwrap_or("");
                lines.push(format!("{}: \"{}\" ({})", id, phrase, plural(*points, "vote")));
            }
            if let Some(fastest) = &outcome.fastest {
                lines.push(format!("Fastest: {}", fastest));
            }
        }
    }
    lines.push(format!("Face-off {}", scoreboard(match_scores).to_lowercase()));
    lines
}

pub fn game_over(summary: &GameSummary, label: &str) -> String {
    match &summary.winner {
        Some(winner) => format!("{}Game over! {} is the champion!", label, winner),
        None => format!("{}Game over! No winner this time.", label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_feedback_goes_to_sender() {
        let lines = round_event(
            &RoundEvent::VoteRejected {
                id: "alice".to_string(),
                reason: VoteRejection::OwnEntry,
            },
            "",
        );
        assert_eq!(
            lines,
            vec![Line::Private(
                "alice".to_string(),
                "You can't vote for your own entry.".to_string()
            )]
        );
    }

    #[test]
    fn test_ballot_is_numbered_from_one() {
        let submissions: BTreeMap<ParticipantId, Submission> = [
            (
                "alice".to_string(),
                Submission {
                    phrase: "big angry dog".to_string(),
                    submitted_ms: 5,
                    seq: 0,
                },
            ),
            (
                "bob".to_string(),
                Submission {
                    phrase: "bad apple dance".to_string(),
                    submitted_ms: 9,
                    seq: 1,
                },
            ),
        ]
        .into();
        let lines = round_event(
            &RoundEvent::VotingOpened {
                ballot: vec!["bob".to_string(), "alice".to_string()],
                submissions,
            },
            "[Round 1] ",
        );

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], Line::Public("1. bad apple dance".to_string()));
        assert_eq!(lines[2], Line::Public("2. big angry dog".to_string()));
    }

    #[test]
    fn test_milestone_text() {
        let lines = round_event(
            &RoundEvent::Milestone {
                phase: Phase::CollectingVotes,
                remaining: 1,
            },
            "",
        );
        assert_eq!(lines, vec![Line::Public("1 second left to vote".to_string())]);
    }

    #[test]
    fn test_entries_pluralized() {
        let lines = round_event(
            &RoundEvent::SubmissionsClosed {
                ballot: vec!["a".to_string(), "b".to_string()],
                submissions: BTreeMap::new(),
            },
            "",
        );
        assert_eq!(lines, vec![Line::Public("Time's up! 2 entries in.".to_string())]);
    }

    #[test]
    fn test_scoreboard() {
        let totals: BTreeMap<ParticipantId, u32> =
            [("alice".to_string(), 3), ("bob".to_string(), 7)].into();
        assert_eq!(scoreboard(&totals), "Scores: bob 7 | alice 3");
        assert_eq!(scoreboard(&BTreeMap::new()), "Scores: nobody has scored yet");
    }
}
