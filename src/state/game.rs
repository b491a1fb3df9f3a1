//! Game runner for a single arena
//!
//! One task drives the game: standard rounds until somebody reaches the point
//! cap, then a face-off between the two leaders. Face-off voting runs on a
//! separate worker that owns the single voting slot while the driver keeps
//! opening submission phases. Everything the two tasks and incoming chat touch
//! lives behind one mutex, and no lock is held across a timer.

use super::announce::{self, Line};
use super::countdown::Countdown;
use super::face_off::FaceOff;
use super::round::{Round, RoundEvent};
use super::score::{accumulate, assign_points, leaderboard, Bonuses};
use crate::broadcast::Messenger;
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-game settings
#[derive(Debug, Clone, Default)]
pub struct GameOptions {
    pub config: GameConfig,
    /// Fixed RNG seed for reproducible acronyms and ballots
    pub seed: Option<u64>,
}

enum Mode {
    Starting,
    Standard(Round),
    FaceOff(FaceOff),
    Ended,
}

/// Which round a timer belongs to
#[derive(Debug, Clone, Copy)]
enum Slot {
    Standard,
    FaceOff(usize),
}

struct GameInner {
    mode: Mode,
    round_no: u32,
    scores: BTreeMap<ParticipantId, u32>,
    rng: StdRng,
}

fn round_in(mode: &mut Mode, slot: Slot) -> Option<&mut Round> {
    match (mode, slot) {
        (Mode::Standard(round), Slot::Standard) => Some(round),
        (Mode::FaceOff(face_off), Slot::FaceOff(index)) => face_off.round_mut(index),
        _ => None,
    }
}

fn face_off_in(mode: &mut Mode) -> Option<&mut FaceOff> {
    match mode {
        Mode::FaceOff(face_off) => Some(face_off),
        _ => None,
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

pub struct Game {
    id: GameId,
    arena: ArenaId,
    config: GameConfig,
    inner: Mutex<GameInner>,
    messenger: Arc<dyn Messenger>,
    cancel: CancellationToken,
    ended: AtomicBool,
    /// Signalled each time a face-off round gives up the voting slot
    vote_released: Notify,
}

impl Game {
    pub fn new(arena: ArenaId, options: GameOptions, messenger: Arc<dyn Messenger>) -> Arc<Self> {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Arc::new(Self {
            id: ulid::Ulid::new().to_string(),
            arena,
            config: options.config.normalized(),
            inner: Mutex::new(GameInner {
                mode: Mode::Starting,
                round_no: 0,
                scores: BTreeMap::new(),
                rng,
            }),
            messenger,
            cancel: CancellationToken::new(),
            ended: AtomicBool::new(false),
            vote_released: Notify::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn arena(&self) -> &str {
        &self.arena
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn is_live(&self) -> bool {
        !self.ended.load(Ordering::SeqCst)
    }

    /// Abort the game. Returns false if it had already ended.
    pub fn stop(&self) -> bool {
        let was_live = !self.ended.swap(true, Ordering::SeqCst);
        if was_live {
            self.cancel.cancel();
            tracing::info!(game_id = %self.id, arena = %self.arena, "Game stopped");
        }
        was_live
    }

    /// Route one chat line to whatever phase is open
    pub async fn submit_input(&self, participant: &str, text: &str) -> Option<RoundEvent> {
        if !self.is_live() {
            return None;
        }
        let mut inner = self.inner.lock().await;
        // Stop may have landed while we waited for the lock
        if !self.is_live() {
            return None;
        }

        let now = Instant::now();
        let event = match &mut inner.mode {
            Mode::Standard(round) => round.handle_input(participant, text, now),
            Mode::FaceOff(face_off) => face_off
                .route_input(participant, text, now)
                .map(|(_, event)| event),
            Mode::Starting | Mode::Ended => None,
        }?;

        tracing::debug!(game_id = %self.id, participant, event = ?event, "Input handled");
        self.emit(&event, "");
        Some(event)
    }

    pub async fn snapshot(&self) -> GameSnapshot {
        let inner = self.inner.lock().await;

        let (stage, phase, acronym, ballot) = match &inner.mode {
            Mode::Starting => (GameStage::Starting, Phase::Idle, None, Vec::new()),
            Mode::Standard(round) => {
                let ballot = if round.phase() == Phase::CollectingVotes {
                    round.ballot().to_vec()
                } else {
                    Vec::new()
                };
                (
                    GameStage::Standard,
                    round.phase(),
                    round.acronym().map(|a| a.to_string()),
                    ballot,
                )
            }
            Mode::FaceOff(face_off) => {
                let submitting = face_off.submitting().and_then(|i| face_off.round(i));
                let voting = face_off
                    .voting()
                    .and_then(|i| face_off.round(i))
                    .filter(|round| round.phase() == Phase::CollectingVotes);
                let phase = submitting
                    .map(|round| round.phase())
                    .filter(|phase| *phase != Phase::Idle)
                    .or(voting.map(|round| round.phase()))
                    .unwrap_or(Phase::Idle);
                (
                    GameStage::FaceOff,
                    phase,
                    submitting.and_then(|round| round.acronym().map(|a| a.to_string())),
                    voting.map(|round| round.ballot().to_vec()).unwrap_or_default(),
                )
            }
            Mode::Ended => (GameStage::Ended, Phase::Idle, None, Vec::new()),
        };

        GameSnapshot {
            id: self.id.clone(),
            arena: self.arena.clone(),
            stage,
            round_no: inner.round_no,
            phase,
            acronym,
            ballot,
            scores: inner.scores.clone(),
        }
    }

    /// Play the game to completion. Announces the result unless stopped.
    pub async fn run(self: Arc<Self>) -> GameResult<GameSummary> {
        tracing::info!(game_id = %self.id, arena = %self.arena, "Game started");

        let result = self.play().await;
        match &result {
            Ok(summary) => {
                self.say(&announce::game_over(summary, ""));
                tracing::info!(
                    game_id = %self.id,
                    winner = ?summary.winner,
                    "Game finished"
                );
            }
            Err(e) => tracing::info!(game_id = %self.id, error = %e, "Game ended early"),
        }

        self.ended.store(true, Ordering::SeqCst);
        self.cancel.cancel();
        self.inner.lock().await.mode = Mode::Ended;
        result
    }

    async fn play(self: &Arc<Self>) -> GameResult<GameSummary> {
        let mut round_no = 0;
        let mut failed = 0;

        loop {
            round_no += 1;
            match self.play_standard_round(round_no).await {
                Ok(()) => failed = 0,
                Err(e) if e.is_failed_round() => {
                    failed += 1;
                    tracing::warn!(round_no, failed, error = %e, "Round produced no result");
                    self.say(&announce::failed_round(&e, &format!("[Round {}] ", round_no)));

                    let max = self.config.max_failed_rounds;
                    if max > 0 && failed >= max {
                        let scores = self.inner.lock().await.scores.clone();
                        return Ok(GameSummary {
                            winner: None,
                            scores,
                        });
                    }
                }
                Err(e) => return Err(e),
            }

            let scores = self.inner.lock().await.scores.clone();
            if scores.values().any(|points| *points >= self.config.point_cap) {
                let board = leaderboard(&scores);
                let winner = match board.as_slice() {
                    [(first, _), (second, _), ..] => {
                        self.play_face_off([first.clone(), second.clone()]).await?
                    }
                    [(only, _)] => Some(only.clone()),
                    [] => None,
                };
                return Ok(GameSummary { winner, scores });
            }

            self.pause(secs(self.config.secs_between_rounds)).await?;
        }
    }

    async fn play_standard_round(&self, round_no: u32) -> GameResult<()> {
        let label = format!("[Round {}] ", round_no);

        {
            let mut inner = self.inner.lock().await;
            let GameInner {
                mode,
                rng,
                round_no: current,
                ..
            } = &mut *inner;

            *current = round_no;
            let letters = rng.random_range(self.config.min_letters..=self.config.max_letters);
            let mut round = Round::new(letters);
            let opened = round.start_submissions(&self.config.char_pool, Instant::now(), rng);
            *mode = Mode::Standard(round);
            self.emit_opened(opened, &label);
        }
        tracing::debug!(round_no, "Standard round opened");

        self.run_countdown(
            self.config.secs_per_acro_round,
            Phase::CollectingSubmissions,
            Slot::Standard,
            &label,
        )
        .await?;

        let submitted = {
            let mut inner = self.inner.lock().await;
            let GameInner { mode, rng, .. } = &mut *inner;
            let round = round_in(mode, Slot::Standard).ok_or(GameError::GameAborted)?;
            if let Some(event) = round.close_submissions(rng) {
                self.emit(&event, &label);
            }
            round.submissions().len()
        };
        if submitted < 2 {
            return Err(GameError::InsufficientSubmissions { submitted });
        }

        {
            let mut inner = self.inner.lock().await;
            let round = round_in(&mut inner.mode, Slot::Standard).ok_or(GameError::GameAborted)?;
            self.emit_opened(round.start_voting(), &label);
        }

        self.run_countdown(
            self.config.secs_per_vote_round,
            Phase::CollectingVotes,
            Slot::Standard,
            &label,
        )
        .await?;

        let lines = {
            let mut inner = self.inner.lock().await;
            let round = round_in(&mut inner.mode, Slot::Standard).ok_or(GameError::GameAborted)?;
            if let Some(event) = round.close_voting() {
                self.emit(&event, &label);
            }
            let tally = round.tally().cloned().unwrap_or_default();
            if tally.winner.is_none() {
                return Err(GameError::NoVotesCast);
            }

            let points = assign_points(
                &tally,
                Bonuses {
                    fastest_with_vote: self.config.points_fastest_with_vote,
                    winner: round.letters() as u32,
                    vote_for_winner: self.config.points_vote_for_winner,
                },
            );
            let mut lines = announce::standard_results(&tally, round.submissions(), &points, &label);

            accumulate(&mut inner.scores, &points);
            lines.push(announce::scoreboard(&inner.scores));
            lines
        };
        tracing::info!(round_no, "Standard round scored");

        self.say_lines(lines).await?;
        self.pause(secs(self.config.secs_after_results)).await
    }

    /// Returns the match winner, or None for an unbreakable tie
    async fn play_face_off(
        self: &Arc<Self>,
        contestants: [ParticipantId; 2],
    ) -> GameResult<Option<ParticipantId>> {
        let rounds = self.config.face_off_rounds;
        tracing::info!(
            game_id = %self.id,
            first = %contestants[0],
            second = %contestants[1],
            rounds,
            "Face-off started"
        );

        self.inner.lock().await.mode = Mode::FaceOff(FaceOff::new(
            contestants.clone(),
            self.config.face_off_min_letters,
            rounds,
        ));
        self.say(&announce::face_off_intro(&contestants, rounds));

        for index in 0..rounds {
            if index > 0 {
                self.pause(secs(self.config.secs_between_face_off_rounds))
                    .await?;
            }
            let label = self.face_off_label(index);

            {
                let mut inner = self.inner.lock().await;
                let GameInner { mode, rng, .. } = &mut *inner;
                let face_off = face_off_in(mode).ok_or(GameError::GameAborted)?;
                let opened =
                    face_off.open_submissions(index, &self.config.char_pool, Instant::now(), rng);
                self.emit_opened(opened, &label);
            }

            self.run_countdown(
                self.config.secs_per_face_off_round,
                Phase::CollectingSubmissions,
                Slot::FaceOff(index),
                &label,
            )
            .await?;

            let takes_slot = {
                let mut inner = self.inner.lock().await;
                let GameInner { mode, rng, .. } = &mut *inner;
                let face_off = face_off_in(mode).ok_or(GameError::GameAborted)?;
                if let Some(event) = face_off.close_submissions(index, rng) {
                    self.emit(&event, &label);
                }
                face_off.enqueue_vote(index)
            };
            if let Some(first) = takes_slot {
                self.spawn_vote_worker(first);
            }
        }

        loop {
            let complete = {
                let mut inner = self.inner.lock().await;
                face_off_in(&mut inner.mode)
                    .ok_or(GameError::GameAborted)?
                    .is_complete()
            };
            if complete {
                break;
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(GameError::GameAborted),
                _ = self.vote_released.notified() => {}
            }
        }

        let mut inner = self.inner.lock().await;
        let face_off = face_off_in(&mut inner.mode).ok_or(GameError::GameAborted)?;
        Ok(face_off.resolve())
    }

    /// Drain the voting queue, one round at a time, starting with `first`
    fn spawn_vote_worker(self: &Arc<Self>, first: usize) {
        let game = Arc::clone(self);
        tokio::spawn(async move {
            let mut next = Some(first);
            while let Some(index) = next {
                if let Err(e) = game.vote_face_off_round(index).await {
                    tracing::debug!(round = index, error = %e, "Face-off voting interrupted");
                    break;
                }
                next = {
                    let mut inner = game.inner.lock().await;
                    face_off_in(&mut inner.mode).and_then(|face_off| face_off.finish_vote())
                };
                game.vote_released.notify_one();
            }
        });
    }

    async fn vote_face_off_round(&self, index: usize) -> GameResult<()> {
        let label = self.face_off_label(index);
        let slot = Slot::FaceOff(index);

        let needs_vote = {
            let mut inner = self.inner.lock().await;
            face_off_in(&mut inner.mode).is_some_and(|face_off| face_off.needs_vote(index))
        };

        if needs_vote {
            {
                let mut inner = self.inner.lock().await;
                let round = round_in(&mut inner.mode, slot).ok_or(GameError::GameAborted)?;
                self.emit_opened(round.start_voting(), &label);
            }

            self.run_countdown(
                self.config.secs_per_vote_round,
                Phase::CollectingVotes,
                slot,
                &label,
            )
            .await?;

            let mut inner = self.inner.lock().await;
            let round = round_in(&mut inner.mode, slot).ok_or(GameError::GameAborted)?;
            if let Some(event) = round.close_voting() {
                self.emit(&event, &label);
            }
        }

        let lines = {
            let mut inner = self.inner.lock().await;
            let face_off = face_off_in(&mut inner.mode).ok_or(GameError::GameAborted)?;
            let outcome = face_off.settle(index).ok_or(GameError::GameAborted)?;
            let submissions = face_off
                .round(index)
                .map(|round| round.submissions().clone())
                .unwrap_or_default();
            announce::face_off_results(&outcome, &submissions, face_off.scores(), &label)
        };

        self.say_lines(lines).await?;
        self.pause(secs(self.config.secs_after_results)).await
    }

    fn face_off_label(&self, index: usize) -> String {
        format!("[Face-off {}/{}] ", index + 1, self.config.face_off_rounds)
    }

    /// Wait out a phase, announcing milestones while the phase is still open
    async fn run_countdown(&self, total: u64, phase: Phase, slot: Slot, label: &str) -> GameResult<()> {
        let countdown = Countdown::new(total);
        for step in countdown.steps() {
            self.pause(step.wait).await?;
            let Some(remaining) = step.remaining else {
                continue;
            };

            let mut inner = self.inner.lock().await;
            if let Some(event) =
                round_in(&mut inner.mode, slot).and_then(|round| round.milestone(phase, remaining))
            {
                self.emit(&event, label);
            }
        }
        Ok(())
    }

    async fn pause(&self, wait: Duration) -> GameResult<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(GameError::GameAborted),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }

    /// Public lines, `secs_between_messages` apart
    async fn say_lines(&self, lines: Vec<String>) -> GameResult<()> {
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                self.pause(secs(self.config.secs_between_messages)).await?;
            }
            self.say(line);
        }
        Ok(())
    }

    fn say(&self, text: &str) {
        if self.is_live() {
            self.messenger.send_public(text);
        }
    }

    fn emit(&self, event: &RoundEvent, label: &str) {
        self.deliver(announce::round_event(event, label));
    }

    fn emit_opened(&self, opened: Result<RoundEvent, String>, label: &str) {
        match opened {
            Ok(event) => self.emit(&event, label),
            Err(e) => tracing::warn!(game_id = %self.id, error = %e, "Could not open phase"),
        }
    }

    fn deliver(&self, lines: Vec<Line>) {
        if !self.is_live() {
            return;
        }
        for line in lines {
            match line {
                Line::Public(text) => self.messenger.send_public(&text),
                Line::Private(to, text) => self.messenger.send_private(&to, &text),
            }
        }
    }
}
