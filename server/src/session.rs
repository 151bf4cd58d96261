use std::{sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Local;
use game::{presentation::{Audio, Effect, SilentAudio, SilentSurface, Surface}, WordSource};
use msgs::ParticipantId;
use tokio::{net::TcpListener, time::{interval, sleep_until, Instant, MissedTickBehavior}};
use tracing::{debug, info};

use crate::{
    broadcast_msg::BroadcastMsg,
    config::SessionConfig,
    participant_db::ParticipantDb,
    report::{Outcome, SessionReport},
    round_state::SharedRoundState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingConnections,
    Drawing,
    Broadcasting,
    Collecting,
    Evaluating,
    Resetting,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionWindow {
    pub round: Duration,
    /// Extra time after the deadline for responses that raced the timer.
    pub grace: Duration,
    pub poll: Duration,
    /// How long to keep listening once everyone has answered, so follow-up
    /// messages sent as separate writes land in their own round.
    pub settle: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collected {
    Winner (ParticipantId),
    AllAcked,
    TimedOut,
    Abandoned,
}

fn settled(state: &SharedRoundState) -> Option<Collected> {
    if let Some(winner) = state.winner() {
        return Some(Collected::Winner (winner));
    }
    let live = state.live_participants();
    if live.is_empty() {
        return Some(Collected::Abandoned);
    }
    if state.all_acked(&live) {
        return Some(Collected::AllAcked);
    }
    None
}

/// `settled`, except that an all-acked round only counts once it has stayed
/// that way for `settle`. A winner still ends the round at once.
fn settled_after(state: &SharedRoundState, settle: Duration, settling: &mut Option<Instant>) -> Option<Collected> {
    let collected = settled(state)?;
    if collected != Collected::AllAcked || settle.is_zero() {
        return Some(collected);
    }
    let until = *settling.get_or_insert_with(|| Instant::now() + settle);
    (Instant::now() >= until).then_some(collected)
}

/// Waits for every live participant to acknowledge, a winner, or the
/// deadline plus grace, whichever comes first.
///
/// `on_tick` gets the time left until the deadline on every poll.
pub async fn collect_acknowledgements(
    state: &SharedRoundState,
    window: CollectionWindow,
    mut on_tick: impl FnMut(Duration),
) -> Collected {
    let deadline = Instant::now() + window.round;
    let mut ticker = interval(window.poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut settling = None;

    loop {
        if let Some(collected) = settled_after(state, window.settle, &mut settling) {
            return collected;
        }
        on_tick(deadline.saturating_duration_since(Instant::now()));
        tokio::select! {
            _ = sleep_until(deadline) => break,
            _ = ticker.tick() => {}
        }
    }

    let grace_deadline = Instant::now() + window.grace;
    loop {
        if let Some(collected) = settled_after(state, window.settle, &mut settling) {
            return collected;
        }
        if Instant::now() >= grace_deadline {
            return Collected::TimedOut;
        }
        tokio::select! {
            _ = sleep_until(grace_deadline) => {}
            _ = ticker.tick() => {}
        }
    }
}

/// Drives the rounds of one session.
pub struct Session<S> {
    config: SessionConfig,
    words: S,
    state: SharedRoundState,
    surface: Arc<dyn Surface>,
    audio: Arc<dyn Audio>,
    phase: Phase,
}

impl<S: WordSource> Session<S> {
    pub fn new(config: SessionConfig, words: S) -> Session<S> {
        Session {
            config,
            words,
            state: SharedRoundState::new(),
            surface: Arc::new(SilentSurface),
            audio: Arc::new(SilentAudio),
            phase: Phase::AwaitingConnections,
        }
    }

    pub fn with_surface(mut self, surface: Arc<dyn Surface>) -> Session<S> {
        self.surface = surface;
        self
    }

    pub fn with_audio(mut self, audio: Arc<dyn Audio>) -> Session<S> {
        self.audio = audio;
        self
    }

    pub fn state(&self) -> SharedRoundState {
        self.state.clone()
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "session phase");
        self.phase = phase;
    }

    pub async fn run(mut self, listener: TcpListener) -> anyhow::Result<SessionReport> {
        let started_at = Local::now();
        let mut participant_db = ParticipantDb::new(self.state.clone(), self.config.framing);

        self.enter(Phase::AwaitingConnections);
        self.surface.render_status(&format!("Waiting for {} participants...", self.config.participants));
        while participant_db.len() < self.config.participants {
            let (socket, addr) = listener.accept().await.context("accepting participant connection")?;
            let display_name = self.config.display_name(participant_db.len());
            participant_db.new_participant(socket, addr, display_name.clone());
            self.surface.render_status(&format!(
                "{display_name} connected ({}/{})",
                participant_db.len(),
                self.config.participants,
            ));
        }

        let mut drawn_words = Vec::new();
        let mut rounds = 0;
        let outcome = loop {
            self.enter(Phase::Drawing);
            let word = match self.draw_word() {
                Ok(word) => word,
                Err(outcome) => break outcome,
            };
            rounds += 1;
            drawn_words.push(word.clone());
            self.state.set_current_word(word.clone());
            info!(round = rounds, word = %word, "drew word");
            self.render_round(rounds, &word);

            self.enter(Phase::Broadcasting);
            let listening = participant_db.broadcast(BroadcastMsg::Word (word));
            debug!(round = rounds, listening, "broadcast word");

            self.enter(Phase::Collecting);
            let collected = {
                let surface = self.surface.clone();
                let audio = self.audio.clone();
                let warning = self.config.countdown_warning();
                let mut shown_secs = None;
                let mut warned = false;
                collect_acknowledgements(&self.state, self.config.window(), |remaining| {
                    let secs = remaining.as_secs();
                    if shown_secs != Some(secs) {
                        shown_secs = Some(secs);
                        surface.render_status(&format!("Time left: {secs} seconds"));
                    }
                    if !warned && remaining <= warning {
                        warned = true;
                        audio.play_effect(Effect::Countdown);
                    }
                }).await
            };
            debug!(round = rounds, ?collected, "collection window closed");

            self.enter(Phase::Evaluating);
            if let Some(id) = self.state.winner() {
                let name = self.state.participant(id).map(|p| p.display_name).unwrap_or_default();
                break Outcome::Winner { id, name };
            }
            let live = self.state.live_participants();
            if live.is_empty() {
                break Outcome::NoParticipants;
            }
            if live.len() < participant_db.len() {
                self.surface.render_status(&format!(
                    "Playing on with {} of {} participants.",
                    live.len(),
                    participant_db.len(),
                ));
            }

            self.enter(Phase::Resetting);
            self.state.clear_acks();
        };

        self.enter(Phase::Terminal);
        match &outcome {
            Outcome::Winner { id, name } => {
                participant_db.broadcast(BroadcastMsg::Win (*id));
                self.audio.play_effect(Effect::Winning);
                self.surface.render_status(&format!("{name} won!"));
            }
            _ => {
                participant_db.broadcast(BroadcastMsg::Close);
            }
        }
        info!(?outcome, rounds, "session over");
        participant_db.close(self.config.linger()).await;

        Ok(SessionReport {
            outcome,
            rounds,
            drawn_words,
            participants: self.state.snapshot(),
            started_at,
            ended_at: Local::now(),
        })
    }

    /// The next word, or why no further round can be played. Nobody left
    /// means nothing is drawn, so the report only counts broadcast words.
    fn draw_word(&mut self) -> Result<String, Outcome> {
        if self.state.live_participants().is_empty() {
            return Err(Outcome::NoParticipants);
        }
        self.words.draw(self.config.draw_policy.exclude_drawn()).map_err(|e| {
            info!("no more rounds possible: {e}");
            Outcome::PoolExhausted
        })
    }

    fn render_round(&self, round: u32, word: &str) {
        let mut status = format!("Round {round}: the drawn word is {word}\nCurrent scores:");
        for participant in self.state.snapshot() {
            let left = if participant.connected { "" } else { " (left)" };
            status.push_str(&format!("\n  {}: {} points{left}", participant.display_name, participant.score));
        }
        self.surface.render_status(&status);
    }
}

#[cfg(test)]
mod tests {
    use game::{word_pool::session_rng, WordPool};

    use super::*;

    fn state_with(n: u32) -> SharedRoundState {
        let state = SharedRoundState::new();
        for id in 0..n {
            state.register(id, format!("Player {}", id + 1));
        }
        state
    }

    fn window(round: u64, grace: u64) -> CollectionWindow {
        CollectionWindow {
            round: Duration::from_secs(round),
            grace: Duration::from_secs(grace),
            poll: Duration::from_millis(100),
            settle: Duration::ZERO,
        }
    }

    fn settling_window(settle_millis: u64) -> CollectionWindow {
        CollectionWindow {
            settle: Duration::from_millis(settle_millis),
            ..window(30, 2)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn silent_round_ends_at_deadline_plus_grace() {
        let state = state_with(2);
        let start = Instant::now();
        let collected = collect_acknowledgements(&state, window(30, 2), |_| {}).await;
        let elapsed = start.elapsed();
        assert_eq!(collected, Collected::TimedOut);
        assert!(elapsed >= Duration::from_secs(32), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(32) + Duration::from_millis(100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn without_grace_the_deadline_is_final() {
        let state = state_with(1);
        let start = Instant::now();
        collect_acknowledgements(&state, window(30, 0), |_| {}).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(30), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(30) + Duration::from_millis(100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn all_acks_advance_before_deadline() {
        let state = state_with(2);
        let acking = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            acking.set_ack(0);
            acking.set_ack(1);
        });

        let start = Instant::now();
        let collected = collect_acknowledgements(&state, window(30, 2), |_| {}).await;
        let elapsed = start.elapsed();
        assert_eq!(collected, Collected::AllAcked);
        assert!(elapsed >= Duration::from_secs(3), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(3) + Duration::from_millis(200), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn late_ack_lands_in_grace_period() {
        let state = state_with(1);
        let acking = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30_500)).await;
            acking.set_ack(0);
        });

        let collected = collect_acknowledgements(&state, window(30, 2), |_| {}).await;
        assert_eq!(collected, Collected::AllAcked);
    }

    #[tokio::test(start_paused = true)]
    async fn winner_ends_collection_early() {
        let state = state_with(3);
        let claiming = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            claiming.declare_winner(2);
        });

        let start = Instant::now();
        let collected = collect_acknowledgements(&state, window(30, 2), |_| {}).await;
        assert_eq!(collected, Collected::Winner (2));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_participants_are_not_waited_for() {
        let state = state_with(3);
        state.set_ack(0);
        state.set_ack(1);
        state.disconnect(2);
        let collected = collect_acknowledgements(&state, window(30, 2), |_| {}).await;
        assert_eq!(collected, Collected::AllAcked);
    }

    #[tokio::test(start_paused = true)]
    async fn nobody_left_abandons_the_round() {
        let state = state_with(1);
        state.disconnect(0);
        let collected = collect_acknowledgements(&state, window(30, 2), |_| {}).await;
        assert_eq!(collected, Collected::Abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_reports_shrinking_time_left() {
        let state = state_with(1);
        let mut seen = Vec::new();
        collect_acknowledgements(&state, window(2, 0), |remaining| seen.push(remaining)).await;
        assert_eq!(seen.first(), Some(&Duration::from_secs(2)));
        assert!(seen.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_holds_an_all_acked_round_open() {
        let state = state_with(1);
        let acking = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            acking.set_ack(0);
        });

        let start = Instant::now();
        let collected = collect_acknowledgements(&state, settling_window(2_000), |_| {}).await;
        let elapsed = start.elapsed();
        assert_eq!(collected, Collected::AllAcked);
        assert!(elapsed >= Duration::from_secs(3), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(3) + Duration::from_millis(200), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn win_sent_after_the_answer_lands_while_settling() {
        let state = state_with(1);
        let answering = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            answering.set_ack(0);
            tokio::time::sleep(Duration::from_millis(100)).await;
            answering.increment_score(0);
            tokio::time::sleep(Duration::from_millis(100)).await;
            answering.declare_winner(0);
        });

        let start = Instant::now();
        let collected = collect_acknowledgements(&state, settling_window(2_000), |_| {}).await;
        assert_eq!(collected, Collected::Winner (0));
        assert!(start.elapsed() < Duration::from_millis(1_400), "{:?}", start.elapsed());
        assert_eq!(state.participant(0).unwrap().score, 1);
    }

    #[test]
    fn nothing_is_drawn_once_everyone_left() {
        let config = SessionConfig { participants: 1, ..SessionConfig::default() };
        let pool = WordPool::new(vec!["cloud".into(), "pivot".into()], session_rng(Some(1)));
        let mut session = Session::new(config, pool);
        session.state.register(0, "Ada".into());

        assert!(session.draw_word().is_ok());
        assert_eq!(session.words.drawn_count(), 1);

        session.state.disconnect(0);
        assert_eq!(session.draw_word(), Err(Outcome::NoParticipants));
        assert_eq!(session.words.drawn_count(), 1);
    }
}
