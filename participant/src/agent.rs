use std::sync::Arc;

use game::{presentation::{Audio, Effect, SilentAudio, SilentSurface, Surface}, Grid};
use msgs::{coordinator_msg::CoordinatorMsg, framing::Framing, participant_msg::{parse_answer, ParticipantMsg}};
use tokio::{net::TcpStream, sync::mpsc};
use tracing::{debug, info};

use crate::coordinator_connection_process::spawn_coordinator_connection_process;

/// Where yes/no answers come from.
pub enum Responder {
    /// Lines typed by a human, re-prompted until they read as yes or no.
    Console (mpsc::Receiver<String>),
    /// Answers whether the word is on the grid.
    Truthful,
}

impl Responder {
    pub async fn prompt_yes_no(&mut self, surface: &dyn Surface, prompt: &str, holds_word: bool) -> bool {
        match self {
            Responder::Truthful => holds_word,
            Responder::Console (lines) => loop {
                surface.render_status(prompt);
                let Some(line) = lines.recv().await else { return false };
                if let Some(answer) = parse_answer(&line) {
                    return answer;
                }
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOutcome {
    /// The coordinator announced the end of the game. Whether this agent's
    /// own claim was the one honored is not signaled.
    GameOver { claimed_win: bool },
    Disconnected,
}

pub struct Agent {
    name: String,
    grid: Grid,
    framing: Framing,
    responder: Responder,
    surface: Arc<dyn Surface>,
    audio: Arc<dyn Audio>,
    claimed_win: bool,
}

impl Agent {
    pub fn new(name: String, grid: Grid, framing: Framing, responder: Responder) -> Agent {
        Agent {
            name,
            grid,
            framing,
            responder,
            surface: Arc::new(SilentSurface),
            audio: Arc::new(SilentAudio),
            claimed_win: false,
        }
    }

    pub fn with_surface(mut self, surface: Arc<dyn Surface>) -> Agent {
        self.surface = surface;
        self
    }

    pub fn with_audio(mut self, audio: Arc<dyn Audio>) -> Agent {
        self.audio = audio;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub async fn run(&mut self, stream: TcpStream) -> AgentOutcome {
        let (coordinator_to_main, mut main_from_coordinator) = mpsc::channel(100);
        let to_coordinator = spawn_coordinator_connection_process(stream, self.framing, coordinator_to_main);

        self.surface.render_status(&format!("{}'s card:", self.name));
        self.surface.render_grid(&self.grid, None);

        loop {
            let Some(msg) = main_from_coordinator.recv().await else {
                self.surface.render_status("Lost the connection to the coordinator.");
                return AgentOutcome::Disconnected;
            };
            match msg {
                CoordinatorMsg::Win => {
                    info!(name = %self.name, claimed_win = self.claimed_win, "game over");
                    self.surface.render_status("The game is over.");
                    return AgentOutcome::GameOver { claimed_win: self.claimed_win };
                }
                CoordinatorMsg::Word (word) => {
                    if self.claimed_win {
                        debug!(word = %word, "ignoring word after claiming a win");
                        continue;
                    }
                    let responses = self.respond(&word).await;
                    if to_coordinator.send(responses).await.is_err() {
                        return AgentOutcome::Disconnected;
                    }
                }
            }
        }
    }

    /// Everything this agent sends back for one drawn word, in order.
    pub async fn respond(&mut self, word: &str) -> Vec<ParticipantMsg> {
        self.surface.render_status(&format!("The drawn word is: {word}"));
        self.surface.render_grid(&self.grid, None);

        let prompt = format!("{}, do you have '{word}' on your card? (j/n): ", self.name);
        let holds_word = self.grid.contains(word);
        let answer = self.responder.prompt_yes_no(&*self.surface, &prompt, holds_word).await;

        let mut responses = vec![ParticipantMsg::Answer (answer)];
        if !answer {
            return responses;
        }
        let Some(cell) = self.grid.mark_word(word) else {
            self.surface.render_status(&format!("'{word}' is not on your card."));
            return responses;
        };

        self.audio.play_effect(Effect::Achievement);
        self.surface.render_status(&format!("{} has the word {word} on the card!", self.name));
        self.surface.render_grid(&self.grid, Some(cell));
        responses.push(ParticipantMsg::Scored);

        if self.grid.has_winning_line() {
            self.claimed_win = true;
            responses.push(ParticipantMsg::Win);
            self.audio.play_effect(Effect::Winning);
            self.surface.render_status(&format!("{} has won!", self.name));
        }
        responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::construct(
            vec!["cloud".into(), "synergy".into(), "pivot".into(), "disrupt".into()],
            2,
        ).unwrap()
    }

    #[tokio::test]
    async fn truthful_agent_scores_and_claims_win() {
        let mut agent = Agent::new("Ada".into(), grid(), Framing::LengthPrefixed, Responder::Truthful);

        assert_eq!(agent.respond("leverage").await, vec![ParticipantMsg::Answer (false)]);
        assert_eq!(agent.respond("cloud").await, vec![ParticipantMsg::Answer (true), ParticipantMsg::Scored]);
        assert_eq!(
            agent.respond("pivot").await,
            vec![ParticipantMsg::Answer (true), ParticipantMsg::Scored, ParticipantMsg::Win],
        );
        assert!(agent.grid().is_marked(0, 0));
        assert!(agent.grid().is_marked(1, 0));
    }

    #[tokio::test]
    async fn console_answers_are_reprompted_until_valid() {
        let (lines, answers) = mpsc::channel(8);
        lines.send("vielleicht\n".to_owned()).await.unwrap();
        lines.send("J\n".to_owned()).await.unwrap();
        let mut agent = Agent::new("Ada".into(), grid(), Framing::LengthPrefixed, Responder::Console (answers));

        assert_eq!(agent.respond("synergy").await, vec![ParticipantMsg::Answer (true), ParticipantMsg::Scored]);
    }

    #[tokio::test]
    async fn yes_for_a_missing_word_does_not_mark() {
        let (lines, answers) = mpsc::channel(8);
        lines.send("j\n".to_owned()).await.unwrap();
        let mut agent = Agent::new("Ada".into(), grid(), Framing::LengthPrefixed, Responder::Console (answers));

        assert_eq!(agent.respond("leverage").await, vec![ParticipantMsg::Answer (true)]);
        assert_eq!(agent.grid(), &grid());
    }

    #[tokio::test]
    async fn closed_console_answers_no() {
        let (lines, answers) = mpsc::channel::<String>(1);
        drop(lines);
        let mut agent = Agent::new("Ada".into(), grid(), Framing::LengthPrefixed, Responder::Console (answers));

        assert_eq!(agent.respond("cloud").await, vec![ParticipantMsg::Answer (false)]);
    }
}
