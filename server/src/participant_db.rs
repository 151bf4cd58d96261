use std::{io, net::SocketAddr, time::Duration};

use msgs::{coordinator_msg::CoordinatorMsg, framing::Framing, participant_msg::ParticipantMsg, violation::ProtocolViolation, ParticipantId};
use tokio::{io::{AsyncReadExt, AsyncWriteExt}, net::TcpStream, sync::broadcast::{self, error::RecvError}, task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};

use crate::{broadcast_msg::BroadcastMsg, round_state::{RoundState, SharedRoundState}};

const BROADCAST_CAPACITY: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("participant {id} disconnected: {source}")]
    PeerDisconnected {
        id: ParticipantId,
        #[source]
        source: io::Error,
    },
}

/// Per-connection round state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Idle,
    SentWord,
    AckNo,
    AckMatch,
    AckWin { honored: bool },
}

struct Participant {
    id: ParticipantId,
    handle: JoinHandle<()>,
}

pub struct ParticipantDb {
    id_counter: ParticipantId,
    participants: Vec<Participant>,
    tx: broadcast::Sender<BroadcastMsg>,
    state: SharedRoundState,
    framing: Framing,
}

impl ParticipantDb {
    pub fn new(state: SharedRoundState, framing: Framing) -> ParticipantDb {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        ParticipantDb {
            id_counter: 0,
            participants: Vec::new(),
            tx,
            state,
            framing,
        }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn new_participant(&mut self, socket: TcpStream, addr: SocketAddr, display_name: String) -> ParticipantId {
        let id = self.id_counter;
        self.id_counter += 1;
        self.state.register(id, display_name);
        // subscribe before spawning so the first word cannot be missed
        let rx = self.tx.subscribe();
        let handle = spawn_connection_handler(socket, rx, self.state.clone(), id, addr, self.framing);
        self.participants.push(Participant { id, handle });
        info!(participant = id, %addr, "accepted participant");
        id
    }

    /// Returns how many handlers are still listening.
    pub fn broadcast(&self, msg: BroadcastMsg) -> usize {
        match self.tx.send(msg) {
            Ok(listening) => listening,
            Err(_) => {
                debug!("broadcast with no handlers left");
                0
            }
        }
    }

    /// Tells every handler to finish and waits up to `linger` for them.
    pub async fn close(self, linger: Duration) {
        let _ = self.tx.send(BroadcastMsg::Close);
        drop(self.tx);
        let deadline = Instant::now() + linger;
        for participant in self.participants {
            let mut handle = participant.handle;
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                warn!(participant = participant.id, "handler did not finish in time");
                handle.abort();
            }
        }
    }
}

enum Ended {
    SessionOver,
    PeerClosed,
    Failed (HandlerError),
}

pub fn spawn_connection_handler(
    mut socket: TcpStream,
    mut rx: broadcast::Receiver<BroadcastMsg>,
    state: SharedRoundState,
    id: ParticipantId,
    addr: SocketAddr,
    framing: Framing,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut static_buffer = [0; 1024];
        let mut input_buffer = Vec::new();
        let mut output_buffer = Vec::new();
        let mut handler_state = HandlerState::Idle;

        let ended = loop {
            tokio::select! {
                biased;
                result = rx.recv() => {
                    let broadcast_msg = match result {
                        Ok(msg) => msg,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(participant = id, skipped, "handler fell behind the coordinator");
                            // the skipped messages may have held the win announcement
                            if state.winner().is_some() {
                                if let Err(e) = send_coordinator_msg(&CoordinatorMsg::Win, &mut socket, &mut output_buffer, framing, id).await {
                                    break Ended::Failed(e);
                                }
                                break Ended::SessionOver;
                            }
                            continue;
                        }
                        Err(RecvError::Closed) => break Ended::SessionOver,
                    };

                    match broadcast_msg {
                        BroadcastMsg::Word (word) => {
                            let msg = CoordinatorMsg::Word (word);
                            if let Err(e) = send_coordinator_msg(&msg, &mut socket, &mut output_buffer, framing, id).await {
                                break Ended::Failed(e);
                            }
                            handler_state = transition(id, handler_state, HandlerState::SentWord);
                        }
                        BroadcastMsg::Win (winner) => {
                            debug!(participant = id, winner, "announcing winner");
                            if let Err(e) = send_coordinator_msg(&CoordinatorMsg::Win, &mut socket, &mut output_buffer, framing, id).await {
                                break Ended::Failed(e);
                            }
                            break Ended::SessionOver;
                        }
                        BroadcastMsg::Close => break Ended::SessionOver,
                    }
                }
                result = socket.read(&mut static_buffer) => {
                    let len = match result {
                        Ok(len) => len,
                        Err(source) => break Ended::Failed(HandlerError::PeerDisconnected { id, source }),
                    };
                    if len == 0 {
                        break Ended::PeerClosed;
                    }
                    input_buffer.extend(&static_buffer[..len]);

                    let mut responses = Vec::new();
                    while let Some((cursor, msg)) = ParticipantMsg::dequeue_and_decode(&input_buffer, framing) {
                        if let Err(e) = &msg {
                            warn!(participant = id, "protocol violation, treating as a negative answer: {e}");
                        }
                        responses.push(msg);
                        input_buffer.drain(..cursor);
                    }
                    if responses.is_empty() {
                        continue;
                    }

                    let applied = state.update(|round| {
                        responses.iter().map(|response| apply_response(round, id, response)).collect::<Vec<_>>()
                    });
                    for next in applied {
                        handler_state = transition(id, handler_state, next);
                    }
                    handler_state = transition(id, handler_state, HandlerState::Idle);
                }
            }
        };

        match ended {
            Ended::SessionOver => debug!(participant = id, "handler finished"),
            Ended::PeerClosed => {
                state.disconnect(id);
                info!(participant = id, %addr, "participant left");
            }
            Ended::Failed (e) => {
                state.disconnect(id);
                warn!(participant = id, %addr, "dropping participant: {e}");
            }
        }
    })
}

/// Claims are taken at face value: the coordinator holds no grids to check
/// them against.
///
/// Only the answer acknowledges the word. `SCORED` and `WIN` follow it and
/// never end a round on their own.
pub fn apply_response(round: &mut RoundState, id: ParticipantId, response: &Result<ParticipantMsg, ProtocolViolation>) -> HandlerState {
    match response {
        Ok(ParticipantMsg::Answer (true)) => {
            round.set_ack(id);
            HandlerState::AckMatch
        }
        Ok(ParticipantMsg::Answer (false)) | Err(_) => {
            round.set_ack(id);
            HandlerState::AckNo
        }
        Ok(ParticipantMsg::Scored) => {
            round.increment_score(id);
            HandlerState::AckMatch
        }
        Ok(ParticipantMsg::Win) => HandlerState::AckWin { honored: round.declare_winner(id) },
    }
}

fn transition(id: ParticipantId, from: HandlerState, to: HandlerState) -> HandlerState {
    if let HandlerState::AckWin { honored } = to {
        info!(participant = id, honored, "win claimed");
    }
    debug!(participant = id, ?from, ?to, "handler transition");
    to
}

pub async fn send_coordinator_msg(
    msg: &CoordinatorMsg,
    socket: &mut TcpStream,
    output_buffer: &mut Vec<u8>,
    framing: Framing,
    id: ParticipantId,
) -> Result<(), HandlerError> {
    output_buffer.clear();
    msg.pack(framing, output_buffer).map_err(|source| HandlerError::PeerDisconnected { id, source })?;
    socket.write_all(output_buffer).await.map_err(|source| HandlerError::PeerDisconnected { id, source })
}
