use std::time::Duration;

use msgs::{coordinator_msg::CoordinatorMsg, framing::Framing, participant_msg::ParticipantMsg};
use tokio::{io::{AsyncReadExt, AsyncWriteExt}, net::TcpStream, sync::mpsc};
use tracing::{debug, warn};

/// Pause between writes of one batch in legacy framing, where every read on
/// the other end is taken as one message.
pub const LEGACY_SEND_GAP: Duration = Duration::from_millis(50);

/// Owns the stream to the coordinator. Decoded messages go to
/// `coordinator_to_main`; batches sent on the returned channel are written in
/// order. Dropping the returned sender closes the connection.
pub fn spawn_coordinator_connection_process(
    mut stream: TcpStream,
    framing: Framing,
    coordinator_to_main: mpsc::Sender<CoordinatorMsg>,
) -> mpsc::Sender<Vec<ParticipantMsg>> {
    let (main_to_coordinator, mut coordinator_from_main) = mpsc::channel::<Vec<ParticipantMsg>>(100);
    tokio::spawn(async move {
        let mut static_buffer = [0; 1024];
        let mut input_buffer = Vec::new();
        let mut output_buffer = Vec::new();

        'connected: loop {
            tokio::select! {
                result = stream.read(&mut static_buffer) => {
                    let len = match result {
                        Ok(len) => len,
                        Err(e) => {
                            warn!("error while reading from coordinator: {e}");
                            break 'connected;
                        }
                    };
                    if len == 0 {
                        debug!("coordinator closed the connection");
                        break;
                    }
                    input_buffer.extend(&static_buffer[..len]);

                    while let Some((cursor, msg)) = CoordinatorMsg::dequeue_and_decode(&input_buffer, framing) {
                        input_buffer.drain(..cursor);
                        let msg = match msg {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!("ignoring message from coordinator: {e}");
                                continue;
                            }
                        };
                        if coordinator_to_main.send(msg).await.is_err() {
                            break 'connected;
                        }
                    }
                }
                result = coordinator_from_main.recv() => {
                    let Some(batch) = result else { break };
                    if let Err(e) = write_batch(&mut stream, &mut output_buffer, framing, &batch).await {
                        warn!("error while writing to coordinator: {e}");
                        break 'connected;
                    }
                }
            }
        }
    });
    main_to_coordinator
}

/// Length-prefixed batches go out in one write so the coordinator sees them
/// together.
async fn write_batch(
    stream: &mut TcpStream,
    output_buffer: &mut Vec<u8>,
    framing: Framing,
    batch: &[ParticipantMsg],
) -> std::io::Result<()> {
    match framing {
        Framing::LengthPrefixed => {
            output_buffer.clear();
            for msg in batch {
                msg.pack(framing, output_buffer)?;
            }
            stream.write_all(output_buffer).await
        }
        Framing::Legacy => {
            for (i, msg) in batch.iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(LEGACY_SEND_GAP).await;
                }
                output_buffer.clear();
                msg.pack(framing, output_buffer)?;
                stream.write_all(output_buffer).await?;
            }
            Ok(())
        }
    }
}
