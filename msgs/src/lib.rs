pub mod coordinator_msg;
pub mod dequeue;
pub mod framing;
pub mod participant_msg;
pub mod violation;

/// Stable id handed out by the coordinator in accept order.
pub type ParticipantId = u32;

pub const WIN_TOKEN: &str = "WIN";
pub const SCORED_TOKEN: &str = "SCORED";
