use msgs::ParticipantId;

/// Fan-out from the coordinator to every connection handler.
#[derive(Debug, Clone)]
pub enum BroadcastMsg {
    Word (String),
    Win (ParticipantId),
    Close,
}
