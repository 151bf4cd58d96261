/// A message that does not fit the wire protocol.
///
/// Never fatal: the coordinator logs it and treats the response as a
/// negative answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("message is not valid utf-8")]
    InvalidUtf8,
    #[error("empty message")]
    Empty,
    #[error("unrecognized token: {0:?}")]
    UnrecognizedToken(String),
}
