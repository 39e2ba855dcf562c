/// Failures at the boundary between the controller and its collaborators.
///
/// `Display` output is user-facing: a failed send shows it in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("event channel closed")]
    ChannelClosed,
}
