use crate::transport::TransportError;

/// Protocol driver errors. All of these are terminal for the in-flight call
/// only; they never abort the process and never corrupt session state held
/// by a concurrent call.
#[derive(thiserror::Error, Debug)]
pub enum ProtocolError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server broke the header contract (e.g. a 401 without a grant
    /// token). Not retryable; the flow must restart from the beginning.
    #[error("protocol violation: {0}")]
    Violation(String),

    /// A status code with no protocol meaning.
    #[error("server returned status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("no grant token held; complete the previous authorization step first")]
    MissingGrantToken,

    #[error("no auth token held; registration submission requires prior authorization")]
    MissingAuthToken,

    #[error("no registration key has been issued yet")]
    RegistrationKeyNotIssued,

    /// The automatic follow-up chain ran past the protocol's bound.
    #[error("follow-up chain exceeded {0} requests")]
    FollowUpOverflow(usize),
}
