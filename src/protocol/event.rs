use tokio::sync::mpsc;

/// Narration emitted to the presentation layer while the driver works.
/// Append-only records; nothing here feeds back into the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// A request (or part of one) went out.
    Sent(String),
    /// Something meaningful came back.
    Received(String),
    /// A session field the presentation layer may care about changed.
    StateChanged {
        field: &'static str,
        value: String,
    },
    /// The in-flight call failed. Terminal for that call only.
    Failed(String),
}

pub type EventSender = mpsc::UnboundedSender<ProtocolEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ProtocolEvent>;

/// Sends without caring whether anyone still listens. A presentation layer
/// that dropped its receiver must not stall the protocol.
pub(crate) fn emit(events: &EventSender, event: ProtocolEvent) {
    let _ = events.send(event);
}
