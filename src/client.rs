//! The protocol driver: builds requests from session state, dispatches them
//! through the transport, and walks the state machine over the responses.
//!
//! Each entry point may run on its own task; network calls overlap freely.
//! Response interpretation and every session mutation happen under one
//! mutex, so transitions from concurrent calls cannot interleave and a stale
//! grant token can never overwrite a fresher one.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::protocol::event::{EventReceiver, EventSender, emit};
use crate::protocol::{FollowUp, ProtocolError, ProtocolEvent, ProtocolRequest, interpret};
use crate::session::{ProtocolState, Session};
use crate::transport::Transport;

/// Upper bound on requests issued per entry point, counting automatic
/// follow-ups. The longest legal chain is tag, token request, tag resend.
const MAX_CHAIN: usize = 3;

/// One operation the driver can issue. Three of these are also enqueued by
/// the driver itself as protocol follow-ups.
#[derive(Debug, Clone)]
enum Operation {
    Tag,
    RequestToken,
    Register,
    SubmitRegistration { key: String, pin: String },
}

struct Inner {
    session: Session,
    /// Station from the most recent tag attempt, reused verbatim when the
    /// driver resends the tag after authorization completes.
    last_station: Option<String>,
}

/// Client handle for one RadioTAG session. Cheap to clone; all clones share
/// the same session.
pub struct RadioTagClient<T: Transport> {
    transport: Arc<T>,
    inner: Arc<Mutex<Inner>>,
    events: EventSender,
}

impl<T: Transport> Clone for RadioTagClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            inner: Arc::clone(&self.inner),
            events: self.events.clone(),
        }
    }
}

impl<T: Transport> RadioTagClient<T> {
    /// Creates a driver with an empty session. The receiver carries the
    /// narration stream for the presentation layer.
    pub fn new(transport: T) -> (Self, EventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let client = Self {
            transport: Arc::new(transport),
            inner: Arc::new(Mutex::new(Inner {
                session: Session::new(),
                last_station: None,
            })),
            events,
        };
        (client, receiver)
    }

    /// Tags `station` at the current time. Anonymous clients are walked
    /// through the authorization exchange automatically and the tag is
    /// resent once it completes.
    pub async fn tag(&self, station: &str) -> Result<(), ProtocolError> {
        {
            let mut inner = self.inner.lock().await;
            inner.last_station = Some(station.to_string());
        }
        self.run(Operation::Tag).await
    }

    /// Exchanges the stored grant token for an auth token. Invoked
    /// automatically after a 401; also available to the caller.
    pub async fn request_token(&self) -> Result<(), ProtocolError> {
        self.run(Operation::RequestToken).await
    }

    /// Requests a registration key using the stored grant token.
    pub async fn register(&self) -> Result<(), ProtocolError> {
        self.run(Operation::Register).await
    }

    /// Completes registration with the key and the PIN the user entered in
    /// the web flow. Blocked until a registration key has been issued.
    pub async fn submit_registration(&self, key: &str, pin: &str) -> Result<(), ProtocolError> {
        {
            let inner = self.inner.lock().await;
            if !inner.session.registration_key_issued() {
                return Err(ProtocolError::RegistrationKeyNotIssued);
            }
        }
        self.run(Operation::SubmitRegistration {
            key: key.to_string(),
            pin: pin.to_string(),
        })
        .await
    }

    /// True once the server has granted the `can_register` scope.
    pub async fn can_register(&self) -> bool {
        self.inner.lock().await.session.registration_allowed()
    }

    /// True once a registration key has been issued.
    pub async fn can_submit_registration(&self) -> bool {
        self.inner.lock().await.session.registration_key_issued()
    }

    pub async fn state(&self) -> ProtocolState {
        self.inner.lock().await.session.state()
    }

    pub async fn auth_token(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .session
            .auth_token()
            .map(str::to_string)
    }

    async fn run(&self, mut operation: Operation) -> Result<(), ProtocolError> {
        for _ in 0..MAX_CHAIN {
            let request = self.build_request(&operation).await?;
            self.narrate_sent(&request);

            // The lock is not held across the network call; only the
            // interpretation step is serialized.
            let response = match self.transport.post(&request).await {
                Ok(response) => response,
                Err(err) => {
                    emit(&self.events, ProtocolEvent::Failed(err.to_string()));
                    return Err(err.into());
                }
            };

            let follow_up = {
                let mut inner = self.inner.lock().await;
                interpret(&mut inner.session, &response, &self.events)?
            };

            operation = match follow_up {
                None => return Ok(()),
                Some(FollowUp::RequestToken) => Operation::RequestToken,
                Some(FollowUp::ResendTag) => {
                    debug!("authorization complete, resending tag");
                    Operation::Tag
                }
            };
        }
        Err(ProtocolError::FollowUpOverflow(MAX_CHAIN))
    }

    async fn build_request(&self, operation: &Operation) -> Result<ProtocolRequest, ProtocolError> {
        let inner = self.inner.lock().await;
        match operation {
            Operation::Tag => {
                let station = inner.last_station.clone().unwrap_or_default();
                let mut request = ProtocolRequest::tag(&station, unix_now());
                if let Some(token) = inner.session.auth_token() {
                    request = request.with_auth_token(token);
                }
                Ok(request)
            }
            Operation::RequestToken => {
                let grant_token = inner
                    .session
                    .grant_token()
                    .ok_or(ProtocolError::MissingGrantToken)?;
                Ok(ProtocolRequest::request_token(grant_token))
            }
            Operation::Register => {
                let grant_token = inner
                    .session
                    .grant_token()
                    .ok_or(ProtocolError::MissingGrantToken)?;
                Ok(ProtocolRequest::register(grant_token))
            }
            Operation::SubmitRegistration { key, pin } => {
                let auth_token = inner
                    .session
                    .auth_token()
                    .ok_or(ProtocolError::MissingAuthToken)?;
                Ok(ProtocolRequest::submit_registration(key, pin, auth_token))
            }
        }
    }

    fn narrate_sent(&self, request: &ProtocolRequest) {
        emit(
            &self.events,
            ProtocolEvent::Sent(format!(">>> POST {}", request.endpoint().path())),
        );
        if let Some(token) = request.auth_token() {
            emit(
                &self.events,
                ProtocolEvent::Sent(format!(
                    "    header {}: {token}",
                    crate::protocol::AUTH_TOKEN_HEADER
                )),
            );
        }
        emit(
            &self.events,
            ProtocolEvent::Sent(format!("    body {}", request.encoded_body())),
        );
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
