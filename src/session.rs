//! Mutable protocol state for one RadioTAG client.
//!
//! The session lives for the process lifetime, starts empty, and is mutated
//! exclusively by the protocol driver while it interprets responses. Nothing
//! here is persisted.

use std::fmt;

/// Where the client currently sits in the pairing flow, derived from the
/// tokens and flags it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Anonymous,
    AwaitingAuthorization,
    CanRegister,
    RegistrationPending,
    Authorized,
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolState::Anonymous => "anonymous",
            ProtocolState::AwaitingAuthorization => "awaiting_authorization",
            ProtocolState::CanRegister => "can_register",
            ProtocolState::RegistrationPending => "registration_pending",
            ProtocolState::Authorized => "authorized",
        };
        f.write_str(name)
    }
}

/// Token state for one client.
#[derive(Debug, Default)]
pub struct Session {
    auth_token: Option<String>,
    grant_token: Option<String>,
    pending_tag_retry: bool,
    registration_allowed: bool,
    registration_key_issued: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// The stored grant token. Reading does not clear it: the same token may
    /// be spent on both the token-request and the register step, and the
    /// server decides when it stops being honoured.
    pub fn grant_token(&self) -> Option<&str> {
        self.grant_token.as_deref()
    }

    pub fn set_auth_token(&mut self, token: impl Into<String>) {
        self.auth_token = Some(token.into());
    }

    /// Stores a grant token, replacing any previous one. Last value wins.
    pub fn set_grant_token(&mut self, token: impl Into<String>) {
        self.grant_token = Some(token.into());
    }

    pub fn mark_pending_tag_retry(&mut self) {
        self.pending_tag_retry = true;
    }

    /// Read-and-clear. The retry fires at most once per authorization round,
    /// so there is exactly one consumer of this flag.
    pub fn take_pending_tag_retry(&mut self) -> bool {
        std::mem::take(&mut self.pending_tag_retry)
    }

    pub fn pending_tag_retry(&self) -> bool {
        self.pending_tag_retry
    }

    pub fn allow_registration(&mut self) {
        self.registration_allowed = true;
    }

    pub fn registration_allowed(&self) -> bool {
        self.registration_allowed
    }

    pub fn mark_registration_key_issued(&mut self) {
        self.registration_key_issued = true;
    }

    pub fn registration_key_issued(&self) -> bool {
        self.registration_key_issued
    }

    pub fn state(&self) -> ProtocolState {
        if self.auth_token.is_some() {
            ProtocolState::Authorized
        } else if self.registration_key_issued {
            ProtocolState::RegistrationPending
        } else if self.registration_allowed {
            ProtocolState::CanRegister
        } else if self.pending_tag_retry {
            ProtocolState::AwaitingAuthorization
        } else {
            ProtocolState::Anonymous
        }
    }
}
