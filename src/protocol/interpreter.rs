//! Response interpretation: the protocol state machine.
//!
//! Transitions are driven purely by (status code, header presence) pairs,
//! independent of which operation produced the response. That lets one
//! interpreter serve all four endpoints, exactly as the servers overload the
//! status codes: a 204 means "authorized" when it carries an auth token and
//! "registration key issued" when it carries the key/url pair instead.

use tracing::{debug, warn};

use super::event::{EventSender, emit};
use super::{
    ACCOUNT_NAME_HEADER, AUTH_TOKEN_HEADER, GRANT_SCOPE_CAN_REGISTER, GRANT_SCOPE_HEADER,
    GRANT_TOKEN_HEADER, ProtocolError, ProtocolEvent, ProtocolResponse, REGISTRATION_KEY_HEADER,
    REGISTRATION_URL_HEADER,
};
use crate::session::Session;

/// The operation the driver must issue next. At most one per response, which
/// bounds the automatic chain: a 401 leads to a token request, a completed
/// authorization leads to at most one tag resend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    RequestToken,
    ResendTag,
}

/// Interprets one response, mutating the session and narrating what happened.
///
/// Returns the follow-up operation the driver should issue, if any.
/// Transport problems never reach this function, so the error cases here are
/// protocol violations and unexpected statuses, both of which have already
/// emitted their `Failed` event when returned.
pub fn interpret(
    session: &mut Session,
    response: &ProtocolResponse,
    events: &EventSender,
) -> Result<Option<FollowUp>, ProtocolError> {
    match response.status() {
        200 | 201 => interpret_success(session, response, events),
        401 => interpret_unauthorized(session, response, events),
        204 => interpret_no_content(session, response, events),
        status => {
            warn!(status, "response status has no protocol meaning");
            for (name, value) in response.headers() {
                debug!("    {name}: {value}");
            }
            emit(
                events,
                ProtocolEvent::Failed(format!(
                    "unexpected status {status}: {}",
                    response.body()
                )),
            );
            Err(ProtocolError::UnexpectedStatus { status })
        }
    }
}

/// 200/201: a grant token (possibly with the `can_register` scope) or, for
/// an already registered client, a fresh auth token. Grant token takes
/// precedence if both somehow appear.
fn interpret_success(
    session: &mut Session,
    response: &ProtocolResponse,
    events: &EventSender,
) -> Result<Option<FollowUp>, ProtocolError> {
    if let Some(grant_token) = response.header(GRANT_TOKEN_HEADER) {
        session.set_grant_token(grant_token);
        emit(
            events,
            ProtocolEvent::Received(format!("{GRANT_TOKEN_HEADER}: {grant_token}")),
        );
        if !response.body().is_empty() {
            emit(events, ProtocolEvent::Received(response.body().to_string()));
        }
        if response.header(GRANT_SCOPE_HEADER) == Some(GRANT_SCOPE_CAN_REGISTER) {
            session.allow_registration();
            emit(
                events,
                ProtocolEvent::StateChanged {
                    field: "can_register",
                    value: "true".to_string(),
                },
            );
        }
        return Ok(None);
    }

    if let Some(auth_token) = response.header(AUTH_TOKEN_HEADER) {
        session.set_auth_token(auth_token);
        emit(
            events,
            ProtocolEvent::Received(format!("{AUTH_TOKEN_HEADER}: {auth_token}")),
        );
        if let Some(account) = response.header(ACCOUNT_NAME_HEADER) {
            emit(
                events,
                ProtocolEvent::Received(format!("{ACCOUNT_NAME_HEADER}: {account}")),
            );
        }
        return Ok(None);
    }

    // A well-formed success the protocol gives no meaning to. Narrate and
    // stop; no transition.
    debug!(status = response.status(), "success response with no token header");
    emit(
        events,
        ProtocolEvent::Received(format!(
            "status {} with no token header: {}",
            response.status(),
            response.body()
        )),
    );
    Ok(None)
}

/// 401: the server demands authorization before it will accept the tag. The
/// grant token header is mandatory on this path.
fn interpret_unauthorized(
    session: &mut Session,
    response: &ProtocolResponse,
    events: &EventSender,
) -> Result<Option<FollowUp>, ProtocolError> {
    let Some(grant_token) = response.header(GRANT_TOKEN_HEADER) else {
        let detail = format!(
            "401 without a {GRANT_TOKEN_HEADER} header; headers were {:?}",
            response.headers()
        );
        emit(events, ProtocolEvent::Failed(detail.clone()));
        return Err(ProtocolError::Violation(detail));
    };

    debug!("must request token");
    session.set_grant_token(grant_token);
    session.mark_pending_tag_retry();
    emit(
        events,
        ProtocolEvent::Received(format!(
            "must request token; {GRANT_TOKEN_HEADER}: {grant_token}"
        )),
    );
    Ok(Some(FollowUp::RequestToken))
}

/// 204: either "authorization complete" (auth token header) or "registration
/// key issued" (key and url headers). Auth token is checked first.
fn interpret_no_content(
    session: &mut Session,
    response: &ProtocolResponse,
    events: &EventSender,
) -> Result<Option<FollowUp>, ProtocolError> {
    if let Some(auth_token) = response.header(AUTH_TOKEN_HEADER) {
        debug!("auth token returned");
        session.set_auth_token(auth_token);
        emit(
            events,
            ProtocolEvent::Received(format!("{AUTH_TOKEN_HEADER}: {auth_token}")),
        );
        if let Some(account) = response.header(ACCOUNT_NAME_HEADER) {
            emit(events, ProtocolEvent::Received(format!("hello {account}")));
        }
        if session.take_pending_tag_retry() {
            debug!("resending tag");
            return Ok(Some(FollowUp::ResendTag));
        }
        return Ok(None);
    }

    if let (Some(key), Some(url)) = (
        response.header(REGISTRATION_KEY_HEADER),
        response.header(REGISTRATION_URL_HEADER),
    ) {
        debug!("registration key returned");
        session.mark_registration_key_issued();
        emit(
            events,
            ProtocolEvent::StateChanged {
                field: "registration_key",
                value: key.to_string(),
            },
        );
        emit(
            events,
            ProtocolEvent::Received(format!(
                "{REGISTRATION_KEY_HEADER}: {key}; {REGISTRATION_URL_HEADER}: {url}"
            )),
        );
        return Ok(None);
    }

    let detail = format!(
        "204 carrying neither an auth token nor a registration key/url pair; headers were {:?}",
        response.headers()
    );
    emit(events, ProtocolEvent::Failed(detail.clone()));
    Err(ProtocolError::Violation(detail))
}
