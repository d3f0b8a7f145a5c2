//! Request and response envelopes.
//!
//! A request is three frames, `[action][sender][payload]`, where the payload
//! is a JSON registration entry for register/remove and a JSON topic string
//! for find. A response is two frames, `[status][payload]`, where the status
//! is `SUCCESS` or an error text and the payload is a JSON array of entries
//! (empty frame = empty list).

use bytes::Bytes;

use super::action::Action;
use crate::domain::{RegistrationEntry, Role, Topic};
use crate::error::RegistrarError;

/// Status text of a successful reply.
pub const SUCCESS: &str = "SUCCESS";

/// Body of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    /// Registration to add or remove.
    Entry(RegistrationEntry),
    /// Topic to search for.
    Query(Topic),
}

/// Request envelope, built per call and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegRequest {
    /// Requested action.
    pub action: Action,
    /// Name of the requesting actor.
    pub sender: String,
    /// Entry or topic query.
    pub payload: RequestPayload,
}

impl RegRequest {
    /// Builds a register request. The entry's role is aligned with `role`.
    #[must_use]
    pub fn register(mut entry: RegistrationEntry, role: Role) -> Self {
        entry.role = role;
        Self {
            action: Action::Register(role),
            sender: entry.name.clone(),
            payload: RequestPayload::Entry(entry),
        }
    }

    /// Builds a remove request. The entry's role is aligned with `role`.
    #[must_use]
    pub fn remove(mut entry: RegistrationEntry, role: Role) -> Self {
        entry.role = role;
        Self {
            action: Action::Remove(role),
            sender: entry.name.clone(),
            payload: RequestPayload::Entry(entry),
        }
    }

    /// Builds a find request for `role` registrations matching `query`.
    #[must_use]
    pub fn find(sender: impl Into<String>, query: Topic, role: Role) -> Self {
        Self {
            action: Action::Find(role),
            sender: sender.into(),
            payload: RequestPayload::Query(query),
        }
    }

    /// Encodes the envelope into wire frames.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Protocol`] if the payload fails to serialize.
    pub fn to_frames(&self) -> Result<Vec<Bytes>, RegistrarError> {
        let payload = match &self.payload {
            RequestPayload::Entry(entry) => serde_json::to_vec(entry),
            RequestPayload::Query(topic) => serde_json::to_vec(topic),
        }
        .map_err(|e| RegistrarError::Protocol(format!("cannot encode payload: {e}")))?;

        Ok(vec![
            Bytes::from_static(self.action.as_str().as_bytes()),
            Bytes::from(self.sender.clone().into_bytes()),
            Bytes::from(payload),
        ])
    }

    /// Decodes an envelope from wire frames.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Protocol`] on a wrong frame count, an unknown
    /// action, or a payload that does not decode for that action.
    pub fn from_frames(frames: &[Bytes]) -> Result<Self, RegistrarError> {
        let [action, sender, payload] = frames else {
            return Err(RegistrarError::Protocol(format!(
                "request must have 3 frames, got {}",
                frames.len()
            )));
        };
        let action: Action = utf8(action, "action")?.parse()?;
        let sender = utf8(sender, "sender")?.to_string();

        let payload = if action.is_find() {
            let topic: Topic = serde_json::from_slice(payload)
                .map_err(|e| RegistrarError::Protocol(format!("invalid topic query: {e}")))?;
            RequestPayload::Query(topic)
        } else {
            let entry: RegistrationEntry = serde_json::from_slice(payload).map_err(|e| {
                RegistrarError::Protocol(format!("invalid registration entry: {e}"))
            })?;
            RequestPayload::Entry(entry)
        };

        Ok(Self {
            action,
            sender,
            payload,
        })
    }
}

/// Outcome reported by the registrar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    /// Request succeeded.
    Success,
    /// Request failed; the text is shown to the caller.
    Error(String),
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegResponse {
    /// Success or error text.
    pub status: ReplyStatus,
    /// Matching entries for find, empty otherwise.
    pub data: Vec<RegistrationEntry>,
}

impl RegResponse {
    /// Successful reply without data.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            status: ReplyStatus::Success,
            data: Vec::new(),
        }
    }

    /// Successful reply carrying `data`.
    #[must_use]
    pub const fn with_data(data: Vec<RegistrationEntry>) -> Self {
        Self {
            status: ReplyStatus::Success,
            data,
        }
    }

    /// Error reply.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error(message.into()),
            data: Vec::new(),
        }
    }

    /// Encodes the envelope into wire frames.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Protocol`] if the data fails to serialize.
    pub fn to_frames(&self) -> Result<Vec<Bytes>, RegistrarError> {
        let status = match &self.status {
            ReplyStatus::Success => Bytes::from_static(SUCCESS.as_bytes()),
            ReplyStatus::Error(text) => Bytes::from(text.clone().into_bytes()),
        };
        let data = serde_json::to_vec(&self.data)
            .map_err(|e| RegistrarError::Protocol(format!("cannot encode reply data: {e}")))?;
        Ok(vec![status, Bytes::from(data)])
    }

    /// Decodes an envelope from wire frames.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Protocol`] on a missing status frame or
    /// undecodable data.
    pub fn from_frames(frames: &[Bytes]) -> Result<Self, RegistrarError> {
        let Some((status, rest)) = frames.split_first() else {
            return Err(RegistrarError::Protocol("empty reply".to_string()));
        };
        let status = match utf8(status, "status")? {
            SUCCESS => ReplyStatus::Success,
            text => ReplyStatus::Error(text.to_string()),
        };
        let data = match rest.first() {
            Some(payload) if !payload.is_empty() => serde_json::from_slice(payload)
                .map_err(|e| RegistrarError::Protocol(format!("invalid reply data: {e}")))?,
            _ => Vec::new(),
        };
        Ok(Self { status, data })
    }
}

fn utf8<'a>(frame: &'a Bytes, what: &str) -> Result<&'a str, RegistrarError> {
    std::str::from_utf8(frame)
        .map_err(|_| RegistrarError::Protocol(format!("{what} frame is not valid UTF-8")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Endpoint;

    fn entry() -> RegistrationEntry {
        RegistrationEntry::new(
            "actor",
            Topic::new("d", "s", "t"),
            Endpoint::new("localhost", 7771),
            Role::Subscriber,
        )
    }

    #[test]
    fn register_aligns_role_and_sender() {
        let req = RegRequest::register(entry(), Role::Publisher);
        assert_eq!(req.action, Action::Register(Role::Publisher));
        assert_eq!(req.sender, "actor");
        let RequestPayload::Entry(e) = req.payload else {
            panic!("expected entry payload");
        };
        assert_eq!(e.role, Role::Publisher);
    }

    #[test]
    fn find_request_carries_topic() {
        let req = RegRequest::find("fe", Topic::any(), Role::Subscriber);
        let Ok(frames) = req.to_frames() else {
            panic!("encode failed");
        };
        assert_eq!(frames.get(2).map(|f| f.to_vec()), Some(b"\"*.*.*\"".to_vec()));
        let Ok(back) = RegRequest::from_frames(&frames) else {
            panic!("decode failed");
        };
        assert_eq!(back, req);
    }

    #[test]
    fn request_with_wrong_frame_count_is_rejected() {
        let frames = vec![Bytes::from_static(b"registerPublisher")];
        assert!(matches!(
            RegRequest::from_frames(&frames),
            Err(RegistrarError::Protocol(_))
        ));
    }

    #[test]
    fn register_with_garbage_payload_is_rejected() {
        let frames = vec![
            Bytes::from_static(b"registerPublisher"),
            Bytes::from_static(b"actor"),
            Bytes::from_static(b"{not json"),
        ];
        assert!(RegRequest::from_frames(&frames).is_err());
    }

    #[test]
    fn error_status_is_preserved() {
        let Ok(frames) = RegResponse::error("registration data missing").to_frames() else {
            panic!("encode failed");
        };
        let Ok(back) = RegResponse::from_frames(&frames) else {
            panic!("decode failed");
        };
        assert_eq!(
            back.status,
            ReplyStatus::Error("registration data missing".to_string())
        );
        assert!(back.data.is_empty());
    }

    #[test]
    fn missing_payload_frame_is_empty_list() {
        let frames = vec![Bytes::from_static(SUCCESS.as_bytes())];
        let Ok(resp) = RegResponse::from_frames(&frames) else {
            panic!("decode failed");
        };
        assert_eq!(resp, RegResponse::success());
    }
}
