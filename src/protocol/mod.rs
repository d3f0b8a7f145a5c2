//! Registration/discovery wire protocol.
//!
//! Envelopes ([`RegRequest`], [`RegResponse`]) are encoded to ordered
//! frames, and frames travel as one multipart message on a TCP stream
//! (see [`frame`]).

pub mod action;
pub mod frame;
pub mod message;

pub use action::Action;
pub use message::{RegRequest, RegResponse, ReplyStatus, RequestPayload, SUCCESS};
