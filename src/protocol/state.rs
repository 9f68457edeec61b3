use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::core::{Error, ErrorKind, Result};
use super::codec;
use super::packet::Packet;

/// Represents the current state of a single request/response exchange
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeState {
    /// Nothing built yet
    Idle,

    /// Request packet encoded, not yet handed to the transport
    AwaitingSend {
        /// Encoded request
        request: Bytes,
    },

    /// Request sent, waiting for the server
    AwaitingReply {
        /// Local wall-clock instant taken just before sending (T1)
        sent_at: DateTime<Utc>,
    },

    /// Reply received and parsed
    Decoded {
        /// Decoded server reply
        reply: Packet,
        /// Local send instant (T1)
        sent_at: DateTime<Utc>,
        /// Local receive instant (T4)
        received_at: DateTime<Utc>,
    },

    /// Exchange aborted
    Failed {
        /// Kind of the error that ended the exchange
        kind: ErrorKind,
        /// Rendered cause
        cause: String,
    },
}

impl ExchangeState {
    /// Human-readable name of the state
    pub fn name(&self) -> &'static str {
        match self {
            ExchangeState::Idle => "Idle",
            ExchangeState::AwaitingSend { .. } => "AwaitingSend",
            ExchangeState::AwaitingReply { .. } => "AwaitingReply",
            ExchangeState::Decoded { .. } => "Decoded",
            ExchangeState::Failed { .. } => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExchangeState::Decoded { .. } | ExchangeState::Failed { .. })
    }
}

/// Completed exchange: the decoded reply plus the local send/receive instants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completed {
    pub reply: Packet,
    pub sent_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

/// State machine driving one NTP request. A new instance is used per call.
#[derive(Debug)]
pub struct Exchange {
    state: ExchangeState,
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

impl Exchange {
    /// Creates an exchange in the `Idle` state
    pub fn new() -> Self {
        Exchange {
            state: ExchangeState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> &ExchangeState {
        &self.state
    }

    /// Idle -> AwaitingSend. Returns the encoded request.
    pub fn prepare(&mut self, version: u8) -> Result<Bytes> {
        if !matches!(self.state, ExchangeState::Idle) {
            return Err(self.illegal("prepare"));
        }
        match codec::encode_request(version) {
            Ok(request) => {
                self.state = ExchangeState::AwaitingSend {
                    request: request.clone(),
                };
                Ok(request)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// AwaitingSend -> AwaitingReply, once the request bytes are handed off
    pub fn sent(&mut self, sent_at: DateTime<Utc>) -> Result<()> {
        if !matches!(self.state, ExchangeState::AwaitingSend { .. }) {
            return Err(self.illegal("sent"));
        }
        self.state = ExchangeState::AwaitingReply { sent_at };
        Ok(())
    }

    /// AwaitingReply -> Decoded, or Failed when the reply does not parse
    pub fn received(&mut self, datagram: &[u8], received_at: DateTime<Utc>) -> Result<Completed> {
        let sent_at = match self.state {
            ExchangeState::AwaitingReply { sent_at } => sent_at,
            _ => return Err(self.illegal("received")),
        };
        match codec::decode_reply(datagram) {
            Ok(reply) => {
                self.state = ExchangeState::Decoded {
                    reply,
                    sent_at,
                    received_at,
                };
                Ok(Completed {
                    reply,
                    sent_at,
                    received_at,
                })
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Moves to Failed, recording the cause, and hands the error back.
    /// A terminal state is left untouched.
    pub fn fail(&mut self, error: Error) -> Error {
        if !self.state.is_terminal() {
            self.state = ExchangeState::Failed {
                kind: error.kind(),
                cause: error.to_string(),
            };
        }
        error
    }

    fn illegal(&mut self, event: &str) -> Error {
        let err = Error::invalid_state(format!("{} in state {}", event, self.state.name()));
        self.fail(err)
    }
}
