use chrono::{DateTime, TimeDelta, Utc};

use crate::protocol::Completed;

/// The four instants captured around one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    /// Local instant just before sending (T1)
    pub t1: DateTime<Utc>,
    /// Server receive timestamp (T2)
    pub t2: DateTime<Utc>,
    /// Server transmit timestamp (T3)
    pub t3: DateTime<Utc>,
    /// Local instant just after the reply arrived (T4)
    pub t4: DateTime<Utc>,
}

impl From<&Completed> for Timestamps {
    fn from(exchange: &Completed) -> Self {
        Timestamps {
            t1: exchange.sent_at,
            t2: exchange.reply.receive_timestamp.to_datetime(),
            t3: exchange.reply.transmit_timestamp.to_datetime(),
            t4: exchange.received_at,
        }
    }
}

/// Delay and offset derived from one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetEstimate {
    /// Round-trip delay less server processing: (T4 - T1) - (T3 - T2)
    pub delay: TimeDelta,
    /// One-way network delay, half the round trip
    pub network_delay: TimeDelta,
    /// (T2 - T1) - network_delay; positive when the local clock is behind
    pub offset: TimeDelta,
}

impl OffsetEstimate {
    /// Computes the estimate assuming both legs of the round trip take equally long
    pub fn compute(ts: &Timestamps) -> Self {
        let delay = (ts.t4 - ts.t1) - (ts.t3 - ts.t2);
        let network_delay = delay / 2;
        let offset = (ts.t2 - ts.t1) - network_delay;
        OffsetEstimate {
            delay,
            network_delay,
            offset,
        }
    }
}
