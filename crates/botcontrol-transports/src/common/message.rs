//! Message types handed between caller threads and socket loops

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct RecordState {
    reply: Option<String>,
    serviced: bool,
}

/// One request and its eventual reply
///
/// Created by the submitting thread, completed exactly once by the client
/// loop, then read by whoever holds it.
#[derive(Debug)]
pub struct RequestRecord {
    payload: String,
    state: Mutex<RecordState>,
    serviced: Condvar,
}

impl RequestRecord {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            state: Mutex::new(RecordState::default()),
            serviced: Condvar::new(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn is_serviced(&self) -> bool {
        self.state.lock().serviced
    }

    /// Reply, if serviced and one arrived
    pub fn reply(&self) -> Option<String> {
        self.state.lock().reply.clone()
    }

    /// Store the reply and wake waiters
    ///
    /// Only the first call has any effect; returns whether it was this one.
    pub(crate) fn complete(&self, reply: Option<String>) -> bool {
        let mut state = self.state.lock();
        if state.serviced {
            return false;
        }
        state.reply = reply;
        state.serviced = true;
        drop(state);
        self.serviced.notify_all();
        true
    }

    /// Block until serviced and return the reply
    ///
    /// There is no timeout: a record dropped by a terminating loop is never
    /// serviced and this never returns. Use [`wait_timeout`](Self::wait_timeout)
    /// when the caller needs its own deadline.
    pub fn wait(&self) -> Option<String> {
        let mut state = self.state.lock();
        while !state.serviced {
            self.serviced.wait(&mut state);
        }
        state.reply.clone()
    }

    /// Block until serviced or `timeout` elapses
    ///
    /// `None` covers both "no reply yet" and "serviced without a reply";
    /// check [`is_serviced`](Self::is_serviced) to tell them apart.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.serviced {
            if self.serviced.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.reply.clone()
    }
}

/// A published message split into topic and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    pub topic: String,
    pub payload: String,
}

impl TopicMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Split `"<topic><whitespace><payload>"` on the first whitespace
    ///
    /// Both halves are trimmed. Returns `None` when there is no separator or
    /// the topic is empty.
    pub fn parse(message: &str) -> Option<Self> {
        let (topic, payload) = message.split_once(char::is_whitespace)?;
        let topic = topic.trim();
        if topic.is_empty() {
            return None;
        }
        Some(Self::new(topic, payload.trim()))
    }

    /// Wire form, `"<topic> <payload>"`
    pub fn encode(&self) -> String {
        format!("{} {}", self.topic, self.payload)
    }
}
