//! The bounded message window.
//!
//! Overflow evicts the oldest entries first, with one exception: the system
//! message seeded at creation is re-anchored — it never ages out, because
//! losing the system prompt mid-run silently changes agent behavior in long
//! sessions. Eviction applies to the oldest non-system entries.

use mindloop_core::message::{Message, Role};
use tracing::debug;

/// Bounded, ordered message history for a single session.
///
/// Two write paths exist: `append` for normal insertion, and `replace` for
/// the wholesale context rebuild the execution stage performs after a tool
/// round. `replace` is a versioned snapshot swap — every message in the new
/// transcript is re-inserted and receives a fresh ordinal, so ordinals stay
/// monotonic across the session's whole lifetime.
#[derive(Debug, Clone)]
pub struct SessionMemory {
    messages: Vec<Message>,
    max_messages: usize,
    next_ordinal: u64,
    version: u64,
}

impl SessionMemory {
    /// Create a window seeded with the agent's system prompt.
    pub fn new(system_prompt: impl Into<String>, max_messages: usize) -> Self {
        let mut memory = Self {
            messages: Vec::new(),
            max_messages: max_messages.max(1),
            next_ordinal: 0,
            version: 0,
        };
        memory.push(Message::system(system_prompt));
        memory
    }

    /// Append a message, evicting the oldest non-system entries on overflow.
    pub fn append(&mut self, message: Message) {
        self.push(message);
        self.enforce_bound();
    }

    /// Replace the whole window with a new transcript.
    ///
    /// Used by the execution stage: prior context + the assistant's
    /// tool-call message + the aggregated tool-response message. The bound
    /// is enforced on the result like any other write.
    pub fn replace(&mut self, transcript: Vec<Message>) {
        self.messages.clear();
        for message in transcript {
            self.push(message);
        }
        self.enforce_bound();
        self.version += 1;
        debug!(
            version = self.version,
            len = self.messages.len(),
            "Session memory replaced"
        );
    }

    /// An owned copy of the current window, in order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Drop everything except the system anchor.
    pub fn clear(&mut self) {
        self.messages.retain(|m| m.role == Role::System);
        self.version += 1;
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// How many times the window has been rebuilt via `replace` or `clear`.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn push(&mut self, mut message: Message) {
        message.ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.messages.push(message);
    }

    fn enforce_bound(&mut self) {
        while self.messages.len() > self.max_messages {
            let Some(idx) = self.messages.iter().position(|m| m.role != Role::System) else {
                break;
            };
            let evicted = self.messages.remove(idx);
            debug!(ordinal = evicted.ordinal, "Evicted oldest message from window");
        }
    }
}
