//! Per-session parser state: the schema registry, per-class instance
//! counters, and the open-channel table.

use std::collections::HashMap;

use crate::schema::{ClassKey, Registry};

#[derive(Debug, Clone)]
pub struct ChannelBinding {
    pub class_key: ClassKey,
    pub instance_name: String,
}

pub struct ParserState {
    pub registry: Registry,
    pub instance_counts: HashMap<String, u32>,
    pub channels: HashMap<u16, ChannelBinding>,
    /// Re-encodes and compares after each value decode; see
    /// `value::decode_value` callers in `object.rs`. Off by default, the
    /// same way the reference decoder treated it as a debugging aid rather
    /// than always-on behavior.
    pub debug_roundtrip: bool,
}

impl ParserState {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            instance_counts: HashMap::new(),
            channels: HashMap::new(),
            debug_roundtrip: false,
        }
    }

    pub fn with_debug_roundtrip(mut self, enabled: bool) -> Self {
        self.debug_roundtrip = enabled;
        self
    }

    /// Binds `channel` to the next sequence number for `class_name`,
    /// returning the instance name assigned (`"<class>_<n>"`, starting at 0).
    pub fn bind_channel(&mut self, channel: u16, class_key: ClassKey, class_name: &str) -> String {
        let next = self
            .instance_counts
            .get(class_name)
            .map(|n| n + 1)
            .unwrap_or(0);
        self.instance_counts.insert(class_name.to_string(), next);
        let instance_name = format!("{class_name}_{next}");
        tracing::debug!(channel, class = class_name, instance = %instance_name, "channel bound");
        self.channels.insert(
            channel,
            ChannelBinding {
                class_key,
                instance_name: instance_name.clone(),
            },
        );
        instance_name
    }

    pub fn close_channel(&mut self, channel: u16) {
        if self.channels.remove(&channel).is_some() {
            tracing::debug!(channel, "channel destroyed");
        }
    }
}

impl Default for ParserState {
    fn default() -> Self {
        Self::new()
    }
}
