//! Routing subjects (`{service}.{resource}.{action}`) for events published by
//! the buffer engine.

pub const BUFFER_CALCULATED: &str = "ddmrp.buffer.calculated";
pub const BUFFER_STATUS_CHANGED: &str = "ddmrp.buffer.status_changed";
pub const BUFFER_ALERT_TRIGGERED: &str = "ddmrp.buffer.alert_triggered";

pub const FAD_CREATED: &str = "ddmrp.fad.created";
pub const FAD_UPDATED: &str = "ddmrp.fad.updated";
pub const FAD_DELETED: &str = "ddmrp.fad.deleted";

pub const ADU_CALCULATED: &str = "ddmrp.adu.calculated";

/// Wildcard subject matching every engine event.
pub const ALL_DDMRP: &str = "ddmrp.>";

/// NATS-style subject match: `*` matches one token, a trailing `>` matches the rest.
pub fn matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
