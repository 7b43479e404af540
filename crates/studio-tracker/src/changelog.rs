//! Append-only free-text change log kept on projects and tasks

use chrono::{DateTime, FixedOffset};

use crate::format::format_timestamp;

/// Append a timestamped entry; earlier entries are never rewritten
pub fn append(log: &mut String, at: DateTime<FixedOffset>, entry: &str) {
    if !log.is_empty() {
        log.push('\n');
    }
    log.push_str(&format!("[{}] {}", format_timestamp(at), entry.trim()));
}

/// Describe a field change, e.g. `Status: A Fazer -> Concluído`
pub fn change(field: &str, from: &str, to: &str) -> String {
    format!("{}: {} -> {}", field, if from.is_empty() { "-" } else { from }, to)
}
