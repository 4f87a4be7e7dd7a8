use chrono::Utc;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Milliseconds since the unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Hands out time-derived message ids that never repeat or go backwards,
/// even when two messages are created within the same millisecond.
#[derive(Debug, Clone, Default)]
pub struct MessageIdGen {
    last: i64,
}

impl MessageIdGen {
    /// Continue after the highest id already present in a chat log
    pub fn starting_after(last: i64) -> Self {
        Self { last }
    }

    pub fn next_id(&mut self) -> i64 {
        self.next_id_at(now_millis())
    }

    pub fn next_id_at(&mut self, now_ms: i64) -> i64 {
        self.last = now_ms.max(self.last.saturating_add(1));
        self.last
    }
}

/// Cut a string to at most `max_width` terminal columns, marking the cut with `…`
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
