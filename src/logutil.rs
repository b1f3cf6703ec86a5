//! Logging helpers for player-supplied identifiers (character names, node ids)
//! so a crafted name cannot split or flood a log line.

use std::fmt::Write;

/// Longest identifier preview kept in a log line.
const MAX_PREVIEW: usize = 64;

/// Escape an identifier for single-line logging:
/// - backslash, `\n`, `\r` and `\t` become two-character escapes
/// - other control characters become `\xNN`
/// - anything past [`MAX_PREVIEW`] characters is cut with an ellipsis
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_log;

    #[test]
    fn plain_ids_pass_through() {
        assert_eq!(escape_log("ore_sense"), "ore_sense");
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_log("a\nb\tc\u{7}"), "a\\nb\\tc\\x07");
    }

    #[test]
    fn truncates_long_names() {
        let long = "x".repeat(100);
        let escaped = escape_log(&long);
        assert_eq!(escaped.chars().count(), 65);
        assert!(escaped.ends_with('…'));
    }
}
