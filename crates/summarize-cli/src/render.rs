//! TTY rendering helpers (§6): OSC-9;4 progress reporting for supporting
//! terminals (Windows Terminal, ConEmu) and OSC-8 hyperlinks when
//! rendering markdown links to a terminal that isn't piped.

use regex::Regex;
use std::sync::OnceLock;

/// Strip control-sequence introducers, `]`, and surrounding whitespace
/// from a progress label before it goes inside an escape sequence — an
/// unsanitized label could otherwise inject its own OSC payload.
fn sanitize_label(label: &str) -> String {
    label.chars().filter(|c| *c != '\u{1b}' && *c != ']').collect::<String>().trim().to_string()
}

pub fn osc94_indeterminate(label: &str) -> String {
    format!("\x1b]9;4;3;;{}\x1b\\", sanitize_label(label))
}

pub fn osc94_progress(percent: u8, label: &str) -> String {
    format!("\x1b]9;4;1;{};{}\x1b\\", percent.min(100), sanitize_label(label))
}

pub fn osc94_clear(label: &str) -> String {
    format!("\x1b]9;4;0;0;{}\x1b\\", sanitize_label(label))
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").unwrap())
}

/// Rewrite `[text](url)` markdown links into OSC-8 hyperlinks when writing
/// to a TTY; on a non-TTY (piped/redirected output) leaves markdown as-is
/// since the escape sequences would just be noise in a file.
pub fn render_markdown(content: &str, is_tty: bool) -> String {
    if !is_tty {
        return content.to_string();
    }
    markdown_link_re()
        .replace_all(content, |caps: &regex::Captures| format!("\x1b]8;;{}\x07{}\x1b]8;;\x07", &caps[2], &caps[1]))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_escape_and_bracket_characters() {
        let label = sanitize_label("\x1b]evil  ");
        assert_eq!(label, "evil");
    }

    #[test]
    fn renders_osc8_only_on_tty() {
        let md = "see [docs](https://example.com/x)";
        let rendered = render_markdown(md, true);
        assert!(rendered.contains("\x1b]8;;https://example.com/x\x07docs\x1b]8;;\x07"));
        assert_eq!(render_markdown(md, false), md);
    }
}
