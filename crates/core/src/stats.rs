//! Document statistics shown in the status bar.

use regex::Regex;
use std::sync::LazyLock;

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[\s\S]*?```").expect("valid code block pattern"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]*`").expect("valid inline code pattern"));
static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*_\[\](){}|`~]").expect("valid markup pattern"));
static MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$+[^$]+\$+").expect("valid math pattern"));

/// Counts prose words in markdown, ignoring code, markup characters and
/// `$...$` math.
pub fn count_markdown_words(text: &str) -> usize {
    let text = CODE_BLOCK.replace_all(text, "");
    let text = INLINE_CODE.replace_all(&text, "");
    let text = MARKUP.replace_all(&text, " ");
    let text = MATH.replace_all(&text, "");
    text.split_whitespace().count()
}

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Human-readable size rounded to two decimals, always with at least one:
/// `1.0 KB`, `1.5 KB`, `5.25 MB`. Zero prints as `0 B`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0');
    let padding = if trimmed.ends_with('.') { "0" } else { "" };
    format!("{trimmed}{padding} {}", UNITS[unit])
}
