//! `commit-msg-format`: structural rules for commit messages.
//!
//! Comment lines (starting with `#`) are ignored, and so is everything after
//! the scissors line `git commit --verbose` inserts above the diff.

/// Marker line git places above the diff in verbose commit messages.
const SCISSORS: &str = "------------------------ >8 ------------------------";

/// Width of the excerpt quoted for an over-long line.
const EXCERPT_WIDTH: usize = 15;

/// Options for [`problems`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Limit for the first line; falls back to `max_line_length`.
    pub max_first_line_length: Option<usize>,
    /// Limit for every line.
    pub max_line_length: Option<usize>,
    /// First line must start with an uppercase letter.
    pub require_capitalized: bool,
}

/// Returns the lines git will keep, numbered from 1.
fn message_lines(text: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().starts_with('#') {
            let mut rest = line.chars();
            rest.next();
            if rest.as_str().trim_start() == SCISSORS {
                break;
            }
            continue;
        }
        lines.push((index + 1, line));
    }
    lines
}

/// Returns every problem with the commit message `text`, one per line of
/// output, in the order they are found.
#[must_use]
pub fn problems(text: &str, options: &FormatOptions) -> Vec<String> {
    let lines = message_lines(text);

    let Some(((_, first), rest)) = lines.split_first() else {
        return vec!["commit message is empty".to_string()];
    };
    if lines.iter().all(|(_, line)| line.trim().is_empty()) {
        return vec!["commit message is empty".to_string()];
    }

    let mut problems = Vec::new();

    if first.is_empty() {
        problems.push("first line should not be blank".to_string());
    }

    if first.starts_with(char::is_whitespace) {
        problems.push("first line should not start with whitespace".to_string());
    }

    if rest.first().is_some_and(|(_, line)| !line.is_empty()) {
        problems.push("should be a blank line after first line".to_string());
    }

    if let Some(max) = options.max_first_line_length.or(options.max_line_length) {
        problems.extend(too_long(1, first, max));
    }

    if let Some(max) = options.max_line_length {
        problems.extend(rest.iter().filter_map(|(n, line)| too_long(*n, line, max)));
    }

    if options.require_capitalized && first.starts_with(char::is_lowercase) {
        problems.push("first line should be capitalized".to_string());
    }

    problems
}

fn too_long(number: usize, line: &str, max: usize) -> Option<String> {
    let len = line.chars().count();
    (len > max).then(|| {
        format!(
            "line {number} too long: len={len}, max={max}: {}",
            excerpt(line, EXCERPT_WIDTH)
        )
    })
}

/// Collapses whitespace and cuts `line` at a word boundary so that, with a
/// trailing `...`, it fits in `width` characters.
fn excerpt(line: &str, width: usize) -> String {
    let words: Vec<&str> = line.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(3);
    let mut kept = String::new();
    for word in words {
        let extra = if kept.is_empty() { 0 } else { 1 };
        if kept.chars().count() + extra + word.chars().count() > budget {
            break;
        }
        if extra == 1 {
            kept.push(' ');
        }
        kept.push_str(word);
    }
    kept.push_str("...");
    kept
}
