//! Text chapter formats produced by the engine
//!
//! Two inputs are understood: the `ffmetadata` dump (`[CHAPTER]` sections
//! with `START`, `TIMEBASE` and `title` keys) and the human-readable input
//! summary ffmpeg prints to its log (`Chapter #0:1: start 12.000000, ...`).

use super::types::{fallback_title, Chapter};
use regex::Regex;
use std::sync::OnceLock;

const CHAPTER_SECTION: &str = "[CHAPTER]";

/// Keys collected for the `[CHAPTER]` block being read
#[derive(Default)]
struct PendingChapter {
    start: Option<i64>,
    title: Option<String>,
    timebase: Option<(i64, i64)>,
}

impl PendingChapter {
    fn finish(self, position: usize) -> Option<Chapter> {
        let start = self.start?;
        let start_seconds = match self.timebase {
            Some((num, den)) => (start as f64 * num as f64) / den as f64,
            // No timebase: raw units are milliseconds
            None => start as f64 / 1000.0,
        };
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback_title(position));
        Some(Chapter::new(title, start_seconds))
    }
}

/// Parse a `num/den` timebase; zero or malformed values yield `None`
pub fn parse_timebase(value: &str) -> Option<(i64, i64)> {
    let (num, den) = value.trim().split_once('/')?;
    let num: i64 = num.trim().parse().ok()?;
    let den: i64 = den.trim().parse().ok()?;
    (num != 0 && den != 0).then_some((num, den))
}

/// Undo ffmetadata escaping (`\=`, `\;`, `\#`, `\\`)
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Split `key=value` at the first unescaped `=`
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '=' if !escaped => return Some((&line[..i], &line[i + 1..])),
            _ => escaped = false,
        }
    }
    None
}

/// Parse an `ffmetadata` dump into chapters (unsorted, unnumbered)
pub fn parse_ffmetadata(text: &str) -> Vec<Chapter> {
    let mut chapters = Vec::new();
    let mut pending: Option<PendingChapter> = None;
    let mut blocks = 0usize;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            // Any section header closes the current chapter block
            if let Some(done) = pending.take() {
                chapters.extend(done.finish(blocks));
            }
            if line.eq_ignore_ascii_case(CHAPTER_SECTION) {
                blocks += 1;
                pending = Some(PendingChapter::default());
            }
            continue;
        }

        let Some(current) = pending.as_mut() else {
            continue;
        };
        let Some((key, value)) = split_key_value(line) else {
            continue;
        };

        match key.trim().to_ascii_lowercase().as_str() {
            "start" => current.start = value.trim().parse().ok(),
            "timebase" => current.timebase = parse_timebase(value),
            "title" => current.title = Some(unescape(value.trim())),
            _ => {}
        }
    }

    if let Some(done) = pending.take() {
        chapters.extend(done.finish(blocks));
    }

    chapters
}

fn chapter_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Chapter #[\d:.]+:.*?\bstart\s+(-?\d+(?:\.\d+)?)")
            .expect("valid chapter regex")
    })
}

fn title_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*title\s*:\s?(.*)$").expect("valid title regex"))
}

/// Parse chapter lines out of an ffmpeg input summary
///
/// Each `Chapter #n: ... start <secs>` line is paired with the first `title:`
/// line within the next `lookahead` lines, stopping early at the next chapter.
pub fn parse_chapter_log(log: &str, lookahead: usize) -> Vec<Chapter> {
    let lines: Vec<&str> = log.lines().collect();
    let mut chapters = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = chapter_line_re().captures(line) else {
            continue;
        };
        let Ok(start_seconds) = caps[1].parse::<f64>() else {
            continue;
        };

        let title = lines
            .iter()
            .skip(i + 1)
            .take(lookahead)
            .take_while(|next| !chapter_line_re().is_match(next))
            .find_map(|next| title_line_re().captures(next))
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback_title(chapters.len() + 1));

        chapters.push(Chapter::new(title, start_seconds));
    }

    chapters
}
