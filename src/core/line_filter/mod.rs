//! Body extraction: tag every source line once and keep only plain body lines.
//!
//! Known limitation: classification is lexical. A blocked token inside a string
//! literal or nested expression can drop a line that is not a platform call, a
//! comment marker inside a multi-line string drops that string line, and removing
//! the only statement of a block leaves the block empty. Lines are removed whole
//! and never rewritten; excluded lines are dropped without a placeholder.
//!
//! A dropped statement takes its continuation lines with it: lines joined by a
//! trailing backslash, and lines inside brackets it left open that are indented
//! past it or start by closing a bracket.

use crate::core::config::{FilterConfig, ImportsConfig};
use crate::core::error::PipelineError;
use crate::core::imports::{ends_with_continuation, paren_balance, ImportClassifier};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineTag {
    Import,
    Blank,
    Comment,
    Bootstrap,
    PlatformCall,
    Body,
}

impl LineTag {
    pub fn is_retained(&self) -> bool {
        matches!(self, LineTag::Body)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineTag::Import => "import",
            LineTag::Blank => "blank",
            LineTag::Comment => "comment",
            LineTag::Bootstrap => "bootstrap",
            LineTag::PlatformCall => "platform-call",
            LineTag::Body => "body",
        }
    }
}

impl fmt::Display for LineTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source line with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLine {
    /// 1-based line number in the extracted source.
    pub number: usize,
    pub text: String,
    pub tag: LineTag,
}

#[derive(Debug, Clone)]
pub struct LineFilter {
    imports: ImportClassifier,
    call_patterns: Vec<Regex>,
    blocked_calls: Vec<Regex>,
    bootstrap_patterns: Vec<Regex>,
    comment_prefixes: Vec<String>,
}

impl LineFilter {
    pub fn new(filter: &FilterConfig, imports: &ImportsConfig) -> Result<Self, PipelineError> {
        let call_patterns = compile_all(&filter.platform_call_patterns)?;
        let bootstrap_patterns = compile_all(&filter.bootstrap_patterns)?;
        let blocked_calls = imports
            .blocklist
            .iter()
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .map(blocked_call_pattern)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LineFilter {
            imports: ImportClassifier::new(),
            call_patterns,
            blocked_calls,
            bootstrap_patterns,
            comment_prefixes: filter.comment_prefixes.clone(),
        })
    }

    /// Tag every line of `source` in order.
    pub fn classify_lines(&self, source: &str) -> Vec<SourceLine> {
        let lines: Vec<&str> = source.lines().collect();
        let mut tags: Vec<Option<LineTag>> = vec![None; lines.len()];

        for span in self.imports.import_spans(&lines) {
            for tag in &mut tags[span.start..=span.end] {
                *tag = Some(LineTag::Import);
            }
        }

        let mut index = 0;
        while index < lines.len() {
            if tags[index].is_some() {
                index += 1;
                continue;
            }
            let tag = self.tag_for(lines[index]);
            tags[index] = Some(tag);
            if matches!(tag, LineTag::Bootstrap | LineTag::PlatformCall) {
                index = absorb_continuation(&lines, &mut tags, index, tag);
            }
            index += 1;
        }

        lines
            .iter()
            .zip(tags)
            .enumerate()
            .map(|(i, (text, tag))| SourceLine {
                number: i + 1,
                text: text.to_string(),
                tag: tag.unwrap_or(LineTag::Body),
            })
            .collect()
    }

    /// Retained body lines, verbatim and in source order.
    pub fn filter(&self, source: &str) -> Vec<String> {
        self.classify_lines(source)
            .into_iter()
            .filter(|line| line.tag.is_retained())
            .map(|line| line.text)
            .collect()
    }

    fn tag_for(&self, line: &str) -> LineTag {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return LineTag::Blank;
        }
        if self
            .comment_prefixes
            .iter()
            .any(|prefix| trimmed.starts_with(prefix.as_str()))
        {
            return LineTag::Comment;
        }
        if self.bootstrap_patterns.iter().any(|p| p.is_match(line)) {
            return LineTag::Bootstrap;
        }
        if self
            .call_patterns
            .iter()
            .chain(self.blocked_calls.iter())
            .any(|p| p.is_match(line))
        {
            return LineTag::PlatformCall;
        }
        LineTag::Body
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, PipelineError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| {
                PipelineError::Config(format!("invalid filter pattern '{}': {}", pattern, e))
            })
        })
        .collect()
}

/// `<token>.` or `<token>(`, case-insensitive, not preceded by an identifier character.
fn blocked_call_pattern(token: &str) -> Result<Regex, PipelineError> {
    let pattern = format!(r"(?:^|[^A-Za-z0-9_]){}\s*[.(]", regex::escape(token));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| PipelineError::Config(format!("invalid blocklist token '{}': {}", token, e)))
}

/// Tag the continuation lines of the dropped statement starting at `start` and
/// return the index of its last line.
fn absorb_continuation(
    lines: &[&str],
    tags: &mut [Option<LineTag>],
    start: usize,
    tag: LineTag,
) -> usize {
    let base_indent = indent_width(lines[start]);
    let mut depth = paren_balance(lines[start]);
    let mut end = start;

    while end + 1 < lines.len() && tags[end + 1].is_none() {
        let joined = ends_with_continuation(lines[end]);
        if depth <= 0 && !joined {
            break;
        }
        let next = lines[end + 1];
        if next.trim().is_empty() {
            break;
        }
        let closes_bracket = next.trim_start().starts_with(&[')', ']', '}'][..]);
        if !joined && !closes_bracket && indent_width(next) <= base_indent {
            break;
        }
        end += 1;
        depth += paren_balance(next);
        tags[end] = Some(tag);
    }
    end
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}
