//! Import hoisting: find `import`/`from` declarations in extracted source and split
//! them into safe and platform-bound sets.
//!
//! Matching is line-based. A declaration inside a multi-line string literal is still
//! treated as an import.

use crate::core::config::ImportsConfig;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

const IMPORT_PATTERN: &str = r"^\s*(?:import|from)\s+([A-Za-z0-9_.]+)";

/// One import declaration as written in the source, whitespace-trimmed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ImportStatement {
    pub text: String,
    /// Dotted module name following `import` or `from`.
    pub module: String,
}

/// Source lines `start..=end` that make up one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpan {
    pub start: usize,
    pub end: usize,
    pub statement: ImportStatement,
}

#[derive(Debug, Clone)]
pub struct ImportClassifier {
    pattern: Regex,
}

impl ImportClassifier {
    pub fn new() -> Self {
        ImportClassifier {
            pattern: Regex::new(IMPORT_PATTERN).expect("import pattern is valid"),
        }
    }

    /// Deduplicated declarations in lexicographic order.
    pub fn classify(&self, source: &str) -> Vec<ImportStatement> {
        let lines: Vec<&str> = source.lines().collect();
        let unique: BTreeMap<String, ImportStatement> = self
            .import_spans(&lines)
            .into_iter()
            .map(|span| (span.statement.text.clone(), span.statement))
            .collect();
        unique.into_values().collect()
    }

    /// Locate declarations, absorbing parenthesized and backslash continuations.
    pub fn import_spans(&self, lines: &[&str]) -> Vec<ImportSpan> {
        let mut spans = Vec::new();
        let mut index = 0;
        while index < lines.len() {
            let Some(captures) = self.pattern.captures(lines[index]) else {
                index += 1;
                continue;
            };
            let module = captures[1].to_string();
            let start = index;
            let mut depth = paren_balance(lines[index]);
            let mut continued = ends_with_continuation(lines[index]);
            while (depth > 0 || continued) && index + 1 < lines.len() {
                index += 1;
                depth += paren_balance(lines[index]);
                continued = ends_with_continuation(lines[index]);
            }
            let text = lines[start..=index]
                .iter()
                .map(|line| line.trim())
                .collect::<Vec<_>>()
                .join("\n");
            spans.push(ImportSpan {
                start,
                end: index,
                statement: ImportStatement { text, module },
            });
            index += 1;
        }
        spans
    }
}

impl Default for ImportClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Net count of opened brackets on one line. Quoted text and a trailing `#`
/// comment are skipped; a string spanning several lines is not tracked.
pub(crate) fn paren_balance(line: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match quote {
            Some(_) if c == '\\' => {
                chars.next();
            }
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '#' => break,
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                _ => {}
            },
        }
    }
    depth
}

/// Explicit line joining with a trailing backslash.
pub(crate) fn ends_with_continuation(line: &str) -> bool {
    line.trim_end().ends_with('\\')
}

/// Imports split by the safety filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportPartition {
    pub safe: Vec<ImportStatement>,
    pub blocked: Vec<ImportStatement>,
}

/// Drops declarations that mention a blocklisted capability.
#[derive(Debug, Clone)]
pub struct SafetyFilter {
    blocklist: Vec<String>,
}

impl SafetyFilter {
    pub fn new(config: &ImportsConfig) -> Self {
        SafetyFilter {
            blocklist: config
                .blocklist
                .iter()
                .map(|entry| entry.trim().to_lowercase())
                .filter(|entry| !entry.is_empty())
                .collect(),
        }
    }

    pub fn blocklist(&self) -> &[String] {
        &self.blocklist
    }

    /// Case-insensitive substring test against the blocklist.
    pub fn is_blocked(&self, text: &str) -> bool {
        let normalized = text.to_lowercase();
        self.blocklist
            .iter()
            .any(|blocked| normalized.contains(blocked.as_str()))
    }

    /// Partition preserving input order and original formatting.
    pub fn partition(&self, imports: Vec<ImportStatement>) -> ImportPartition {
        let (blocked, safe) = imports
            .into_iter()
            .partition(|import| self.is_blocked(&import.text));
        ImportPartition { safe, blocked }
    }
}
