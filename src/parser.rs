// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Markdown parsing for AI chat transcript exports.
//!
//! This module recognizes the block structure used by chat-transcript
//! export tools (browser extensions and "share conversation" features for
//! Gemini, ChatGPT, Claude, and similar platforms) and produces a typed
//! [`Conversation`] model.
//!
//! # Format Overview
//!
//! A transcript export contains:
//! - An optional preamble before the first turn (title line, export
//!   timestamp, other metadata) which produces no entries
//! - A sequence of blocks, each introduced by a heading marker: `## Role`
//!   for a spoken turn, or a `Thought`/`Thinking` heading for an internal
//!   reasoning block
//! - Free-form Markdown content under each marker, passed through verbatim
//!
//! Heading-like lines inside fenced code blocks are never treated as block
//! boundaries; the scanner tracks fence state across the whole document.
//!
//! The role vocabulary is open: `## Narrator` parses as a message with the
//! literal role `"Narrator"`. Export conventions differ per platform and
//! new role labels appear regularly, so roles are plain strings rather
//! than an enum.
//!
//! # Example
//!
//! ```
//! use md2json::parser::parse_transcript;
//!
//! let markdown = concat!(
//!     "# Conversation with Gemini\n",
//!     "**Exported:** 2025-10-01 14:30 UTC\n",
//!     "\n",
//!     "## User\n",
//!     "Hello\n",
//!     "\n",
//!     "## Assistant\n",
//!     "Hi there!\n",
//! );
//!
//! let conversation = parse_transcript(markdown).unwrap();
//! assert_eq!(conversation.entries.len(), 2);
//! assert_eq!(conversation.metadata.messages, 2);
//! assert_eq!(
//!     conversation.metadata.timestamp.as_deref(),
//!     Some("2025-10-01 14:30 UTC")
//! );
//! ```

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use snafu::prelude::*;

/// Error type for transcript parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// The input document was completely empty.
    ///
    /// Documents that contain text but no recognizable blocks are not an
    /// error; they parse to a [`Conversation`] with zero entries.
    #[snafu(display("document is empty"))]
    EmptyDocument,
}

/// The root value produced by parsing one transcript document.
///
/// Entries appear in document order and are never reordered; the order
/// reconstructs the conversation timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    /// Aggregate facts about the document.
    pub metadata: Metadata,

    /// The structural blocks of the document, in document order.
    pub entries: Vec<Entry>,
}

/// Aggregate metadata for a parsed transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// The document's recorded export time, verbatim as found in the
    /// preamble, or `None` when the preamble has no timestamp line.
    pub timestamp: Option<String>,

    /// Count of all recognized blocks; always equals `entries.len()`.
    pub total_blocks: usize,

    /// Count of entries that are spoken turns ([`Entry::Message`]).
    pub messages: usize,

    /// Count of entries that are reasoning blocks ([`Entry::Thought`]).
    pub thoughts: usize,
}

/// One structural block extracted from the document.
///
/// Each variant carries only the fields relevant to it: a thought block
/// has no role, so the variant has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A spoken turn attributed to a role.
    Message {
        /// The role label from the block's heading, verbatim (e.g.
        /// "User", "Assistant", "Gemini").
        role: String,
        /// The block's textual body with original line breaks.
        content: String,
    },

    /// An internal reasoning block.
    Thought {
        /// The block's textual body with original line breaks.
        content: String,
    },
}

impl Entry {
    /// Returns the entry's kind as its wire name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Thought { .. } => "thought",
        }
    }

    /// Returns the role label for message entries, `None` for thoughts.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        match self {
            Self::Message { role, .. } => Some(role),
            Self::Thought { .. } => None,
        }
    }

    /// Returns the entry's textual body.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Message { content, .. } | Self::Thought { content } => content,
        }
    }
}

// The output schema is a flat {kind, role, content} object with role null
// for thoughts, which doesn't match any serde enum representation.
impl Serialize for Entry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Entry", 3)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("role", &self.role())?;
        state.serialize_field("content", self.content())?;
        state.end()
    }
}

/// How a block marker classified the block it opened.
enum Marker<'a> {
    Message { role: &'a str },
    Thought,
}

/// A block that is still accumulating content lines.
struct OpenBlock<'a> {
    marker: Marker<'a>,
    lines: Vec<&'a str>,
}

impl<'a> OpenBlock<'a> {
    const fn new(marker: Marker<'a>) -> Self {
        Self {
            marker,
            lines: Vec::new(),
        }
    }

    fn finish(self) -> Entry {
        let content = trim_blank_edges(&self.lines).join("\n");
        match self.marker {
            Marker::Message { role } => Entry::Message {
                role: role.to_owned(),
                content,
            },
            Marker::Thought => Entry::Thought { content },
        }
    }
}

/// Splits a heading line into its level and trimmed label.
///
/// Only unindented ATX headings count; a label is required.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    let label = rest.trim();
    if label.is_empty() {
        return None;
    }
    Some((level, label))
}

/// Returns `true` if a heading label marks a reasoning block.
///
/// Export tools label these "Thought", "Thoughts", or "Thinking"
/// depending on the platform; a trailing colon is tolerated.
fn is_thought_label(label: &str) -> bool {
    let label = label.strip_suffix(':').unwrap_or(label).trim_end();
    ["thought", "thoughts", "thinking"]
        .iter()
        .any(|known| label.eq_ignore_ascii_case(known))
}

/// Classifies a line as a block marker, if it is one.
///
/// Level-2 headings always start a block (thought or message); level-3
/// headings start a block only when thought-labeled, since some exports
/// nest reasoning one heading level below the turn. All other headings
/// are ordinary content.
fn block_marker(line: &str) -> Option<Marker<'_>> {
    let (level, label) = heading(line)?;
    match level {
        2 => {
            if is_thought_label(label) {
                Some(Marker::Thought)
            } else {
                let role = label.strip_suffix(':').unwrap_or(label).trim_end();
                Some(Marker::Message { role })
            }
        }
        3 if is_thought_label(label) => Some(Marker::Thought),
        _ => None,
    }
}

/// Returns the delimiter run length and whether an info string follows,
/// if the line is a backtick code-fence delimiter.
fn fence_run(line: &str) -> Option<(usize, bool)> {
    let trimmed = line.trim_start();
    let run = trimmed.bytes().take_while(|&b| b == b'`').count();
    if run < 3 {
        return None;
    }
    let has_info = !trimmed[run..].trim().is_empty();
    Some((run, has_info))
}

/// Drops leading and trailing blank lines, preserving interior ones.
fn trim_blank_edges<'a>(lines: &'a [&'a str]) -> &'a [&'a str] {
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |i| i + 1);
    &lines[start..end]
}

/// Strips blockquote and emphasis decoration from a preamble line.
fn strip_decoration(line: &str) -> &str {
    line.trim()
        .trim_start_matches('>')
        .trim()
        .trim_matches(['*', '_'])
        .trim()
}

/// Case-insensitively strips a label prefix, returning the remainder.
fn strip_label<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let head = text.get(..label.len())?;
    if head.eq_ignore_ascii_case(label) {
        Some(&text[label.len()..])
    } else {
        None
    }
}

/// Returns `true` if the text parses as a datetime in any of the formats
/// seen across export sources.
fn looks_like_datetime(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || DateTime::parse_from_rfc2822(text).is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(text, "%m/%d/%Y, %I:%M:%S %p").is_ok()
}

/// Extracts an export timestamp from a preamble line, verbatim.
///
/// Recognizes labeled lines like `**Exported:** 2025-10-01 14:30 UTC`
/// (labels: `Exported`, `Timestamp`, `Date`) and bare datetime lines.
fn preamble_timestamp(line: &str) -> Option<String> {
    let text = strip_decoration(line);
    if text.is_empty() {
        return None;
    }

    for label in ["exported:", "timestamp:", "date:"] {
        if let Some(rest) = strip_label(text, label) {
            let rest = rest.trim_start_matches(['*', '_']).trim();
            if !rest.is_empty() {
                return Some(rest.to_owned());
            }
        }
    }

    if looks_like_datetime(text) {
        return Some(text.to_owned());
    }

    None
}

/// Parses a transcript document into a [`Conversation`].
///
/// This is the main entry point for parsing. The scanner makes a single
/// forward pass over the document's lines: heading markers (outside code
/// fences) start a new block, all following lines belong to that block,
/// and the region before the first marker is scanned for an export
/// timestamp. Blocks with unknown role labels are kept as messages with
/// the literal role; no block shape aborts the scan.
///
/// # Errors
///
/// Returns [`ParseError::EmptyDocument`] when the input is empty. Any
/// non-empty document parses, possibly to zero entries.
///
/// # Example
///
/// ```
/// use md2json::parser::{Entry, parse_transcript};
///
/// let conversation = parse_transcript("## User\nHello").unwrap();
///
/// assert_eq!(conversation.metadata.total_blocks, 1);
/// assert_eq!(
///     conversation.entries[0],
///     Entry::Message {
///         role: "User".into(),
///         content: "Hello".into(),
///     }
/// );
/// ```
pub fn parse_transcript(text: &str) -> Result<Conversation, ParseError> {
    ensure!(!text.is_empty(), EmptyDocumentSnafu);

    let mut entries: Vec<Entry> = Vec::new();
    let mut timestamp: Option<String> = None;
    let mut open: Option<OpenBlock<'_>> = None;
    // Length of the opening delimiter while inside a code fence.
    let mut fence: Option<usize> = None;

    for line in text.lines() {
        if fence.is_none()
            && let Some(marker) = block_marker(line)
        {
            if let Some(block) = open.take() {
                entries.push(block.finish());
            }
            open = Some(OpenBlock::new(marker));
            continue;
        }

        if let Some((run, has_info)) = fence_run(line) {
            match fence {
                None => fence = Some(run),
                // A closing fence is at least as long as the opener and
                // carries no info string.
                Some(opened) if run >= opened && !has_info => fence = None,
                Some(_) => {}
            }
        }

        match &mut open {
            Some(block) => block.lines.push(line),
            None => {
                if timestamp.is_none() {
                    timestamp = preamble_timestamp(line);
                }
            }
        }
    }

    if let Some(block) = open.take() {
        entries.push(block.finish());
    }

    let messages = entries
        .iter()
        .filter(|entry| matches!(entry, Entry::Message { .. }))
        .count();
    let thoughts = entries.len() - messages;

    Ok(Conversation {
        metadata: Metadata {
            timestamp,
            total_blocks: entries.len(),
            messages,
            thoughts,
        },
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Conversation {
        parse_transcript(text).unwrap()
    }

    #[test]
    fn parses_single_message_block() {
        let conversation = parse("## User\nHello");

        assert_eq!(conversation.entries.len(), 1);
        assert_eq!(
            conversation.entries[0],
            Entry::Message {
                role: "User".into(),
                content: "Hello".into(),
            }
        );
        assert_eq!(conversation.metadata.total_blocks, 1);
        assert_eq!(conversation.metadata.messages, 1);
        assert_eq!(conversation.metadata.thoughts, 0);
    }

    #[test]
    fn preserves_document_order() {
        let conversation = parse("## User\nfirst\n\n## Assistant\nsecond\n\n## User\nthird\n");

        let roles: Vec<_> = conversation
            .entries
            .iter()
            .filter_map(Entry::role)
            .collect();
        assert_eq!(roles, ["User", "Assistant", "User"]);
        assert_eq!(conversation.entries[0].content(), "first");
        assert_eq!(conversation.entries[2].content(), "third");
    }

    #[test]
    fn total_blocks_matches_entry_count() {
        let conversation = parse("## User\nhi\n\n### Thought\nhmm\n\n## Assistant\nhello\n");

        assert_eq!(
            conversation.metadata.total_blocks,
            conversation.entries.len()
        );
        assert_eq!(
            conversation.metadata.messages + conversation.metadata.thoughts,
            conversation.metadata.total_blocks
        );
    }

    #[test]
    fn keeps_unknown_role_verbatim() {
        let conversation = parse("## Narrator\nOnce upon a time");

        assert_eq!(conversation.entries[0].role(), Some("Narrator"));
        assert_eq!(conversation.metadata.messages, 1);
    }

    #[test]
    fn strips_trailing_colon_from_role() {
        let conversation = parse("## User:\nHello");

        assert_eq!(conversation.entries[0].role(), Some("User"));
    }

    #[test]
    fn classifies_thought_heading() {
        let conversation = parse("## Thought\nreasoning here");

        assert_eq!(
            conversation.entries[0],
            Entry::Thought {
                content: "reasoning here".into(),
            }
        );
        assert_eq!(conversation.metadata.thoughts, 1);
        assert_eq!(conversation.metadata.messages, 0);
    }

    #[test]
    fn classifies_thought_variants_case_insensitively() {
        for marker in ["## Thoughts", "## THINKING", "### thought", "### Thinking:"] {
            let conversation = parse(&format!("{marker}\nhmm"));
            assert!(
                matches!(conversation.entries[0], Entry::Thought { .. }),
                "{marker} should parse as a thought"
            );
        }
    }

    #[test]
    fn level_three_heading_is_content_unless_thought() {
        let conversation = parse("## Assistant\nIntro\n### Details\nMore text");

        assert_eq!(conversation.entries.len(), 1);
        assert_eq!(
            conversation.entries[0].content(),
            "Intro\n### Details\nMore text"
        );
    }

    #[test]
    fn deep_headings_are_content() {
        let conversation = parse("## Assistant\n#### Subsection\ntext");

        assert_eq!(conversation.entries.len(), 1);
        assert_eq!(conversation.entries[0].content(), "#### Subsection\ntext");
    }

    #[test]
    fn title_line_is_not_a_block() {
        let conversation = parse("# Conversation with Gemini\n\n## User\nhi\n");

        assert_eq!(conversation.entries.len(), 1);
        assert_eq!(conversation.entries[0].role(), Some("User"));
    }

    #[test]
    fn hash_without_space_is_not_a_marker() {
        let conversation = parse("## User\n##hashtag text");

        assert_eq!(conversation.entries.len(), 1);
        assert_eq!(conversation.entries[0].content(), "##hashtag text");
    }

    #[test]
    fn fenced_header_like_lines_are_not_boundaries() {
        let conversation =
            parse("## Assistant\nHere is a snippet:\n```\n## Fake Role\ntext\n```\ndone\n");

        assert_eq!(conversation.entries.len(), 1);
        assert_eq!(
            conversation.entries[0].content(),
            "Here is a snippet:\n```\n## Fake Role\ntext\n```\ndone"
        );
    }

    #[test]
    fn fence_with_info_string_tracks_state() {
        let conversation =
            parse("## Assistant\n```markdown\n## User\nnested\n```\n\n## User\nreal\n");

        assert_eq!(conversation.entries.len(), 2);
        assert_eq!(conversation.entries[1].role(), Some("User"));
        assert_eq!(conversation.entries[1].content(), "real");
    }

    #[test]
    fn longer_fence_contains_shorter_fences() {
        let conversation =
            parse("## Assistant\n````\n```\n## Fake\n```\n````\n\n## User\nnext\n");

        assert_eq!(conversation.entries.len(), 2);
        assert_eq!(
            conversation.entries[0].content(),
            "````\n```\n## Fake\n```\n````"
        );
    }

    #[test]
    fn unclosed_fence_swallows_rest_of_document() {
        let conversation = parse("## Assistant\n```\n## User\nstill code\n");

        assert_eq!(conversation.entries.len(), 1);
        assert_eq!(conversation.entries[0].content(), "```\n## User\nstill code");
    }

    #[test]
    fn fence_in_preamble_suppresses_markers() {
        let conversation = parse("```\n## Not A Turn\n```\n\n## User\nhi\n");

        assert_eq!(conversation.entries.len(), 1);
        assert_eq!(conversation.entries[0].role(), Some("User"));
    }

    #[test]
    fn trims_blank_edges_but_keeps_interior_blanks() {
        let conversation = parse("## User\n\nfirst paragraph\n\nsecond paragraph\n\n\n");

        assert_eq!(
            conversation.entries[0].content(),
            "first paragraph\n\nsecond paragraph"
        );
    }

    #[test]
    fn trailing_marker_yields_empty_content() {
        let conversation = parse("## User\nhi\n\n## Assistant");

        assert_eq!(conversation.entries.len(), 2);
        assert_eq!(conversation.entries[1].content(), "");
    }

    #[test]
    fn crlf_line_endings_are_normalized() {
        let conversation = parse("## User\r\nline one\r\nline two\r\n");

        assert_eq!(conversation.entries[0].content(), "line one\nline two");
    }

    #[test]
    fn parses_turns_after_title_and_timestamp_preamble() {
        let conversation = parse(
            "# Conversation with Gemini\n**Exported:** 2025-10-01 14:30 UTC\n\n## User\nHello\n\n## Assistant\nHi there!\n",
        );

        assert_eq!(conversation.entries.len(), 2);
        assert_eq!(conversation.metadata.messages, 2);
        assert_eq!(conversation.entries[1].content(), "Hi there!");
    }

    #[test]
    fn extracts_labeled_timestamp() {
        let conversation = parse("# Export\n**Exported:** 2025-10-01 14:30 UTC\n\n## User\nhi\n");

        assert_eq!(
            conversation.metadata.timestamp.as_deref(),
            Some("2025-10-01 14:30 UTC")
        );
    }

    #[test]
    fn extracts_timestamp_label_case_insensitively() {
        let conversation = parse("TIMESTAMP: 2025-10-01\n\n## User\nhi\n");

        assert_eq!(
            conversation.metadata.timestamp.as_deref(),
            Some("2025-10-01")
        );
    }

    #[test]
    fn extracts_bare_rfc3339_timestamp() {
        let conversation = parse("2025-10-01T14:30:00Z\n\n## User\nhi\n");

        assert_eq!(
            conversation.metadata.timestamp.as_deref(),
            Some("2025-10-01T14:30:00Z")
        );
    }

    #[test]
    fn extracts_bare_locale_timestamp() {
        let conversation = parse("*10/1/2025, 2:30:00 PM*\n\n## User\nhi\n");

        assert_eq!(
            conversation.metadata.timestamp.as_deref(),
            Some("10/1/2025, 2:30:00 PM")
        );
    }

    #[test]
    fn first_timestamp_wins() {
        let conversation = parse("Exported: first\nExported: second\n\n## User\nhi\n");

        assert_eq!(conversation.metadata.timestamp.as_deref(), Some("first"));
    }

    #[test]
    fn ordinary_preamble_text_is_not_a_timestamp() {
        let conversation = parse("Some introduction text.\n\n## User\nhi\n");

        assert!(conversation.metadata.timestamp.is_none());
    }

    #[test]
    fn timestamp_lines_after_first_block_are_content() {
        let conversation = parse("## User\nExported: 2025-10-01\n");

        assert!(conversation.metadata.timestamp.is_none());
        assert_eq!(conversation.entries[0].content(), "Exported: 2025-10-01");
    }

    #[test]
    fn empty_document_is_an_error() {
        assert!(parse_transcript("").is_err());
    }

    #[test]
    fn blank_document_parses_to_zero_entries() {
        let conversation = parse("\n\n   \n");

        assert!(conversation.entries.is_empty());
        assert_eq!(conversation.metadata.total_blocks, 0);
        assert_eq!(conversation.metadata.messages, 0);
        assert_eq!(conversation.metadata.thoughts, 0);
    }

    #[test]
    fn preamble_only_document_parses_to_zero_entries() {
        let conversation = parse("# Title\nExported: 2025-10-01\n");

        assert!(conversation.entries.is_empty());
        assert_eq!(
            conversation.metadata.timestamp.as_deref(),
            Some("2025-10-01")
        );
    }

    #[test]
    fn entry_accessors_match_variants() {
        let message = Entry::Message {
            role: "User".into(),
            content: "hi".into(),
        };
        let thought = Entry::Thought {
            content: "hmm".into(),
        };

        assert_eq!(message.kind(), "message");
        assert_eq!(message.role(), Some("User"));
        assert_eq!(thought.kind(), "thought");
        assert_eq!(thought.role(), None);
        assert_eq!(thought.content(), "hmm");
    }
}
