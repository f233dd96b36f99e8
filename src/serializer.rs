// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON serialization for parsed conversations.
//!
//! This module emits a [`Conversation`] as a standalone JSON document in
//! the schema consumed by the companion query tooling:
//!
//! ```json
//! {
//!   "metadata": {
//!     "timestamp": "2025-10-01 14:30 UTC",
//!     "total_blocks": 2,
//!     "messages": 2,
//!     "thoughts": 0
//!   },
//!   "entries": [
//!     { "kind": "message", "role": "User", "content": "Hello" }
//!   ]
//! }
//! ```
//!
//! Entry order is preserved exactly, `role` is `null` for thoughts, and
//! `timestamp` is `null` when the source document had none. Non-ASCII
//! content passes through as raw UTF-8; quotes, backslashes, and control
//! characters are escaped per the JSON grammar. Output is pretty-printed
//! with a trailing newline, so serializing the same conversation twice
//! yields byte-identical documents.
//!
//! # Example
//!
//! ```
//! use md2json::{parser, serializer};
//!
//! let conversation = parser::parse_transcript("## User\nHello").unwrap();
//! let json = serializer::to_json(&conversation).unwrap();
//!
//! assert!(json.contains("\"kind\": \"message\""));
//! assert!(json.ends_with('\n'));
//! ```

use crate::parser::Conversation;
use snafu::prelude::*;
use std::io::Write;

/// Error type for serialization failures.
///
/// Serializing a well-formed [`Conversation`] to memory cannot fail;
/// these arise only when an output sink rejects a write.
#[derive(Debug, Snafu)]
pub enum SerializeError {
    /// JSON encoding failed while writing to the sink.
    #[snafu(display("failed to encode JSON: {source}"))]
    Encode {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// The sink rejected a write after encoding completed.
    #[snafu(display("failed to write output: {source}"))]
    Sink {
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Serializes a conversation to a pretty-printed JSON string.
///
/// The returned string is a complete document including the trailing
/// newline, identical to what [`write_json`] produces.
///
/// # Errors
///
/// Returns an error if JSON encoding fails, which cannot happen for
/// values produced by the parser.
pub fn to_json(conversation: &Conversation) -> Result<String, SerializeError> {
    let mut json = serde_json::to_string_pretty(conversation).context(EncodeSnafu)?;
    json.push('\n');
    Ok(json)
}

/// Serializes a conversation as pretty-printed JSON into a writer.
///
/// # Errors
///
/// Returns an error if writing to the sink fails.
pub fn write_json<W: Write>(
    conversation: &Conversation,
    mut writer: W,
) -> Result<(), SerializeError> {
    serde_json::to_writer_pretty(&mut writer, conversation).context(EncodeSnafu)?;
    writer.write_all(b"\n").context(SinkSnafu)?;
    Ok(())
}
