// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert AI chat transcript exports to structured JSON.
//!
//! This crate provides parsing and serialization functionality for
//! transforming markdown conversation exports (Gemini, ChatGPT, Claude,
//! and other platforms) into a normalized JSON representation suitable
//! for downstream search and query tools.
//!
//! # Overview
//!
//! Transcript export tools save conversations as loosely structured
//! Markdown. This crate:
//!
//! 1. Parses the markdown block structure (turn headings, thought
//!    sections, export timestamps) into a typed [`parser::Conversation`]
//! 2. Serializes the conversation as a well-formed JSON document
//!
//! The two stages are independent: any producer of a
//! [`parser::Conversation`] can reuse the serializer.
//!
//! # Example
//!
//! ```
//! use md2json::{parser, serializer};
//!
//! let markdown = concat!(
//!     "## User\n",
//!     "What is Rust?\n",
//!     "\n",
//!     "## Assistant\n",
//!     "A systems programming language.\n",
//! );
//!
//! let conversation = parser::parse_transcript(markdown).unwrap();
//! let json = serializer::to_json(&conversation).unwrap();
//!
//! assert_eq!(conversation.metadata.messages, 2);
//! assert!(json.contains("\"total_blocks\": 2"));
//! ```
//!
//! # Modules
//!
//! - [`parser`]: markdown scanning and the conversation data model
//! - [`serializer`]: JSON document generation
//!
//! # I/O
//!
//! Neither module touches the filesystem; the parser receives
//! already-read text and the serializer writes to memory or any
//! [`std::io::Write`] sink. Both are free of shared state, so
//! independent inputs can be processed concurrently.

#![deny(missing_docs)]

pub mod parser;
pub mod serializer;
