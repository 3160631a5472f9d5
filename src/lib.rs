//! Document side of cowrite: marker grammar, segment splicing, and the
//! editor state an agent patches while a human keeps typing.
//!
//! Invariant: malformed or partial markers never change the buffer. Every
//! splice either applies a complete, well-formed span or is a no-op.
//!
//! # Public API Overview
//! - Describe directive delimiters with [`MarkerPair`].
//! - Strip delete spans and resolve agent patches with [`SegmentParser`].
//! - Hold an open document, its cursor, and the single [`PendingSegment`]
//!   slot with [`DocumentEditor`].
//! - Read settings with [`EnvConfig`] and install logging with
//!   [`init_logging`].

pub mod config;
pub mod logging;

pub mod core;
pub mod document;

pub use crate::config::{ConfigError, EnvConfig};
pub use crate::core::marker::{MarkedSpan, MarkerError, MarkerKind, MarkerPair};
pub use crate::core::segment::{PendingSegment, SegmentCommand, SegmentKind};
pub use crate::core::splice::{SegmentParser, Splice};
pub use crate::document::{Document, DocumentEditor, EditOutcome, SegmentResolution};
pub use crate::logging::init_logging;
