//! Streaming chat session coordination.
//!
//! [`session::ChatSession`] is a synchronous state machine for one chat view:
//! identity, optimistic messages, the single pending stream and the message
//! cache. [`controller::SessionController`] drives it against a
//! `message_store::MessageStore` and a
//! `generation_provider::GenerationProvider`.
//!
//! ## Provider bootstrap
//!
//! The `cowrite` binary selects its provider with `COWRITE_PROVIDER`
//! (`mock` is the only built-in provider and the default). The initial chat
//! mode comes from `COWRITE_CHAT_MODE`.
//!
//! ## Rollback contract
//!
//! A user message is persisted before the stream starts. When generation
//! fails, the pending record is cleared first, the pre-submit messages and
//! input are restored, and the provisional message is deleted on a best
//! effort basis. When the user moves to another conversation mid-stream,
//! the stream is cancelled and the provisional message deleted, but nothing
//! is restored since the view now shows a different conversation.

pub mod cache;
pub mod commands;
pub mod controller;
pub mod document_agent;
pub mod identity;
pub mod message;
pub mod pending;
pub mod providers;
pub mod session;
