//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Collection administration.
pub mod admin;
/// Admin login and token checks.
pub mod auth;
/// Chat, streaming chat and history handlers.
pub mod chat;
/// Document upload, status, listing and deletion.
pub mod documents;
/// Root banner and health probe.
pub mod health;
