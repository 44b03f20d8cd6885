//! Pipeline stages for Aadhaar QR extraction.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! and a rendering backend can be swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ preprocess ──▶ decode ──▶ parse
//! (path)    (S1..S4)   (grey+sharpen)  (rqrr)     (key="value")
//!              │
//!              └── artifacts (request-scoped temp files, always cleaned)
//! ```
//!
//! 1. [`input`]      — validate the PDF path; carries the password
//! 2. [`render`]     — one [`render::Renderer`] per strategy, pages in order
//! 3. [`preprocess`] — greyscale, contrast stretch, sharpen → RGBA buffer
//! 4. [`decode`]     — find and decode the first QR symbol on the page
//! 5. [`parse`]      — turn the payload into an [`crate::IdentityRecord`]
//!
//! The orchestrator in [`crate::extract`] stops at the first page that
//! decodes; later pages and strategies never run.

pub mod artifacts;
pub mod decode;
pub mod input;
pub mod parse;
pub mod preprocess;
pub mod render;
