//! Progress-callback trait for per-strategy extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to follow the
//! fallback chain as it runs: which strategy is being tried, which page is
//! being scanned, and why a strategy gave up.
//!
//! # Example
//!
//! ```rust
//! use aadhaar_qr::{ExtractionConfig, ExtractionProgressCallback, StrategyKind};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ExtractionProgressCallback for Printer {
//!     fn on_strategy_start(&self, strategy: StrategyKind, position: usize, total: usize) {
//!         eprintln!("[{position}/{total}] trying {strategy}");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::config::StrategyKind;
use std::sync::Arc;

/// Called by the orchestrator as it walks the strategy chain.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive from the blocking pipeline thread,
/// hence the `Send + Sync` bound.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first strategy runs.
    fn on_extraction_start(&self, strategy_count: usize) {
        let _ = strategy_count;
    }

    /// Called when a strategy is about to render.
    ///
    /// # Arguments
    /// * `position` — 1-indexed position in the chain
    /// * `total`    — number of strategies configured
    fn on_strategy_start(&self, strategy: StrategyKind, position: usize, total: usize) {
        let _ = (strategy, position, total);
    }

    /// Called before a page is scanned for a QR code.
    ///
    /// # Arguments
    /// * `page_num` — 1-indexed page number
    fn on_page(&self, strategy: StrategyKind, page_num: usize) {
        let _ = (strategy, page_num);
    }

    /// Called when a strategy ends without a payload.
    ///
    /// # Arguments
    /// * `reason` — human-readable reason (backend missing, no QR found, …)
    fn on_strategy_failed(&self, strategy: StrategyKind, reason: &str) {
        let _ = (strategy, reason);
    }

    /// Called once when the chain stops.
    ///
    /// # Arguments
    /// * `winner` — the strategy whose payload parsed into a record; `None`
    ///   when every strategy failed or the payload did not parse
    fn on_extraction_complete(&self, winner: Option<StrategyKind>) {
        let _ = winner;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
