/*!
 * # ass-font-replacer - batch font replacement for ASS subtitles
 *
 * A Rust library for rewriting font references in Advanced SubStation Alpha
 * (`.ass`) subtitle files.
 *
 * ## Features
 *
 * - Remap the font of every `Style:` definition
 * - Remap every inline `\fn` font override
 * - Optionally strip `\fsp` font-spacing overrides
 * - Fall back to a configurable default font for unmapped names
 * - Batch processing of whole directories, optionally recursive
 * - Byte-for-byte preservation of everything else, including line endings
 *   and the UTF-8 byte-order mark
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Font mapping configuration (load, save, legacy upgrade)
 * - `font_rewriter`: Line rewriting engine
 * - `batch`: File discovery and sequential batch runs with progress events
 * - `file_utils`: File system operations and BOM-aware subtitle I/O
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod font_rewriter;
pub mod batch;
pub mod app_controller;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::{Config, ConfigStore, FontEntry, FontMapping};
pub use font_rewriter::{FontRewriter, LineKind};
pub use batch::{BatchEvent, BatchHandle, BatchJob, BatchRunner, BatchSummary};
pub use errors::{AppError, BatchError, ConfigError};
