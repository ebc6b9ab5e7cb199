//! # bannerscan
//!
//! An **incremental, per-byte HTTP response classifier** for high-speed
//! probing engines. It extracts identifying information from a response —
//! the server banner, redirect target, and HTML page title — without ever
//! buffering the response: bytes may arrive in any fragmentation (one byte
//! or one megabyte per call) and the result is identical.
//!
//! Between fragments, the parser's entire suspended execution collapses into
//! a single `u32` context value, so a caller tracking millions of concurrent
//! connections stores one integer per flow instead of a reassembly buffer.
//! Keyword recognition (header names, HTML tags) is delegated to a compiled
//! multi-pattern automaton built once at startup and shared read-only by all
//! scans.
//!
//! ## Quick start — one-shot scanning
//!
//! ```rust
//! use bannerscan::{scan_response, BannerBuffer, Matchers};
//!
//! let matchers = Matchers::compile().expect("pattern tables compile");
//! let mut banner = BannerBuffer::new(1024);
//!
//! scan_response(
//!     &matchers,
//!     b"HTTP/1.1 200 OK\r\nServer: TestSrv\r\n\r\n<html><title>Example</title>",
//!     &mut banner,
//! );
//! assert_eq!(banner.as_bytes(), b"Server\nTestSrv\nTitle:Example");
//! ```
//!
//! ## Quick start — incremental scanning
//!
//! ```rust
//! use bannerscan::{scan_fragment, BannerBuffer, Matchers, DONE_CONTEXT};
//!
//! let matchers = Matchers::compile().expect("pattern tables compile");
//! let mut banner = BannerBuffer::new(1024);
//!
//! // The context starts at 0; thread the returned value through each call.
//! let mut ctx = 0;
//! ctx = scan_fragment(&matchers, ctx, b"HTTP/1.1 200 OK\r\nSer", &mut banner);
//! ctx = scan_fragment(&matchers, ctx, b"ver: demo\r\n\r\n", &mut banner);
//!
//! assert_eq!(banner.as_bytes(), b"Server\ndemo");
//! assert_ne!(ctx, DONE_CONTEXT); // still resumable (body may follow)
//! ```

mod banner;
mod error;
mod output;
mod parser;
mod patterns;

// Re-export public API.
pub use banner::BannerBuffer;
pub use error::PatternError;
pub use output::{format_json, format_text, BannerField, BannerReport};
pub use parser::{scan_fragment, BannerParser, ResumeState, DONE_CONTEXT};
pub use patterns::{
    Cursor, HtmlTag, HttpField, Matchers, PatternEntry, PatternSet, HTML_TAG_PATTERNS,
    HTTP_FIELD_PATTERNS,
};

/// Scan a complete (or partial) response held in one slice.
///
/// Convenience wrapper around [`scan_fragment`] starting from the initial
/// context. Returns the final context: [`DONE_CONTEXT`] if the input was not
/// an HTTP response, otherwise a resumable context (a response followed by a
/// body scan never self-terminates).
pub fn scan_response(matchers: &Matchers, data: &[u8], banner: &mut BannerBuffer) -> u32 {
    scan_fragment(matchers, 0, data, banner)
}
