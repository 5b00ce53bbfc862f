//! umbra HTML Parser
//!
//! HTML5 parsing into the umbra-dom arena, built on html5ever's RcDom.
//! Used to re-ingest serialized markup for server-side rehydration and
//! round-trip testing.

mod parser;

pub use parser::{HtmlParser, ParsedDocument};

/// Parse an HTML string into a [`ParsedDocument`]
pub fn parse(html: &str) -> ParsedDocument {
    HtmlParser::new().parse(html)
}
