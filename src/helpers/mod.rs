//! Helper functions shared by the parser, link rewriter and sitemap

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
