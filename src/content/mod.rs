//! Content module - source loading, front-matter, rendering and entities

mod entity;
mod frontmatter;
mod links;
pub mod loader;
mod markdown;
mod parser;
mod value;

pub use entity::{Entity, Record};
pub use frontmatter::FrontMatter;
pub use links::{InnerLinkRewriter, LinkRewriter, LinkTarget, LinkTargets, RewriteOutput};
pub use loader::{ContentFolder, SourceDocument};
pub use markdown::{MarkdownRenderer, Renderer};
pub use parser::{EntityDraft, MarkdownParser, ParsedEntity};
pub use value::{PropertyValue, ScalarValue};
