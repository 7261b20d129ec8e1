//! Internal link rewriting
//!
//! Rendered bodies may reference other entities with `[[slug]]`,
//! `[[type:slug]]` or either form followed by `|label`. References are
//! resolved against every entity known to the build, across all types.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::helpers::{entity_url, html_escape, link_to};

lazy_static! {
    static ref REFERENCE: Regex =
        Regex::new(r"\[\[([^\[\]|]+?)(?:\|([^\[\]]+?))?\]\]").expect("valid reference regex");
    static ref VERBATIM: Regex =
        Regex::new(r"(?s)<pre\b.*?</pre>|<code\b.*?</code>").expect("valid verbatim regex");
}

/// One entity that references can point to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub content_type: String,
    pub slug: String,
    pub title: Option<String>,
}

impl LinkTarget {
    pub fn url(&self) -> String {
        entity_url(&self.content_type, &self.slug)
    }

    fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.slug)
    }
}

/// Every known entity of a build, keyed by slug
#[derive(Debug, Clone, Default)]
pub struct LinkTargets {
    by_slug: HashMap<String, Vec<LinkTarget>>,
}

impl LinkTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: LinkTarget) {
        self.by_slug
            .entry(target.slug.clone())
            .or_default()
            .push(target);
    }

    pub fn len(&self) -> usize {
        self.by_slug.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }

    /// Resolve a reference written inside an entity of `source_type`.
    ///
    /// Qualified references (`type:slug`) must match exactly. Bare slugs
    /// prefer the source's own type, then a unique match in another type;
    /// a bare slug shared by several other types does not resolve.
    pub fn resolve(&self, reference: &str, source_type: &str) -> Option<&LinkTarget> {
        let (content_type, slug) = match reference.split_once(':') {
            Some((content_type, slug)) => (Some(content_type.trim()), slug.trim()),
            None => (None, reference.trim()),
        };
        let slug = slug.to_lowercase();
        let candidates = self.by_slug.get(&slug)?;

        match content_type {
            Some(content_type) => candidates.iter().find(|t| t.content_type == content_type),
            None => candidates
                .iter()
                .find(|t| t.content_type == source_type)
                .or(match candidates.as_slice() {
                    [only] => Some(only),
                    _ => None,
                }),
        }
    }
}

/// Result of rewriting one rendered body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutput {
    pub html: String,
    /// References that did not resolve, in document order
    pub unresolved: Vec<String>,
}

/// Rewrites internal references in rendered HTML
///
/// Never fails: unknown references become broken-link markers and are
/// reported back in [`RewriteOutput::unresolved`].
pub trait LinkRewriter: Send + Sync {
    fn rewrite(&self, html: &str, source_type: &str, targets: &LinkTargets) -> RewriteOutput;
}

/// Default rewriter for the `[[...]]` reference syntax
#[derive(Debug, Clone, Default)]
pub struct InnerLinkRewriter;

impl InnerLinkRewriter {
    pub fn new() -> Self {
        Self
    }

    fn rewrite_segment(
        &self,
        segment: &str,
        source_type: &str,
        targets: &LinkTargets,
        out: &mut RewriteOutput,
    ) {
        let mut last = 0;
        for caps in REFERENCE.captures_iter(segment) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let reference = caps.get(1).map_or("", |m| m.as_str()).trim();
            let label = caps.get(2).map(|m| m.as_str().trim());

            out.html.push_str(&segment[last..whole.start]);
            match targets.resolve(reference, source_type) {
                Some(target) => {
                    let text = match label {
                        Some(label) => label.to_string(),
                        None => html_escape(target.label()),
                    };
                    out.html.push_str(&link_to(&target.url(), &text));
                }
                None => {
                    // Reference and label are taken from already-escaped HTML
                    let text = label.unwrap_or(reference);
                    out.html.push_str(&format!(
                        r#"<span class="broken-link" data-target="{}">{}</span>"#,
                        reference, text
                    ));
                    out.unresolved.push(reference.to_string());
                }
            }
            last = whole.end;
        }
        out.html.push_str(&segment[last..]);
    }
}

impl LinkRewriter for InnerLinkRewriter {
    fn rewrite(&self, html: &str, source_type: &str, targets: &LinkTargets) -> RewriteOutput {
        let mut out = RewriteOutput {
            html: String::with_capacity(html.len()),
            unresolved: Vec::new(),
        };

        // Code samples are copied verbatim
        let mut last = 0;
        for verbatim in VERBATIM.find_iter(html) {
            self.rewrite_segment(&html[last..verbatim.start()], source_type, targets, &mut out);
            out.html.push_str(verbatim.as_str());
            last = verbatim.end();
        }
        self.rewrite_segment(&html[last..], source_type, targets, &mut out);

        out
    }
}
