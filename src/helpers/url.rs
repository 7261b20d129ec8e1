//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Canonical site-relative URL of an entity
///
/// # Examples
/// ```ignore
/// entity_url("blog", "hello") // -> "/blog/hello"
/// ```
pub fn entity_url(content_type: &str, slug: &str) -> String {
    format!("/{}/{}", encode_segment(content_type), encode_segment(slug))
}

/// Join a base address and a site-relative path
///
/// # Examples
/// ```ignore
/// full_url_for("https://example.com/", "/blog/hello") // -> "https://example.com/blog/hello"
/// ```
pub fn full_url_for(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Encode a single URL path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}
