use std::collections::HashSet;

use ammonia::Builder;

const ALLOWED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "p", "br", "strong", "em", "u", "ul", "ol", "li",
    "blockquote", "a", "img", "pre", "code",
];

const ALLOWED_ATTRS: &[&str] = &[
    "href", "target", "rel", "src", "alt", "width", "height", "class",
];

/// Strips disallowed HTML before content hits the database. Body text is
/// preserved, everything outside the tag allowlist is dropped.
pub fn sanitize_html(dirty: &str) -> String {
    let tags: HashSet<&str> = ALLOWED_TAGS.iter().copied().collect();
    let attrs: HashSet<&str> = ALLOWED_ATTRS.iter().copied().collect();

    Builder::default()
        .tags(tags)
        .generic_attributes(attrs)
        .link_rel(None)
        .clean(dirty)
        .to_string()
}

#[cfg(test)]
mod test {
    use super::sanitize_html;

    #[test]
    fn it_keeps_allowed_markup() {
        let html = r#"<p>Hello <strong>there</strong></p>"#;
        assert_eq!(sanitize_html(html), html);
    }

    #[test]
    fn it_drops_script_tags() {
        let out = sanitize_html("<p>ok</p><script>alert(1)</script>");
        assert!(!out.contains("<script>"));
        assert!(out.contains("<p>ok</p>"));
    }

    #[test]
    fn it_strips_event_handler_attributes() {
        let out = sanitize_html(r#"<a href="/x" onclick="steal()">x</a>"#);
        assert!(out.contains(r#"href="/x""#));
        assert!(!out.contains("onclick"));
    }
}
