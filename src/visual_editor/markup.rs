//! Clean-up of markup produced by contenteditable, and sanitizing of stored
//! markup before it is injected into the public page.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static DOUBLED_HEADING_OPEN: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    (1..=6)
        .filter_map(|n| Regex::new(&format!(r"(?i)<(h{n})>\s*<h{n}>")).ok())
        .collect()
});

static DOUBLED_HEADING_CLOSE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    (1..=6)
        .filter_map(|n| Regex::new(&format!(r"(?i)</(h{n})>\s*</h{n}>")).ok())
        .collect()
});

static EMPTY_PAIR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<([a-z][a-z0-9]*)>\s*</([a-z][a-z0-9]*)>").ok());

/// Allow-list used for stored markup: the default safe tags and URL schemes,
/// plus the inline styling the editor writes.
static POLICY: LazyLock<ammonia::Builder<'static>> = LazyLock::new(|| {
    let mut policy = ammonia::Builder::default();
    policy.add_generic_attributes(["style", "class"]).link_rel(None);
    policy
});

static ANY_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

fn replace(re: &Regex, input: &str, rep: impl regex::Replacer) -> String {
    re.replace_all(input, rep).into_owned()
}

fn cleanup_once(html: &str) -> String {
    let mut out = html.to_string();
    for re in DOUBLED_HEADING_OPEN.iter() {
        out = replace(re, &out, "<$1>");
    }
    for re in DOUBLED_HEADING_CLOSE.iter() {
        out = replace(re, &out, "</$1>");
    }
    if let Some(re) = EMPTY_PAIR.as_ref() {
        out = replace(re, &out, |caps: &Captures| {
            if caps[1].eq_ignore_ascii_case(&caps[2]) {
                String::new()
            } else {
                caps[0].to_string()
            }
        });
    }
    out
}

/// Tidy the markup an inline edit produced: `<h2><h2>` becomes `<h2>`,
/// `</h2></h2>` becomes `</h2>` and empty pairs like `<p> </p>` disappear.
/// Runs until nothing changes, so the result is stable under reapplication.
pub fn cleanup(html: &str) -> String {
    let mut current = html.to_string();
    loop {
        let next = cleanup_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Drop active content from stored markup before rendering it. The markup
/// is parsed as HTML, so whatever survives is what a browser would build.
pub fn sanitize(html: &str) -> String {
    POLICY.clean(html).to_string()
}

/// Text with every tag removed, for labels and previews.
pub fn plain_text(html: &str) -> String {
    match ANY_TAG.as_ref() {
        Some(re) => replace(re, html, ""),
        None => html.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn doubled_heading_tags_collapse() {
        assert_eq!(cleanup("<h2><h2>Title</h2></h2>"), "<h2>Title</h2>");
        assert_eq!(cleanup("<H3>\n <h3>x</h3> </H3>"), "<H3>x</h3>");
        assert_eq!(cleanup("<h1><h1><h1>deep</h1></h1></h1>"), "<h1>deep</h1>");
    }

    #[test]
    fn different_levels_are_left_alone() {
        assert_eq!(cleanup("<h1><h2>x</h2></h1>"), "<h1><h2>x</h2></h1>");
    }

    #[test]
    fn empty_pairs_are_removed_transitively() {
        assert_eq!(cleanup("a<p>  </p>b"), "ab");
        assert_eq!(cleanup("<div><b></b></div>text"), "text");
        assert_eq!(cleanup("<b></i>"), "<b></i>");
        assert_eq!(cleanup("<p class=\"x\"></p>"), "<p class=\"x\"></p>");
    }

    #[test]
    fn cleanup_is_idempotent() {
        let samples = [
            "<h2><h2>A</h2></h2><p></p>",
            "<div> <span></span> </div><h4>ok</h4>",
            "plain text",
            "<h1><h1></h1></h1>",
            "<p>keep <b>bold</b></p>",
        ];
        for sample in samples {
            let once = cleanup(sample);
            assert_eq!(cleanup(&once), once, "not stable for {sample:?}");
        }
    }

    #[test]
    fn sanitize_strips_active_content() {
        let dirty = r#"<p onclick="steal()">hi<script>alert(1)</script></p><a href="javascript:evil()">x</a>"#;
        assert_eq!(sanitize(dirty), "<p>hi</p><a>x</a>");
        assert_eq!(sanitize("<b>safe</b>"), "<b>safe</b>");
    }

    #[test]
    fn slash_separated_handlers_do_not_survive() {
        assert_eq!(
            sanitize("<img/src=x/onerror=alert(1)>"),
            r#"<img src="x/onerror=alert(1)">"#
        );
        assert_eq!(sanitize("<svg/onload=alert(1)>"), "");
        assert_eq!(sanitize("<p/onmouseover=alert(1)>hi</p>"), "<p>hi</p>");
    }

    #[test]
    fn tags_split_around_a_removed_script_stay_inert() {
        let out = sanitize("<scr<script>x</script>ipt>alert(1)</script>").to_lowercase();
        assert!(!out.contains("<script"), "{out}");
        let out = sanitize("<<script>script>alert(1)<</script>/script>").to_lowercase();
        assert!(!out.contains("<script"), "{out}");
    }

    #[test]
    fn editor_styling_is_kept() {
        let html = r#"<span style="color: #999;">note</span><p class="lead">x</p>"#;
        assert_eq!(sanitize(html), html);
    }

    #[test]
    fn plain_text_drops_tags() {
        assert_eq!(plain_text("<h1>Hi <i>there</i></h1>"), "Hi there");
    }
}
