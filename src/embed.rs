// src/embed.rs
//! Poll references inside post content.
//!
//! Posts carry `[poll:<pollId>]` tags. Since poll ids contain `:`, the widget
//! that replaces a tag gets a DOM id with separators turned into `-`.
//! Tag bodies come from user-written content, so only ids made of
//! alphanumerics, `_`, `-`, `:` and `.` are treated as tags.

const TAG_OPEN: &str = "[poll:";
const TAG_CLOSE: char = ']';

pub fn poll_tag(poll_id: &str) -> String {
    format!("{TAG_OPEN}{poll_id}{TAG_CLOSE}")
}

/// Appends the tag for `poll_id` on its own line.
pub fn append_poll_tag(content: &str, poll_id: &str) -> String {
    if content.is_empty() {
        poll_tag(poll_id)
    } else {
        format!("{content}\n{}", poll_tag(poll_id))
    }
}

/// `poll:1700000000000` becomes `poll-1700000000000`. Anything outside
/// `[A-Za-z0-9_-]` turns into `-`.
pub fn dom_safe_id(poll_id: &str) -> String {
    poll_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect()
}

fn is_tag_id(poll_id: &str) -> bool {
    !poll_id.is_empty()
        && poll_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
}

/// Every poll id referenced in `content`, in order of appearance.
pub fn find_poll_ids(content: &str) -> Vec<&str> {
    tags(content).map(|tag| tag.poll_id).collect()
}

/// Swaps each poll tag for the placeholder the live widget mounts into.
pub fn render_placeholders(content: &str) -> String {
    let mut rendered = String::with_capacity(content.len());
    let mut cursor = 0;

    for tag in tags(content) {
        rendered.push_str(&content[cursor..tag.start]);
        rendered.push_str(&format!(
            r#"<div id="poll-{}" class="poll-container">Loading Poll...</div>"#,
            dom_safe_id(tag.poll_id)
        ));
        cursor = tag.end;
    }
    rendered.push_str(&content[cursor..]);

    rendered
}

struct Tag<'a> {
    start: usize,
    end: usize,
    poll_id: &'a str,
}

fn tags(content: &str) -> impl Iterator<Item = Tag<'_>> {
    let mut offset = 0;
    std::iter::from_fn(move || loop {
        let start = offset + content[offset..].find(TAG_OPEN)?;
        let id_start = start + TAG_OPEN.len();
        let id_len = content[id_start..].find(TAG_CLOSE)?;
        let poll_id = &content[id_start..id_start + id_len];

        // Not a tag; keep scanning right after the opener.
        if !is_tag_id(poll_id) {
            offset = id_start;
            continue;
        }

        let end = id_start + id_len + TAG_CLOSE.len_utf8();
        offset = end;
        return Some(Tag { start, end, poll_id });
    })
}
