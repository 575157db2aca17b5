//! Block markup to Markdown rewriting.
//!
//! Each pass is a function `&str -> String` applied in a fixed sequence. The
//! order is load-bearing: editor block comments must go before headings and
//! paragraphs are matched, and tags are only stripped wholesale after every
//! structural element has been rewritten. This is a sequential rewriter over a
//! known markup subset, not a parser; nested lists inside quotes and
//! unbalanced tags come out approximate.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Entities decoded in bodies and titles. Anything not listed is left as is.
pub const ENTITY_TABLE: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("nbsp", " "),
    ("#8216", "'"),
    ("#8217", "'"),
    ("#8220", "\""),
    ("#8221", "\""),
    ("#8211", "–"),
    ("#8212", "—"),
    ("#038", "&"),
];

/// Convert one item's block markup into Markdown.
pub fn to_markdown(html: &str) -> String {
    let mut md = strip_block_comments(html);

    md = convert_headings(&md);
    md = convert_links(&md);
    md = convert_emphasis(&md);
    md = convert_lists(&md);
    md = convert_images(&md);
    md = convert_blockquotes(&md);
    md = convert_paragraphs(&md);
    md = strip_tags(&md);
    md = decode_entities(&md);
    md = collapse_blank_lines(&md);

    md
}

// ---------------------------------------------------------------------------
// Pass 1: Editor block comments
// ---------------------------------------------------------------------------

/// Remove `<!-- wp:... -->` / `<!-- /wp:... -->` block delimiters.
fn strip_block_comments(html: &str) -> String {
    static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)<!--\s*/?wp:[\w/-]+.*?-->").expect("valid regex")
    });

    BLOCK_RE.replace_all(html, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: Headings
// ---------------------------------------------------------------------------

fn convert_headings(html: &str) -> String {
    static H_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<h([1-6])(?:\s[^>]*)?>(.*?)</h[1-6]>").expect("valid regex")
    });

    H_RE.replace_all(html, |caps: &Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), caps[2].trim())
    })
    .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Links
// ---------------------------------------------------------------------------

fn convert_links(html: &str) -> String {
    static A_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?is)<a\s[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#).expect("valid regex")
    });

    A_RE.replace_all(html, "[${2}](${1})").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: Bold / italic
// ---------------------------------------------------------------------------

fn convert_emphasis(html: &str) -> String {
    static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<(?:strong|b)(?:\s[^>]*)?>(.*?)</(?:strong|b)>").expect("valid regex")
    });
    static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<(?:em|i)(?:\s[^>]*)?>(.*?)</(?:em|i)>").expect("valid regex")
    });

    let bold = BOLD_RE.replace_all(html, "**${1}**");
    ITALIC_RE.replace_all(&bold, "*${1}*").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 5: Lists
// ---------------------------------------------------------------------------

static LI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li(?:\s[^>]*)?>(.*?)</li>").expect("valid regex"));

/// Unordered lists become `- item` lines; ordered lists are numbered from 1
/// within each list block.
fn convert_lists(html: &str) -> String {
    static UL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<ul(?:\s[^>]*)?>(.*?)</ul>").expect("valid regex")
    });
    static OL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<ol(?:\s[^>]*)?>(.*?)</ol>").expect("valid regex")
    });

    let unordered = UL_RE.replace_all(html, |caps: &Captures| {
        render_list(&caps[1], |_| "-".to_string())
    });
    OL_RE
        .replace_all(&unordered, |caps: &Captures| {
            render_list(&caps[1], |n| format!("{n}."))
        })
        .into_owned()
}

fn render_list(inner: &str, marker: impl Fn(usize) -> String) -> String {
    let lines: Vec<String> = LI_RE
        .captures_iter(inner)
        .enumerate()
        .map(|(i, caps)| format!("{} {}", marker(i + 1), caps[1].trim()))
        .collect();
    format!("\n\n{}\n\n", lines.join("\n"))
}

// ---------------------------------------------------------------------------
// Pass 6: Images
// ---------------------------------------------------------------------------

fn convert_images(html: &str) -> String {
    static IMG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<img\s[^>]*>").expect("valid regex"));
    static SRC_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?i)\ssrc="([^"]*)""#).expect("valid regex"));
    static ALT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?i)\salt="([^"]*)""#).expect("valid regex"));

    IMG_RE
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            let Some(src) = SRC_RE.captures(tag).map(|c| c[1].to_string()) else {
                return String::new();
            };
            let alt = ALT_RE
                .captures(tag)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            format!("![{alt}]({src})")
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 7: Blockquotes
// ---------------------------------------------------------------------------

/// Prefix every line of the quoted content with `> `.
///
/// Paragraphs inside the quote are unwrapped first so their text lands on
/// prefixed lines instead of escaping the quote in pass 8.
fn convert_blockquotes(html: &str) -> String {
    static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<blockquote(?:\s[^>]*)?>(.*?)</blockquote>").expect("valid regex")
    });

    QUOTE_RE
        .replace_all(html, |caps: &Captures| {
            let inner = collapse_blank_lines(&convert_paragraphs(&caps[1]));
            let quoted: Vec<String> = inner
                .lines()
                .map(|line| {
                    if line.trim().is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {line}")
                    }
                })
                .collect();
            format!("\n\n{}\n\n", quoted.join("\n"))
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 8: Paragraphs and line breaks
// ---------------------------------------------------------------------------

fn convert_paragraphs(html: &str) -> String {
    static P_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").expect("valid regex"));
    static BR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

    let unwrapped = P_RE.replace_all(html, "\n\n${1}\n\n");
    BR_RE.replace_all(&unwrapped, "\n").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 9: Remaining tags
// ---------------------------------------------------------------------------

fn strip_tags(html: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

    TAG_RE.replace_all(html, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 10: Entities
// ---------------------------------------------------------------------------

/// Decode the entities in [`ENTITY_TABLE`] in a single pass.
pub fn decode_entities(text: &str) -> String {
    decode_entities_with(text, ENTITY_TABLE)
}

/// Decode entities against an explicit `(name, replacement)` table.
///
/// Each entity is replaced once, so `&amp;lt;` becomes `&lt;`, not `<`.
pub fn decode_entities_with(text: &str, table: &[(&str, &str)]) -> String {
    static ENTITY_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"&(#\d+|[A-Za-z]+);").expect("valid regex"));

    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            table
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| (*value).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 11: Whitespace
// ---------------------------------------------------------------------------

/// Trim line ends, collapse 3+ newlines to 2, trim the whole text.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let trimmed_lines = md
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    MULTI_BLANK_RE
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
