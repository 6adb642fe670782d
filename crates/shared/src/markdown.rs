use std::sync::LazyLock;

use pulldown_cmark::{html, Event, Options, Parser};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Slug used when a title has no ASCII letters or digits at all.
pub const FALLBACK_SLUG: &str = "untitled";

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static HYPHEN_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").unwrap());
static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]+\)").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*{1,2}([^*]+)\*{1,2}").unwrap());
static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```[\s\S]*?```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

/// Turn a title into a URL slug.
///
/// Non-ASCII text is dropped rather than transliterated, so a Japanese title
/// keeps only its latin letters and digits.
pub fn slugify(title: &str) -> String {
    let lower = title.nfkc().collect::<String>().to_lowercase();

    let cleaned: String = lower
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    let hyphenated = WHITESPACE_RUN.replace_all(cleaned.trim(), "-");
    let collapsed = HYPHEN_RUN.replace_all(&hyphenated, "-");
    let slug = collapsed.trim_matches('-');

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Render markdown to HTML for the CMS. Single newlines become `<br />`.
pub fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Count the characters a reader sees once markdown syntax is removed.
pub fn count_characters(text: &str) -> usize {
    let cleaned = HEADING.replace_all(text, "");
    // images before links, or the link pattern eats the alt text
    let cleaned = IMAGE.replace_all(&cleaned, "$1");
    let cleaned = LINK.replace_all(&cleaned, "$1");
    let cleaned = EMPHASIS.replace_all(&cleaned, "$1");
    let cleaned = CODE_BLOCK.replace_all(&cleaned, "");
    let cleaned = INLINE_CODE.replace_all(&cleaned, "$1");
    cleaned.trim().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Slug Tests ====================

    #[test]
    fn test_slugify_ascii_title() {
        assert_eq!(slugify("pytest tips for beginners"), "pytest-tips-for-beginners");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Rust -- async   I/O!  "), "rust-async-io");
        assert_eq!(slugify("--a--b--"), "a-b");
    }

    #[test]
    fn test_slugify_drops_japanese() {
        assert_eq!(slugify("AI最新ニュース2026年2月号"), "ai20262");
        assert_eq!(slugify("AI 最新 ニュース 2026年 2月号"), "ai-2026-2");
    }

    #[test]
    fn test_slugify_normalizes_fullwidth() {
        assert_eq!(slugify("ＲＵＳＴ　２０２６"), "rust-2026");
    }

    #[test]
    fn test_slugify_falls_back_to_placeholder() {
        assert_eq!(slugify(""), FALLBACK_SLUG);
        assert_eq!(slugify("日本語のみ"), FALLBACK_SLUG);
        assert_eq!(slugify("---"), FALLBACK_SLUG);
    }

    // ==================== HTML Tests ====================

    #[test]
    fn test_markdown_to_html_headings_and_lists() {
        let html = markdown_to_html("# Title\n\n- one\n- two\n");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn test_markdown_to_html_soft_break_becomes_br() {
        let html = markdown_to_html("line one\nline two");
        assert!(html.contains("<br />"));
    }

    #[test]
    fn test_markdown_to_html_tables() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }

    // ==================== Character Count Tests ====================

    #[test]
    fn test_count_plain_text() {
        assert_eq!(count_characters("Hello World"), 11);
        assert_eq!(count_characters(""), 0);
        assert_eq!(count_characters("   \n\n  "), 0);
    }

    #[test]
    fn test_count_strips_headings() {
        assert_eq!(count_characters("# 見出し1\n## 見出し2\n本文"), 12);
    }

    #[test]
    fn test_count_keeps_link_and_image_text() {
        assert_eq!(count_characters("[リンクテキスト](https://example.com)"), 7);
        assert_eq!(
            count_characters("![代替テキスト](https://example.com/image.png)"),
            6
        );
    }

    #[test]
    fn test_count_strips_emphasis_and_code() {
        assert_eq!(
            count_characters("**太字テキスト**と*斜体テキスト*"),
            "太字テキストと斜体テキスト".chars().count()
        );
        assert_eq!(count_characters("変数`foo`の値"), 7);
        assert_eq!(
            count_characters("本文\n```python\nprint('hello')\n```\n残り"),
            "本文\n\n残り".chars().count()
        );
    }
}
