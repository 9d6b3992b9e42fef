//! Recognition-artifact correction.
//!
//! All corrections are declarative `(pattern, replacement, precondition)`
//! rules evaluated by one engine in a fixed order. Later rule families assume
//! earlier ones already ran: unit-spacing rules expect digit confusions to be
//! fixed, dosage regexes downstream expect units glued to their numbers.
//!
//! The engine iterates each rule to a fixed point, which makes the whole
//! rule set idempotent: `normalize(normalize(t)) == normalize(t)`.

use std::sync::LazyLock;

use regex::Regex;

/// One rewrite rule. `precondition` is a cheap gate: when present and not
/// matched by the input, the rule is skipped without running `pattern`.
struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
    precondition: Option<Regex>,
}

impl RewriteRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            replacement,
            precondition: None,
        }
    }

    fn with_precondition(mut self, pattern: &str) -> Self {
        self.precondition = Some(Regex::new(pattern).unwrap());
        self
    }
}

/// Overlapping confusions ("5OO") need another pass after the first rewrite;
/// runs never exceed a handful of characters.
const MAX_PASSES: usize = 8;

static RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    vec![
        // ── Digit/letter confusions adjacent to numerals ────────────────
        RewriteRule::new("digit-o-after", r"(\d)[Oo]", "${1}0")
            .with_precondition(r"\d"),
        // Not before U: "5IU" is an international-unit dose, not a
        // confused "51U".
        RewriteRule::new("digit-l-after", r"(\d)[lI]([^Uu]|$)", "${1}1${2}")
            .with_precondition(r"\d"),
        RewriteRule::new("digit-s-after", r"(\d)S", "${1}5").with_precondition(r"\d"),
        RewriteRule::new("digit-b-after", r"(\d)B", "${1}8").with_precondition(r"\d"),
        // Before a digit only when not part of a word, so "B12" and "D3"
        // vitamin names survive.
        RewriteRule::new("digit-o-before", r"(^|[^\p{L}\d])[Oo](\d)", "${1}0${2}")
            .with_precondition(r"\d"),
        RewriteRule::new("digit-l-before", r"(^|[^\p{L}\d])[lI](\d)", "${1}1${2}")
            .with_precondition(r"\d"),
        // ── Decimal separator ───────────────────────────────────────────
        RewriteRule::new("decimal-comma", r"(\d),(\d)", "${1}.${2}"),
        // ── Unit spacing (assumes numerals already repaired) ────────────
        RewriteRule::new(
            "unit-glue",
            r"(?i)(\d)\s+(mg|mcg|g|ml|ui|iu)\b",
            "${1}${2}",
        ),
        // ── Diacritic restoration, fixed domain vocabulary ──────────────
        RewriteRule::new("vi-sang", r"(?i)\bsang\b", "sáng"),
        RewriteRule::new("vi-trua", r"(?i)\btrua\b", "trưa"),
        RewriteRule::new("vi-chieu", r"(?i)\bchieu\b", "chiều"),
        RewriteRule::new("vi-toi", r"(?i)\btoi\b", "tối"),
        RewriteRule::new("vi-dem", r"(?i)\bdem\b", "đêm"),
        RewriteRule::new("vi-ngay", r"(?i)\bngay\b", "ngày"),
        RewriteRule::new("vi-lan", r"(?i)\blan\b", "lần"),
        RewriteRule::new("vi-vien", r"(?i)\bvien\b", "viên"),
        RewriteRule::new("vi-uong", r"(?i)\buong\b", "uống"),
        RewriteRule::new("vi-goi", r"(?i)\bgoi\b", "gói"),
        RewriteRule::new("vi-truoc", r"(?i)\btruoc\b", "trước"),
        RewriteRule::new("vi-tai-kham", r"(?i)\btai kham\b", "tái khám"),
        RewriteRule::new("vi-kham", r"(?i)\bkham\b", "khám"),
        RewriteRule::new("vi-luu-y", r"(?i)\bluu y\b", "lưu ý"),
        RewriteRule::new("vi-so-luong", r"(?i)\bso luong\b", "số lượng"),
    ]
});

/// Apply the full rule set in order. Pure; idempotent.
pub fn normalize_text(text: &str) -> String {
    let mut current = text.to_string();
    for rule in RULES.iter() {
        if let Some(pre) = &rule.precondition {
            if !pre.is_match(&current) {
                continue;
            }
        }
        for _ in 0..MAX_PASSES {
            let next = rule.pattern.replace_all(&current, rule.replacement);
            match next {
                std::borrow::Cow::Borrowed(_) => break,
                std::borrow::Cow::Owned(s) => {
                    tracing::trace!(rule = rule.name, "rewrite applied");
                    current = s;
                }
            }
        }
    }
    current
}

/// Strip control characters, trim lines, drop blank lines. Runs before the
/// rule engine so rules never see OCR garbage bytes.
pub fn sanitize_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| {
            c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(
                    c,
                    '.' | ','
                        | ';'
                        | ':'
                        | '-'
                        | '/'
                        | '('
                        | ')'
                        | '['
                        | ']'
                        | '+'
                        | '='
                        | '%'
                        | '#'
                        | '&'
                        | '\''
                        | '"'
                        | '!'
                        | '?'
                        | '*'
                        | '_'
                        | '°'
                        | 'µ'
                )
        })
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
