use super::{ParsedPage, PlatformScraper, RawSignal};
use crate::db::Platform;
use crate::slug::title_from_slug;

const RESULT_SELECTORS: &[&str] = &[
    r#"[data-e2e-locator="submission-result"]"#,
    r#"[data-e2e-locator="console-result"]"#,
    ".result__2cm",
];

const TITLE_SELECTORS: &[&str] = &[
    r#"[data-e2e-locator="question-title"]"#,
    ".text-title-large",
    ".question-title",
    "h1",
];

const LANGUAGE_SELECTORS: &[&str] = &[
    r#"[data-cy="lang-select"]"#,
    ".ant-select-selection-item",
    ".language-selector",
];

const VERDICT_KEYWORDS: &[&str] = &[
    "Accepted",
    "Wrong Answer",
    "Runtime Error",
    "Time Limit Exceeded",
    "Memory Limit Exceeded",
    "Compile Error",
];

pub struct LeetCode;

impl LeetCode {
    fn problem_slug(page: &ParsedPage) -> Option<String> {
        page.path_segment_after(&["problems"])
    }

    fn title(page: &ParsedPage) -> Option<String> {
        page.first_text(TITLE_SELECTORS)
            .map(|t| strip_numbering(&t).to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| Self::problem_slug(page).map(|s| title_from_slug(&s)))
    }
}

/// "1. Two Sum" -> "Two Sum".
fn strip_numbering(title: &str) -> &str {
    match title.split_once(". ") {
        Some((number, rest)) if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) => {
            rest.trim()
        }
        _ => title.trim(),
    }
}

impl PlatformScraper for LeetCode {
    fn kind(&self) -> Platform {
        Platform::Leetcode
    }

    fn is_relevant(&self, page: &ParsedPage) -> bool {
        page.path_contains("/problems/")
    }

    fn detect(&self, page: &ParsedPage) -> Option<RawSignal> {
        let verdict = page.first_text(RESULT_SELECTORS).or_else(|| {
            page.find_text(|text| VERDICT_KEYWORDS.iter().any(|k| text == *k))
        })?;

        Some(RawSignal {
            verdict,
            title: Self::title(page),
            slug: Self::problem_slug(page),
            language: page.first_text(LANGUAGE_SELECTORS),
            contest_id: None,
            submission_id: page.path_segment_after(&["submissions"]),
        })
    }

    fn username(&self, page: &ParsedPage) -> Option<String> {
        let from_link = page.first_attr(&[r#"a[href^="/u/"]"#], "href").and_then(|href| {
            href.trim_start_matches("/u/")
                .split('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        });

        from_link
            .or_else(|| {
                page.first_attr(&[r#"img[alt*="'s avatar"]"#], "alt")
                    .and_then(|alt| alt.split("'s avatar").next().map(|s| s.trim().to_string()))
                    .filter(|s| !s.is_empty())
            })
            .or_else(|| page.first_text(&[r#"[data-cy="header-user-menu"] span"#]))
    }
}
