use scraper::Selector;

use super::{element_text, ParsedPage, PlatformScraper, RawSignal};
use crate::db::Platform;
use crate::slug::title_from_slug;

const SOLVED_BANNER: &str = "Problem Solved Successfully";

const RESULT_SELECTORS: &[&str] = &[
    r#"[data-e2e-locator="submission-result"]"#,
    ".submission-result",
    ".result-success",
    ".alert-success",
    ".accepted",
    ".correct",
    ".success",
];

const PRACTICE_RESULT_SELECTORS: &[&str] = &[".practice-result", ".problem-result"];
const SUBMISSION_TABLES: &[&str] = &[".submissions-table", ".results-table"];
const STATEMENT_SELECTORS: &[&str] = &[".problem-statement", ".practice-problem"];

const TITLE_SELECTORS: &[&str] = &[
    r#"[data-e2e-locator="problem-title"]"#,
    ".problem-title",
    ".practice-title",
    ".gfg-problem-title",
    "h1",
];

const LANGUAGE_SELECTORS: &[&str] = &[".language-selector", ".code-language", ".editor-language"];

pub struct GeeksForGeeks;

impl GeeksForGeeks {
    fn title(page: &ParsedPage) -> Option<String> {
        page.first_text(TITLE_SELECTORS).or_else(|| {
            page.path_segment_after(&["problems", "practice"])
                .map(|s| title_from_slug(&s))
        })
    }

    fn language(page: &ParsedPage) -> Option<String> {
        page.first_text(LANGUAGE_SELECTORS)
            .or_else(|| page.first_attr(&["[data-language]"], "data-language"))
    }

    fn verdict(page: &ParsedPage) -> Option<String> {
        let banner = SOLVED_BANNER.to_lowercase();
        page.find_text(|text| text.to_lowercase().contains(&banner))
            .map(|_| SOLVED_BANNER.to_string())
            .or_else(|| page.first_text(RESULT_SELECTORS))
            .or_else(|| Self::latest_table_status(page))
            .or_else(|| page.first_text(PRACTICE_RESULT_SELECTORS))
    }

    /// Status cell of the newest row in a submissions table.
    fn latest_table_status(page: &ParsedPage) -> Option<String> {
        let table = page.first_element(SUBMISSION_TABLES)?;
        let rows = Selector::parse("tr").ok()?;
        let status = Selector::parse(".status, td:nth-child(2)").ok()?;
        let latest = table.select(&rows).nth(1)?;
        latest
            .select(&status)
            .map(element_text)
            .find(|t| !t.is_empty())
    }
}

impl PlatformScraper for GeeksForGeeks {
    fn kind(&self) -> Platform {
        Platform::Geeksforgeeks
    }

    fn is_relevant(&self, page: &ParsedPage) -> bool {
        page.path_contains("/problems/")
            || page.path_contains("/practice/")
            || page.exists(STATEMENT_SELECTORS)
    }

    fn detect(&self, page: &ParsedPage) -> Option<RawSignal> {
        let verdict = Self::verdict(page)?;
        Some(RawSignal {
            verdict,
            title: Self::title(page),
            slug: None,
            language: Self::language(page),
            contest_id: None,
            submission_id: None,
        })
    }

    fn username(&self, page: &ParsedPage) -> Option<String> {
        let href = page.first_attr(&[r#"a[href*="/user/"]"#], "href")?;
        href.split("/user/")
            .nth(1)?
            .split('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
