use scraper::{ElementRef, Selector};
use std::time::Duration;

use super::{element_text, ParsedPage, PlatformScraper, RawSignal};
use crate::db::Platform;

const VERDICT_SELECTORS: &[&str] = &[".verdict-accepted", ".verdict-wa", ".verdict-tle", ".verdict"];
const PROBLEM_SELECTORS: &[&str] = &[".problem-title", ".title"];
const STATUS_TABLES: &[&str] = &[".status-frame-datatable", ".submissions-table"];
const LANGUAGE_SELECTORS: &[&str] = &[".language", ".programming-language"];
const USER_SELECTORS: &[&str] = &[".user-name", ".rated-user", ".handle"];

pub struct Codeforces;

/// Text of the first descendant of `scope` matching any selector.
fn text_within(scope: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|s| {
        let selector = Selector::parse(s).ok()?;
        scope
            .select(&selector)
            .map(element_text)
            .find(|t| !t.is_empty())
    })
}

impl Codeforces {
    fn contest_id(page: &ParsedPage) -> Option<String> {
        page.path_segment_after(&["contest", "gym"]).or_else(|| {
            // /problemset/problem/<contest>/<index>
            page.path_segment_after(&["problem"])
                .filter(|seg| seg.chars().all(|c| c.is_ascii_digit()))
        })
    }

    fn signal(page: &ParsedPage, verdict: String, title: Option<String>) -> RawSignal {
        RawSignal {
            verdict,
            slug: None,
            title,
            language: page.first_text(LANGUAGE_SELECTORS),
            contest_id: Self::contest_id(page),
            submission_id: page.path_segment_after(&["submission"]),
        }
    }

    /// A single submission's page.
    fn from_submission_page(page: &ParsedPage) -> Option<RawSignal> {
        if !page.path_contains("/submission/") {
            return None;
        }
        let verdict = page.first_text(VERDICT_SELECTORS)?;
        Some(Self::signal(page, verdict, page.first_text(PROBLEM_SELECTORS)))
    }

    /// Newest row of a status table (the first row is the header).
    fn from_status_table(page: &ParsedPage) -> Option<RawSignal> {
        let table = page.first_element(STATUS_TABLES)?;
        let rows = Selector::parse("tr").ok()?;
        let latest = table.select(&rows).nth(1)?;
        let verdict = text_within(latest, VERDICT_SELECTORS)?;
        let title = text_within(latest, PROBLEM_SELECTORS)?;
        Some(Self::signal(page, verdict, Some(title)))
    }

    /// First accepted verdict on a contest page, titled by its row.
    fn from_contest_page(page: &ParsedPage) -> Option<RawSignal> {
        if !page.path_contains("/contest/") {
            return None;
        }
        let accepted = Selector::parse(".verdict-accepted").ok()?;
        let cell = page.document.select(&accepted).next()?;
        let row = cell
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "tr")?;
        let title = text_within(row, PROBLEM_SELECTORS)?;
        Some(Self::signal(page, "Accepted".to_string(), Some(title)))
    }
}

impl PlatformScraper for Codeforces {
    fn kind(&self) -> Platform {
        Platform::Codeforces
    }

    fn default_cooldown(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn is_relevant(&self, page: &ParsedPage) -> bool {
        ["/submission/", "/status", "/contest/", "/problemset/"]
            .iter()
            .any(|p| page.path_contains(p))
    }

    fn detect(&self, page: &ParsedPage) -> Option<RawSignal> {
        Self::from_submission_page(page)
            .or_else(|| Self::from_status_table(page))
            .or_else(|| Self::from_contest_page(page))
    }

    fn username(&self, page: &ParsedPage) -> Option<String> {
        page.first_text(USER_SELECTORS).or_else(|| {
            page.first_attr(&[r#"a[href^="/profile/"]"#], "href")
                .and_then(|href| {
                    href.trim_start_matches("/profile/")
                        .split('/')
                        .next()
                        .map(str::to_string)
                })
                .filter(|s| !s.is_empty())
        })
    }
}
