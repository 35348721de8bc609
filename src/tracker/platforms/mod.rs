//! Per-site detection of solved problems.
//!
//! Each site gets one [`PlatformScraper`] implementation holding its selectors.
//! Detection and extraction are pure functions of a parsed page; timing,
//! deduplication and relaying live in the monitor.

mod codeforces;
mod geeksforgeeks;
mod leetcode;

pub use codeforces::Codeforces;
pub use geeksforgeeks::GeeksForGeeks;
pub use leetcode::LeetCode;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

use super::event::{SubmissionEvent, ANONYMOUS};
use super::page::PageSnapshot;
use crate::db::Platform;
use crate::slug::slugify;

/// Longest text node considered by literal-text fallbacks. Longer nodes are
/// prose (problem statements, editorials), not verdict banners.
const MAX_SIGNAL_TEXT: usize = 80;

/// A parsed page. Not `Send`: build it, inspect it, drop it before awaiting.
pub struct ParsedPage {
    pub url: Url,
    pub document: Html,
}

impl ParsedPage {
    pub fn parse(snapshot: &PageSnapshot) -> Self {
        Self {
            url: snapshot.url.clone(),
            document: Html::parse_document(&snapshot.html),
        }
    }

    pub fn path_contains(&self, needle: &str) -> bool {
        self.url.path().contains(needle)
    }

    /// Text of the first element matching any selector, trying selectors in order.
    pub fn first_text(&self, selectors: &[&str]) -> Option<String> {
        selectors.iter().find_map(|s| {
            let selector = Selector::parse(s).ok()?;
            self.document
                .select(&selector)
                .map(element_text)
                .find(|t| !t.is_empty())
        })
    }

    /// Value of `attr` on the first element matching any selector.
    pub fn first_attr(&self, selectors: &[&str], attr: &str) -> Option<String> {
        selectors.iter().find_map(|s| {
            let selector = Selector::parse(s).ok()?;
            self.document
                .select(&selector)
                .filter_map(|el| el.value().attr(attr))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_string)
        })
    }

    pub fn first_element(&self, selectors: &[&str]) -> Option<ElementRef<'_>> {
        selectors.iter().find_map(|s| {
            let selector = Selector::parse(s).ok()?;
            self.document.select(&selector).next()
        })
    }

    pub fn exists(&self, selectors: &[&str]) -> bool {
        self.first_element(selectors).is_some()
    }

    /// First short visible text node satisfying `pred`, whitespace-collapsed.
    pub fn find_text(&self, pred: impl Fn(&str) -> bool) -> Option<String> {
        self.document.tree.nodes().find_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(|p| p.value().as_element().map(|e| e.name()));
            if matches!(parent, Some("script" | "style" | "noscript" | "template")) {
                return None;
            }
            let collapsed = collapse_whitespace(text);
            if collapsed.is_empty() || collapsed.len() > MAX_SIGNAL_TEXT || !pred(collapsed.as_str()) {
                return None;
            }
            Some(collapsed)
        })
    }

    /// Path segment following the first segment equal to one of `markers`.
    pub fn path_segment_after(&self, markers: &[&str]) -> Option<String> {
        let segments: Vec<&str> = self.url.path_segments()?.collect();
        segments
            .iter()
            .position(|seg| markers.contains(seg))
            .and_then(|idx| segments.get(idx + 1))
            .filter(|seg| !seg.is_empty())
            .map(|seg| seg.to_string())
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// What a scraper saw: the verdict plus whatever identifies the problem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSignal {
    pub verdict: String,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub language: Option<String>,
    pub contest_id: Option<String>,
    pub submission_id: Option<String>,
}

/// Locally configured facts the page itself does not carry.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    pub email: &'a str,
    pub cached_username: Option<&'a str>,
    pub now: DateTime<Utc>,
}

pub trait PlatformScraper: Send + Sync {
    fn kind(&self) -> Platform;

    /// Cooldown used by the duplicate suppressor unless configured otherwise.
    fn default_cooldown(&self) -> Duration {
        Duration::from_secs(10)
    }

    /// Whether this page is worth monitoring at all.
    fn is_relevant(&self, page: &ParsedPage) -> bool;

    /// Looks for a judge verdict. Failing verdicts are reported too; the caller
    /// decides what to forward.
    fn detect(&self, page: &ParsedPage) -> Option<RawSignal>;

    fn username(&self, page: &ParsedPage) -> Option<String>;

    /// Builds the event. Missing fields fall back to sentinels, never to errors.
    /// `attempts` is left at 1 for the session to fill in.
    fn extract(
        &self,
        signal: RawSignal,
        page: &ParsedPage,
        ctx: &ExtractContext<'_>,
    ) -> SubmissionEvent {
        let slug = signal
            .slug
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
            .or_else(|| signal.title.as_deref().map(slugify).filter(|s| !s.is_empty()))
            .or_else(|| {
                page.path_segment_after(&["problems", "practice", "problem"])
                    .map(|s| slugify(&s))
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_default();

        let username = self
            .username(page)
            .or_else(|| ctx.cached_username.map(str::to_string))
            .unwrap_or_else(|| ANONYMOUS.to_string());

        SubmissionEvent {
            platform: self.kind(),
            username,
            email: ctx.email.to_string(),
            url: page.url.to_string(),
            slug,
            verdict: signal.verdict,
            attempts: 1,
            timestamp: ctx.now,
            problem_title: signal.title,
            language: signal.language,
            contest_id: signal.contest_id,
            submission_id: signal.submission_id,
        }
    }
}

/// Scraper for a platform, if one exists.
pub fn scraper_for(platform: Platform) -> Option<Box<dyn PlatformScraper>> {
    match platform {
        Platform::Leetcode => Some(Box::new(LeetCode)),
        Platform::Codeforces => Some(Box::new(Codeforces)),
        Platform::Geeksforgeeks => Some(Box::new(GeeksForGeeks)),
        Platform::Hackerrank => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, html: &str) -> ParsedPage {
        ParsedPage::parse(&PageSnapshot::new(Url::parse(url).unwrap(), html))
    }

    #[test]
    fn first_text_respects_selector_priority() {
        let p = page(
            "https://example.com/",
            r#"<div class="b">second</div><div class="a">  first
                 choice </div>"#,
        );
        assert_eq!(p.first_text(&[".a", ".b"]).as_deref(), Some("first choice"));
        assert_eq!(p.first_text(&[".missing", ".b"]).as_deref(), Some("second"));
        assert_eq!(p.first_text(&["[[bad"]), None);
    }

    #[test]
    fn find_text_skips_scripts_and_prose() {
        let p = page(
            "https://example.com/",
            &format!(
                "<script>var s = 'Accepted';</script><p>{}</p><span> Accepted </span>",
                "Accepted answers explain why. ".repeat(10)
            ),
        );
        assert_eq!(
            p.find_text(|t| t.starts_with("Accepted")).as_deref(),
            Some("Accepted")
        );
    }

    #[test]
    fn path_segment_after_marker() {
        let p = page("https://leetcode.com/problems/two-sum/description/", "");
        assert_eq!(p.path_segment_after(&["problems"]).as_deref(), Some("two-sum"));
        assert_eq!(p.path_segment_after(&["contest"]), None);
    }

    #[test]
    fn hackerrank_has_no_scraper() {
        assert!(scraper_for(Platform::Hackerrank).is_none());
        assert_eq!(scraper_for(Platform::Leetcode).unwrap().kind(), Platform::Leetcode);
    }

    struct Plain;

    impl PlatformScraper for Plain {
        fn kind(&self) -> Platform {
            Platform::Leetcode
        }

        fn is_relevant(&self, _page: &ParsedPage) -> bool {
            true
        }

        fn detect(&self, _page: &ParsedPage) -> Option<RawSignal> {
            None
        }

        fn username(&self, _page: &ParsedPage) -> Option<String> {
            None
        }
    }

    #[test]
    fn extract_slug_prefers_candidate_then_title_then_path() {
        let p = page("https://leetcode.com/problems/from-path/", "");
        let ctx = ExtractContext {
            email: "a@b.com",
            cached_username: None,
            now: Utc::now(),
        };
        let signal = RawSignal {
            verdict: "Accepted".into(),
            title: Some("From Title".into()),
            slug: Some("From-Candidate".into()),
            submission_id: Some("42".into()),
            ..Default::default()
        };

        let event = Plain.extract(signal.clone(), &p, &ctx);
        assert_eq!(event.slug, "from-candidate");
        assert_eq!(event.submission_id.as_deref(), Some("42"));
        assert_eq!(event.username, ANONYMOUS);

        let no_candidate = RawSignal { slug: None, ..signal.clone() };
        assert_eq!(Plain.extract(no_candidate, &p, &ctx).slug, "from-title");

        let bare = RawSignal { slug: None, title: None, ..signal };
        assert_eq!(Plain.extract(bare, &p, &ctx).slug, "from-path");
    }
}
