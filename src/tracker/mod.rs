//! Page watchers.
//!
//! A [`Monitor`] polls a [`PageSource`], asks a [`PlatformScraper`] whether the
//! page shows a solved problem, filters repeats through a [`Suppressor`] and
//! hands accepted events to the [`Relay`].

pub mod event;
pub mod monitor;
pub mod page;
pub mod platforms;
pub mod profile;
pub mod relay;
pub mod suppressor;

pub use event::{is_success_verdict, SubmissionEvent, ANONYMOUS};
pub use monitor::{Monitor, MonitorConfig, MonitorState, TickOutcome};
pub use page::{HttpPageSource, PageError, PageSnapshot, PageSource};
pub use platforms::{scraper_for, ExtractContext, ParsedPage, PlatformScraper, RawSignal};
pub use profile::{LocalProfile, ProfileError, ProfileStore};
pub use relay::{Delivery, Relay, RelayError, RelayOutcome};
pub use suppressor::{Decision, Suppressor};
