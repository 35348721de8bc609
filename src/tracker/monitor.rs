//! The watch loop for one page.
//!
//! Each tick takes a snapshot, decides synchronously whether it carries a new
//! solve, and if so relays it. The relay runs on its own task and is waited on
//! for at most one cooldown.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::Url;

use super::event::{is_success_verdict, SubmissionEvent};
use super::page::{PageSnapshot, PageSource};
use super::platforms::{ExtractContext, ParsedPage, PlatformScraper};
use super::profile::{LocalProfile, ProfileStore};
use super::relay::{Relay, RelayOutcome};
use super::suppressor::{Decision, Suppressor};

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub email: String,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    /// Wait after navigation before the new page is inspected.
    pub settle_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No relevant page attached.
    Idle,
    Monitoring,
    /// A verdict is on the page and is being evaluated.
    Detected,
    /// The last tick handed an event to the relay.
    Emitted,
}

#[derive(Debug)]
pub enum TickOutcome {
    SourceError(String),
    Settling,
    Irrelevant,
    Unchanged,
    NoSignal,
    /// A verdict was found but does not mean the problem was solved.
    NotSolved { verdict: String },
    Suppressed(Decision),
    Relayed {
        event: SubmissionEvent,
        outcome: RelayOutcome,
    },
    /// The relay outlived the cooldown; its result will only be logged.
    RelayPending { event: SubmissionEvent },
}

/// Per-page memory. Dropped wholesale when the URL changes.
struct Session {
    url: Url,
    settle_until: Instant,
    fingerprint: Option<u64>,
    suppressor: Suppressor,
    attempts: HashMap<String, u32>,
}

impl Session {
    fn new(url: Url, settle_until: Instant, cooldown: Duration) -> Self {
        Self {
            url,
            settle_until,
            fingerprint: None,
            suppressor: Suppressor::new(cooldown),
            attempts: HashMap::new(),
        }
    }
}

enum Observation {
    Skip(TickOutcome),
    Emit(SubmissionEvent),
}

pub struct Monitor<S> {
    source: S,
    scraper: Box<dyn PlatformScraper>,
    relay: Relay,
    profiles: ProfileStore,
    profile: LocalProfile,
    profile_dirty: bool,
    config: MonitorConfig,
    session: Option<Session>,
    state: MonitorState,
}

impl<S: PageSource> Monitor<S> {
    pub fn new(
        source: S,
        scraper: Box<dyn PlatformScraper>,
        relay: Relay,
        profiles: ProfileStore,
        profile: LocalProfile,
        config: MonitorConfig,
    ) -> Self {
        Self {
            source,
            scraper,
            relay,
            profiles,
            profile,
            profile_dirty: false,
            config,
            session: None,
            state: MonitorState::Idle,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn profile(&self) -> &LocalProfile {
        &self.profile
    }

    /// Polls until `shutdown` resolves, then saves the profile.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "Watching for {} submissions every {:?}",
            self.scraper.kind(),
            self.config.poll_interval
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    let outcome = self.tick().await;
                    debug!(?outcome, state = ?self.state, "tick");
                }
            }
        }

        info!("Watcher stopping");
        self.persist_profile().await;
    }

    pub async fn tick(&mut self) -> TickOutcome {
        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Could not read page: {}", e);
                return TickOutcome::SourceError(e.to_string());
            }
        };

        let event = match self.observe(&snapshot, Instant::now(), Utc::now()) {
            Observation::Skip(outcome) => {
                if self.profile_dirty {
                    self.persist_profile().await;
                }
                return outcome;
            }
            Observation::Emit(event) => event,
        };

        self.persist_profile().await;
        self.relay_event(event).await
    }

    async fn relay_event(&mut self, event: SubmissionEvent) -> TickOutcome {
        info!(
            "Solved {} on {} (attempt {}), relaying",
            event.slug, event.platform, event.attempts
        );

        let relay = self.relay.clone();
        let payload = event.clone();
        let mut handle = tokio::spawn(async move { relay.send(&payload).await });

        let outcome = match tokio::time::timeout(self.config.cooldown, &mut handle).await {
            Ok(joined) => {
                let outcome = match joined {
                    Ok(result) => RelayOutcome::from(&result),
                    Err(e) => RelayOutcome {
                        success: false,
                        data: None,
                        error: Some(format!("relay task failed: {}", e)),
                    },
                };
                if let Some(error) = &outcome.error {
                    warn!("Relay of {} failed: {}", event.slug, error);
                }
                if let Some(session) = self.session.as_mut() {
                    session.suppressor.complete();
                }
                TickOutcome::Relayed { event, outcome }
            }
            Err(_) => {
                warn!(
                    "Relay of {} still running after {:?}, no longer waiting",
                    event.slug, self.config.cooldown
                );
                let slug = event.slug.clone();
                tokio::spawn(async move {
                    match handle.await {
                        Ok(Ok(delivery)) => info!("Late relay of {} reached {}", slug, delivery.endpoint),
                        Ok(Err(e)) => warn!("Late relay of {} failed: {}", slug, e),
                        Err(e) => warn!("Late relay of {} aborted: {}", slug, e),
                    }
                });
                TickOutcome::RelayPending { event }
            }
        };

        self.state = MonitorState::Emitted;
        outcome
    }

    /// Everything a tick decides before any I/O. The parsed page never
    /// outlives this call.
    fn observe(&mut self, snapshot: &PageSnapshot, now: Instant, wall: DateTime<Utc>) -> Observation {
        let navigated = self
            .session
            .as_ref()
            .map_or(true, |s| s.url != snapshot.url);
        if navigated {
            let settle_until = match &self.session {
                Some(previous) => {
                    info!("Navigated from {} to {}, resetting session", previous.url, snapshot.url);
                    now + self.config.settle_delay
                }
                None => now,
            };
            self.session = Some(Session::new(snapshot.url.clone(), settle_until, self.config.cooldown));
            self.state = MonitorState::Idle;
        }

        let Some(session) = self.session.as_mut() else {
            return Observation::Skip(TickOutcome::Settling);
        };
        if now < session.settle_until {
            return Observation::Skip(TickOutcome::Settling);
        }

        let fingerprint = snapshot.fingerprint();
        if session.fingerprint == Some(fingerprint) {
            if self.state == MonitorState::Emitted {
                self.state = MonitorState::Monitoring;
            }
            return Observation::Skip(TickOutcome::Unchanged);
        }
        session.fingerprint = Some(fingerprint);

        let page = ParsedPage::parse(snapshot);
        if !self.scraper.is_relevant(&page) {
            self.state = MonitorState::Idle;
            return Observation::Skip(TickOutcome::Irrelevant);
        }
        self.state = MonitorState::Monitoring;

        let Some(signal) = self.scraper.detect(&page) else {
            return Observation::Skip(TickOutcome::NoSignal);
        };
        self.state = MonitorState::Detected;

        if let Some(name) = self.scraper.username(&page) {
            if self.profile.username.as_deref() != Some(name.as_str()) {
                debug!("Caching username {}", name);
                self.profile.username = Some(name);
                self.profile_dirty = true;
            }
        }

        let ctx = ExtractContext {
            email: &self.config.email,
            cached_username: self.profile.username.as_deref(),
            now: wall,
        };
        let mut event = self.scraper.extract(signal, &page, &ctx);
        drop(page);

        if !is_success_verdict(&event.verdict) {
            debug!("Verdict {:?} on {} is not a solve", event.verdict, event.url);
            self.state = MonitorState::Monitoring;
            return Observation::Skip(TickOutcome::NotSolved {
                verdict: event.verdict,
            });
        }

        let key = event.dedup_key().to_string();
        let decision = session
            .suppressor
            .check_submission(event.submission_id.as_deref(), &key, now);
        if decision != Decision::Accepted {
            debug!("Suppressed {} ({:?})", key, decision);
            self.state = MonitorState::Monitoring;
            return Observation::Skip(TickOutcome::Suppressed(decision));
        }

        let profile = &mut self.profile;
        let count = session
            .attempts
            .entry(key.clone())
            .or_insert_with(|| profile.attempts_for(&key));
        *count += 1;
        event.attempts = *count;
        profile.attempts.insert(key, *count);
        self.profile_dirty = true;

        Observation::Emit(event)
    }

    async fn persist_profile(&mut self) {
        match self.profiles.save(&self.profile).await {
            Ok(()) => self.profile_dirty = false,
            Err(e) => warn!("Could not save profile: {}", e),
        }
    }
}
