//! The alarm poller: owns all loop state and runs one cooperative iteration
//! per [`AlarmPoller::tick`].
//!
//! Each iteration first lets the annunciator advance (blink, auto-stop), then
//! asks the scheduler whether a poll is due. A due poll runs to completion,
//! including a reconnect if the link is down; it is bounded by the request
//! timeout and the retry policy. Nothing in here returns an error: every
//! failure degrades to "no alarm" and a retry on the normal schedule.

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use serde::Serialize;

use crate::annunciator::{Annunciator, AnnunciatorEvent};
use crate::classify::{classify_body, PollOutcome};
use crate::config::PollerConfig;
use crate::connectivity::{self, ConnectOutcome, ConnectivityStatus, Link};
use crate::request::PollRequest;
use crate::scheduler::Scheduler;
use crate::time::Clock;

/// Any response that carried an HTTP status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one JSON POST. `Err` means no HTTP status was obtained at all
/// (DNS, connect, timeout).
pub trait AlarmTransport {
    fn post_json(&mut self, url: &str, body: &[u8], timeout_ms: u32) -> Result<HttpReply>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PollerSnapshot {
    pub connectivity: ConnectivityStatus,
    pub alarm_active: bool,
    pub ms_until_next_poll: u32,
    pub polls: u32,
    pub alarms: u32,
    pub last_outcome: Option<&'static str>,
}

pub struct AlarmPoller<L, T, V, A> {
    config: PollerConfig,
    link: L,
    transport: T,
    annunciator: Annunciator<V, A>,
    scheduler: Scheduler,
    connectivity: ConnectivityStatus,
    polls: u32,
    alarms: u32,
    last_outcome: Option<PollOutcome>,
}

impl<L, T, V, A> AlarmPoller<L, T, V, A>
where
    L: Link,
    T: AlarmTransport,
    V: OutputPin,
    A: OutputPin,
{
    /// Validates the configuration, drives both outputs off and schedules the
    /// first poll for `now`.
    pub fn new(
        config: PollerConfig,
        link: L,
        transport: T,
        visual: V,
        audible: A,
        now: u32,
    ) -> Result<Self> {
        config.validate()?;

        let annunciator = Annunciator::new(visual, audible, &config.timing);
        let scheduler = Scheduler::new(now, &config.timing);

        Ok(Self {
            config,
            link,
            transport,
            annunciator,
            scheduler,
            connectivity: ConnectivityStatus::Disconnected,
            polls: 0,
            alarms: 0,
            last_outcome: None,
        })
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn connectivity(&self) -> ConnectivityStatus {
        self.connectivity
    }

    pub fn is_alarm_active(&self) -> bool {
        self.annunciator.is_active()
    }

    pub fn next_poll_at(&self) -> u32 {
        self.scheduler.next_poll_at()
    }

    pub fn last_outcome(&self) -> Option<&PollOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn snapshot(&self, now: u32) -> PollerSnapshot {
        PollerSnapshot {
            connectivity: self.connectivity,
            alarm_active: self.annunciator.is_active(),
            ms_until_next_poll: self.scheduler.remaining_ms(now),
            polls: self.polls,
            alarms: self.alarms,
            last_outcome: self.last_outcome.as_ref().map(PollOutcome::label),
        }
    }

    /// Associate if needed. Blocks for at most the retry policy's budget.
    pub fn ensure_connected<D: DelayNs + ?Sized>(&mut self, delay: &mut D) -> ConnectOutcome {
        let outcome = connectivity::ensure_connected(&mut self.link, &self.config.retry, delay);
        self.connectivity = outcome.status();
        outcome
    }

    /// One request/response cycle against the endpoint. The request is
    /// stamped with the clock as read after any reconnect wait.
    pub fn query_alarm_status<C, D>(&mut self, clock: &C, delay: &mut D) -> PollOutcome
    where
        C: Clock + ?Sized,
        D: DelayNs + ?Sized,
    {
        if !self.ensure_connected(delay).is_connected() {
            log::warn!("Still offline - skipping this cycle");
            return PollOutcome::Offline;
        }

        let sent_at = clock.now_ms();
        let url = self.config.endpoint.server_url.as_str();
        let body = match PollRequest::new(&self.config.endpoint.device_id, sent_at).to_json() {
            Ok(body) => body,
            Err(e) => {
                log::error!("Failed to encode poll request: {}", e);
                return PollOutcome::TransportFailed {
                    reason: e.to_string(),
                };
            }
        };

        log::info!("Querying {}", url);
        let reply = match self
            .transport
            .post_json(url, &body, self.config.timing.request_timeout_ms)
        {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("HTTP request failed: {:?}", e);
                return PollOutcome::TransportFailed {
                    reason: e.to_string(),
                };
            }
        };

        log::info!("HTTP response code: {}", reply.status);
        log::debug!("Response: {}", String::from_utf8_lossy(&reply.body));

        if !reply.is_success() {
            log::warn!(
                "Server answered HTTP {}: {}",
                reply.status,
                String::from_utf8_lossy(&reply.body)
            );
            return PollOutcome::HttpStatus { code: reply.status };
        }

        let outcome = classify_body(&reply.body);
        match &outcome {
            PollOutcome::Alarm(source) => log::warn!("Server reports alarm ({:?})", source),
            PollOutcome::Clear => log::info!("Server reports no alarm"),
            PollOutcome::Unrecognized { fields } => {
                log::info!("No 'alarm' or 'detection' keys in response; available keys: {:?}", fields)
            }
            PollOutcome::DecodeFailed { reason } => log::error!("JSON parse failed: {}", reason),
            _ => {}
        }
        outcome
    }

    /// One loop iteration. Returns the poll outcome if a poll ran.
    pub fn tick<C, D>(&mut self, clock: &C, delay: &mut D) -> Option<PollOutcome>
    where
        C: Clock + ?Sized,
        D: DelayNs + ?Sized,
    {
        let now = clock.now_ms();
        self.annunciator.update(now);

        if !self.scheduler.is_due(now) {
            if self.scheduler.take_status_slot(now) {
                log::info!("Next server check in {}s", self.scheduler.remaining_ms(now) / 1_000);
            }
            return None;
        }

        log::info!("Time to check server now");
        let outcome = self.query_alarm_status(clock, delay);
        self.polls = self.polls.wrapping_add(1);

        if outcome.is_alarm() {
            // The poll may have blocked; the alarm window starts when the
            // outputs actually turn on.
            let fired_at = clock.now_ms();
            if self.annunciator.trigger(fired_at) == AnnunciatorEvent::Started {
                self.alarms = self.alarms.wrapping_add(1);
            }
            let until = self.scheduler.suppress(fired_at);
            log::info!(
                "Suppressing server queries for {} ms (until t={} ms)",
                self.config.timing.cooldown_ms,
                until
            );
        } else {
            let next = self.scheduler.schedule_next(now);
            log::info!("No alarm from server. Next check at t={} ms", next);
        }

        self.last_outcome = Some(outcome.clone());
        Some(outcome)
    }
}
