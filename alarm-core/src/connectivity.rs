// Wireless association management with a bounded, fixed-backoff retry

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use serde::Serialize;

use crate::config::RetryPolicy;

// ESP-IDF / 802.11 disconnect reason codes we care about
const REASON_AUTH_EXPIRE: u32 = 2;
const REASON_ASSOC_LEAVE: u32 = 8;
const REASON_4WAY_HANDSHAKE_TIMEOUT: u32 = 15;
const REASON_BEACON_TIMEOUT: u32 = 200;
const REASON_NO_AP_FOUND: u32 = 201;
const REASON_AUTH_FAIL: u32 = 202;
const REASON_HANDSHAKE_TIMEOUT: u32 = 204;
const REASON_CONNECTION_FAIL: u32 = 205;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectivityStatus {
    Disconnected,
    Connected,
}

/// Raw link state as reported by the radio driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connected,
    NoNetworkFound,
    CredentialsRejected,
    ConnectionLost,
    Disconnected,
}

impl LinkStatus {
    /// Map a station disconnect reason code to a link status.
    pub fn from_disconnect_reason(reason: u32) -> Self {
        match reason {
            REASON_NO_AP_FOUND => LinkStatus::NoNetworkFound,
            REASON_AUTH_FAIL
            | REASON_AUTH_EXPIRE
            | REASON_4WAY_HANDSHAKE_TIMEOUT
            | REASON_HANDSHAKE_TIMEOUT => LinkStatus::CredentialsRejected,
            REASON_BEACON_TIMEOUT | REASON_ASSOC_LEAVE | REASON_CONNECTION_FAIL => {
                LinkStatus::ConnectionLost
            }
            _ => LinkStatus::Disconnected,
        }
    }
}

/// Coarse reason logged when association times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    NetworkNotFound,
    CredentialsRejected,
    LinkLost,
    Unspecified,
}

impl From<LinkStatus> for FailureReason {
    fn from(status: LinkStatus) -> Self {
        match status {
            LinkStatus::NoNetworkFound => FailureReason::NetworkNotFound,
            LinkStatus::CredentialsRejected => FailureReason::CredentialsRejected,
            LinkStatus::ConnectionLost => FailureReason::LinkLost,
            LinkStatus::Connected | LinkStatus::Disconnected => FailureReason::Unspecified,
        }
    }
}

impl FailureReason {
    pub fn describe(&self) -> &'static str {
        match self {
            FailureReason::NetworkNotFound => "network not found",
            FailureReason::CredentialsRejected => "credentials rejected",
            FailureReason::LinkLost => "connection lost",
            FailureReason::Unspecified => "unspecified",
        }
    }
}

/// The wireless station interface.
pub trait Link {
    fn is_connected(&mut self) -> bool;

    /// Start association with the configured credentials. Must not block
    /// until associated; progress is observed through [`Link::is_connected`].
    fn begin_connect(&mut self) -> Result<()>;

    fn status(&mut self) -> LinkStatus;

    fn ip_address(&mut self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    AlreadyConnected,
    /// `attempts` counts the backoff waits taken before the link came up.
    Connected { attempts: u32 },
    Failed { reason: FailureReason },
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        !matches!(self, ConnectOutcome::Failed { .. })
    }

    pub fn status(&self) -> ConnectivityStatus {
        if self.is_connected() {
            ConnectivityStatus::Connected
        } else {
            ConnectivityStatus::Disconnected
        }
    }
}

/// Make sure the link is associated, blocking at most
/// `policy.max_attempts * policy.backoff_ms`. Failure is not an error: the
/// caller just skips this cycle.
pub fn ensure_connected<L, D>(link: &mut L, policy: &RetryPolicy, delay: &mut D) -> ConnectOutcome
where
    L: Link + ?Sized,
    D: DelayNs + ?Sized,
{
    if link.is_connected() {
        return ConnectOutcome::AlreadyConnected;
    }

    log::info!(
        "Connecting to WiFi (up to {} attempts, {} ms apart)...",
        policy.max_attempts,
        policy.backoff_ms
    );

    if let Err(e) = link.begin_connect() {
        log::warn!("Failed to start WiFi association: {:?}", e);
    }

    // Check before each wait; one last check follows the final wait.
    let mut waited = 0;
    loop {
        if link.is_connected() {
            match link.ip_address() {
                Some(ip) => log::info!("WiFi connected after {} attempts, IP: {}", waited, ip),
                None => log::info!("WiFi connected after {} attempts", waited),
            }
            return ConnectOutcome::Connected { attempts: waited };
        }

        if waited == policy.max_attempts {
            break;
        }
        delay.delay_ms(policy.backoff_ms);
        waited += 1;

        if waited % 5 == 0 {
            log::info!("Still waiting for WiFi... ({}/{})", waited, policy.max_attempts);
        }
    }

    let reason = FailureReason::from(link.status());
    log::error!("WiFi connection failed: {}", reason.describe());
    ConnectOutcome::Failed { reason }
}
