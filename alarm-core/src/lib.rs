//! Alarm Core - Hardware-independent logic for the leopard alarm poller
//!
//! This crate contains every decision the firmware makes (scheduling,
//! response classification, annunciator timing, reconnect policy) so it can
//! be tested on the host platform without requiring ESP32 hardware.

pub mod annunciator;
pub mod classify;
pub mod config;
pub mod connectivity;
pub mod poller;
pub mod request;
pub mod scheduler;
pub mod time;

pub use annunciator::{Annunciator, AnnunciatorEvent};
pub use classify::{classify_body, AlarmSource, PollOutcome};
pub use config::{EndpointConfig, NetworkConfig, PollerConfig, RetryPolicy, TimingConfig};
pub use connectivity::{ConnectOutcome, ConnectivityStatus, FailureReason, Link, LinkStatus};
pub use poller::{AlarmPoller, AlarmTransport, HttpReply, PollerSnapshot};
pub use scheduler::Scheduler;
pub use time::Clock;
