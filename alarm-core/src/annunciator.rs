//! Local annunciator: a visual and an audible output driven for a fixed time.
//!
//! ```text
//!          trigger(now)                 elapsed >= duration
//!  Idle ───────────────► Active ─────────────────────────► Idle
//!                         │  ▲
//!                         └──┘ trigger(now): restart the clock
//! ```
//!
//! While active the audible output stays on and the visual output blinks,
//! on for the first half of every blink period. The pattern is derived from
//! the time elapsed since the trigger; there is no separate blink timer.
//! Nothing but time leaves `Active`.

use embedded_hal::digital::{OutputPin, PinState};

use crate::config::TimingConfig;
use crate::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Active { started_at: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnunciatorEvent {
    None,
    Started,
    Retriggered,
    Stopped,
}

/// Output levels `(visual, audible)` for a given time since the trigger.
pub fn active_levels(elapsed_ms: u32, blink_period_ms: u32) -> (bool, bool) {
    let period = blink_period_ms.max(1);
    (elapsed_ms % period < period / 2, true)
}

pub struct Annunciator<V, A> {
    visual: V,
    audible: A,
    state: State,
    duration_ms: u32,
    blink_period_ms: u32,
}

impl<V: OutputPin, A: OutputPin> Annunciator<V, A> {
    /// Takes ownership of both pins and drives them off.
    pub fn new(visual: V, audible: A, timing: &TimingConfig) -> Self {
        let mut annunciator = Self {
            visual,
            audible,
            state: State::Idle,
            duration_ms: timing.alarm_duration_ms,
            blink_period_ms: timing.blink_period_ms,
        };
        annunciator.drive(false, false);
        annunciator
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active { .. })
    }

    pub fn started_at(&self) -> Option<u32> {
        match self.state {
            State::Active { started_at } => Some(started_at),
            State::Idle => None,
        }
    }

    /// Positive poll result. A repeat trigger restarts the clock rather than
    /// stacking a second activation.
    pub fn trigger(&mut self, now: u32) -> AnnunciatorEvent {
        let event = if self.is_active() {
            log::warn!("Alarm retriggered while active - restarting local alarm");
            AnnunciatorEvent::Retriggered
        } else {
            log::warn!("ALARM TRIGGERED! Driving light and buzzer for {} ms", self.duration_ms);
            AnnunciatorEvent::Started
        };

        self.state = State::Active { started_at: now };
        self.drive(true, true);
        event
    }

    /// Called every loop iteration: advances the blink pattern and stops the
    /// alarm once the duration has elapsed.
    pub fn update(&mut self, now: u32) -> AnnunciatorEvent {
        let State::Active { started_at } = self.state else {
            return AnnunciatorEvent::None;
        };

        let elapsed = time::elapsed_ms(now, started_at);
        if elapsed >= self.duration_ms {
            self.state = State::Idle;
            self.drive(false, false);
            log::info!("Alarm stopped after {} ms", elapsed);
            return AnnunciatorEvent::Stopped;
        }

        let (visual, audible) = active_levels(elapsed, self.blink_period_ms);
        self.drive(visual, audible);
        AnnunciatorEvent::None
    }

    fn drive(&mut self, visual: bool, audible: bool) {
        if let Err(e) = self.visual.set_state(PinState::from(visual)) {
            log::warn!("Failed to drive visual indicator: {:?}", e);
        }
        if let Err(e) = self.audible.set_state(PinState::from(audible)) {
            log::warn!("Failed to drive audible indicator: {:?}", e);
        }
    }
}
