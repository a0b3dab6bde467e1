//! Debounced foot-pedal trigger.

use embedded_hal::digital::InputPin;

use crate::clock::Millis;

/// Time a raw level must hold before it becomes the stable level.
pub const DEBOUNCE_MS: u32 = 40;

/// Logical pedal level, independent of wiring polarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PedalLevel {
    Released,
    Pressed,
}

impl PedalLevel {
    #[must_use]
    pub const fn is_pressed(self) -> bool {
        matches!(self, PedalLevel::Pressed)
    }
}

/// Emitted once per debounced released-to-pressed transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PressEdge {
    pub at: Millis,
}

/// Source of instantaneous pedal samples.
pub trait PedalInput {
    fn level(&mut self) -> PedalLevel;
}

impl PedalInput for PedalLevel {
    fn level(&mut self) -> PedalLevel {
        *self
    }
}

/// Pedal wired to a pulled-up input that reads low while pressed.
///
/// A pin read failure reads as released so it can never start a weld.
pub struct ActiveLowPedal<P> {
    pin: P,
}

impl<P: InputPin> ActiveLowPedal<P> {
    pub const fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: InputPin> PedalInput for ActiveLowPedal<P> {
    fn level(&mut self) -> PedalLevel {
        match self.pin.is_low() {
            Ok(true) => PedalLevel::Pressed,
            Ok(false) | Err(_) => PedalLevel::Released,
        }
    }
}

/// Contact-bounce filter for the pedal.
///
/// Every raw transition restarts the window, so the stable level only moves
/// after the input has been quiet for the whole window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Debouncer {
    raw: PedalLevel,
    stable: PedalLevel,
    last_change: Millis,
    window_ms: u32,
}

impl Debouncer {
    /// Starts with `initial` as both the raw and the stable level.
    #[must_use]
    pub const fn new(initial: PedalLevel, now: Millis, window_ms: u32) -> Self {
        Self {
            raw: initial,
            stable: initial,
            last_change: now,
            window_ms,
        }
    }

    /// Feeds one sample and reports a press edge if one just became stable.
    pub fn sample(&mut self, raw: PedalLevel, now: Millis) -> Option<PressEdge> {
        if raw != self.raw {
            self.raw = raw;
            self.last_change = now;
        }

        if now.wrapping_since(self.last_change) >= self.window_ms && self.raw != self.stable {
            let previous = self.stable;
            self.stable = self.raw;
            if previous == PedalLevel::Released && self.stable == PedalLevel::Pressed {
                return Some(PressEdge { at: now });
            }
        }

        None
    }

    #[must_use]
    pub const fn stable(&self) -> PedalLevel {
        self.stable
    }

    #[must_use]
    pub const fn raw(&self) -> PedalLevel {
        self.raw
    }

    #[must_use]
    pub const fn last_change(&self) -> Millis {
        self.last_change
    }
}
