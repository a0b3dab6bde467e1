//! Safety interlock gate guarding every fire request.
//!
//! [`Interlock::authorize_fire`] evaluates boot inhibition, arm expiry, the
//! armed flag, the busy flag, and the post-weld cooldown in that order and
//! reports the first rule that blocks the request.

use core::fmt;

use crate::clock::Millis;

/// Time after power-up during which no weld may start.
pub const BOOT_INHIBIT_MS: u32 = 5_000;

/// Minimum spacing between the end of one weld and the start of the next.
pub const COOLDOWN_MS: u32 = 500;

/// Interlock timing and power-on policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterlockConfig {
    pub boot_inhibit_ms: u32,
    pub cooldown_ms: u32,
    /// Auto-disarm delay after `ARM,1`; `None` keeps the unit armed indefinitely.
    pub arm_timeout_ms: Option<u32>,
    pub armed_at_boot: bool,
}

impl InterlockConfig {
    /// Policy for boards that must be armed explicitly after power-up.
    #[must_use]
    pub const fn disarmed_at_boot() -> Self {
        Self {
            boot_inhibit_ms: BOOT_INHIBIT_MS,
            cooldown_ms: COOLDOWN_MS,
            arm_timeout_ms: None,
            armed_at_boot: false,
        }
    }

    /// Policy for boards that come up armed and rely on the boot inhibit alone.
    #[must_use]
    pub const fn armed_at_boot() -> Self {
        Self {
            armed_at_boot: true,
            ..Self::disarmed_at_boot()
        }
    }

    /// Returns a copy with an arm timeout of `ms` milliseconds.
    ///
    /// Zero disables the timeout.
    #[must_use]
    pub const fn with_arm_timeout(self, ms: u32) -> Self {
        Self {
            arm_timeout_ms: if ms == 0 { None } else { Some(ms) },
            ..self
        }
    }
}

impl Default for InterlockConfig {
    fn default() -> Self {
        Self::disarmed_at_boot()
    }
}

/// Reason a fire request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    BootInhibit { remaining_ms: u32 },
    NotArmed,
    AlreadyWelding,
    Cooldown { remaining_ms: u32 },
}

impl Denial {
    /// Protocol keyword for the denial.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Denial::BootInhibit { .. } => "BOOT_INHIBIT",
            Denial::NotArmed => "NOT_ARMED",
            Denial::AlreadyWelding => "ALREADY_WELDING",
            Denial::Cooldown { .. } => "COOLDOWN",
        }
    }

    /// Milliseconds until the blocking condition clears, when it is timed.
    #[must_use]
    pub const fn remaining_ms(&self) -> Option<u32> {
        match self {
            Denial::BootInhibit { remaining_ms } | Denial::Cooldown { remaining_ms } => {
                Some(*remaining_ms)
            }
            Denial::NotArmed | Denial::AlreadyWelding => None,
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())?;
        if let Some(ms) = self.remaining_ms() {
            write!(f, ",ms={ms}")?;
        }
        Ok(())
    }
}

/// Side effects raised by the interlock independently of any fire outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterlockEvent {
    ArmTimeout,
}

/// Arm, busy, and timing state for the weld output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interlock {
    config: InterlockConfig,
    armed: bool,
    armed_until: Option<Millis>,
    boot_time: Millis,
    boot_inhibit_elapsed: bool,
    last_weld_end: Option<Millis>,
    welding_now: bool,
}

impl Interlock {
    /// Starts the boot-inhibit window at `boot_time`.
    #[must_use]
    pub const fn new(config: InterlockConfig, boot_time: Millis) -> Self {
        Self {
            config,
            armed: config.armed_at_boot,
            armed_until: None,
            boot_time,
            boot_inhibit_elapsed: config.boot_inhibit_ms == 0,
            last_weld_end: None,
            welding_now: false,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &InterlockConfig {
        &self.config
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    #[must_use]
    pub const fn armed_until(&self) -> Option<Millis> {
        self.armed_until
    }

    #[must_use]
    pub const fn boot_time(&self) -> Millis {
        self.boot_time
    }

    #[must_use]
    pub const fn is_welding(&self) -> bool {
        self.welding_now
    }

    #[must_use]
    pub const fn last_weld_end(&self) -> Option<Millis> {
        self.last_weld_end
    }

    /// Decides whether a weld may start at `now`.
    ///
    /// An expired arm deadline disarms the unit and reports
    /// [`InterlockEvent::ArmTimeout`] through `on_event` before the armed
    /// check runs, whatever the final verdict.
    pub fn authorize_fire(
        &mut self,
        now: Millis,
        mut on_event: impl FnMut(InterlockEvent),
    ) -> Result<(), Denial> {
        if let Some(remaining_ms) = self.boot_inhibit_remaining(now) {
            return Err(Denial::BootInhibit { remaining_ms });
        }

        if let Some(event) = self.service(now) {
            on_event(event);
        }

        if !self.armed {
            return Err(Denial::NotArmed);
        }

        if self.welding_now {
            return Err(Denial::AlreadyWelding);
        }

        match self.cooldown_remaining(now) {
            0 => Ok(()),
            remaining_ms => Err(Denial::Cooldown { remaining_ms }),
        }
    }

    /// Expires the arm deadline if it has passed.
    pub fn service(&mut self, now: Millis) -> Option<InterlockEvent> {
        match self.armed_until {
            Some(deadline) if now.has_reached(deadline) => {
                self.armed = false;
                self.armed_until = None;
                Some(InterlockEvent::ArmTimeout)
            }
            _ => None,
        }
    }

    /// Handles `ARM,<v>`: arms and starts the optional deadline, or disarms.
    pub fn arm(&mut self, armed: bool, now: Millis) {
        self.armed = armed;
        self.armed_until = match (armed, self.config.arm_timeout_ms) {
            (true, Some(timeout)) => Some(now.wrapping_add(timeout)),
            _ => None,
        };
    }

    /// Forces the armed state on without starting a deadline.
    pub fn enable(&mut self) {
        self.armed = true;
        self.armed_until = None;
    }

    /// Forces the armed state off and clears any deadline.
    pub fn disable(&mut self) {
        self.armed = false;
        self.armed_until = None;
    }

    /// Marks the output busy. Must follow a successful [`Interlock::authorize_fire`].
    pub fn begin_weld(&mut self) {
        self.welding_now = true;
    }

    /// Clears the busy flag and starts the cooldown window at `now`.
    pub fn finish_weld(&mut self, now: Millis) {
        self.welding_now = false;
        self.last_weld_end = Some(now);
    }

    /// Milliseconds left in the cooldown window, zero once it has elapsed.
    pub fn cooldown_remaining(&mut self, now: Millis) -> u32 {
        let Some(end) = self.last_weld_end else {
            return 0;
        };

        let elapsed = now.wrapping_since(end);
        if elapsed >= self.config.cooldown_ms {
            self.last_weld_end = None;
            0
        } else {
            self.config.cooldown_ms - elapsed
        }
    }

    /// Milliseconds left in the boot-inhibit window, `None` once it has elapsed.
    pub fn boot_inhibit_remaining(&mut self, now: Millis) -> Option<u32> {
        if self.boot_inhibit_elapsed {
            return None;
        }

        let elapsed = now.wrapping_since(self.boot_time);
        if elapsed >= self.config.boot_inhibit_ms {
            self.boot_inhibit_elapsed = true;
            None
        } else {
            Some(self.config.boot_inhibit_ms - elapsed)
        }
    }
}
