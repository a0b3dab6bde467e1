//! Blocking pulse sequencer.
//!
//! A granted weld runs start to finish on the caller's thread: the output is
//! forced off, a short deadtime elapses, then every step of the [`WeldPlan`]
//! is driven with busy-wait timing. Nothing can interrupt or cancel a cycle
//! once it has started.

pub mod plan;

use core::fmt;

use embedded_hal::pwm::SetDutyCycle;

use crate::clock::Clock;
use crate::recipe::{MAX_POWER_PCT, WeldRecipe};

pub use plan::{MAX_STEPS, StepKind, WeldPhase, WeldPlan, WeldStep};

/// Default off-time inserted before the first step.
pub const DEADTIME_MS: u32 = 2;

/// Duty-cycle output that gates the weld current.
pub trait WeldOutput {
    /// Full-scale duty value.
    fn max_duty(&self) -> u16;

    /// Drives the output at `duty`, at most [`WeldOutput::max_duty`].
    fn drive(&mut self, duty: u16);

    /// Forces the output off.
    fn off(&mut self);

    /// Called before each step is driven.
    fn step_started(&mut self, _step: &WeldStep) {}
}

impl<O: WeldOutput + ?Sized> WeldOutput for &mut O {
    fn max_duty(&self) -> u16 {
        (**self).max_duty()
    }

    fn drive(&mut self, duty: u16) {
        (**self).drive(duty);
    }

    fn off(&mut self) {
        (**self).off();
    }

    fn step_started(&mut self, step: &WeldStep) {
        (**self).step_started(step);
    }
}

/// [`WeldOutput`] backed by an `embedded-hal` PWM channel.
///
/// Channel errors cannot abort a cycle, so they are counted instead.
pub struct PwmWeldOutput<P> {
    channel: P,
    faults: u32,
}

impl<P: SetDutyCycle> PwmWeldOutput<P> {
    /// Wraps `channel` and forces it off.
    pub fn new(mut channel: P) -> Self {
        let faults = u32::from(channel.set_duty_cycle_fully_off().is_err());
        Self { channel, faults }
    }

    /// Number of channel writes that failed.
    pub const fn faults(&self) -> u32 {
        self.faults
    }

    pub fn into_inner(self) -> P {
        self.channel
    }

    fn record(&mut self, result: Result<(), P::Error>) {
        if result.is_err() {
            self.faults = self.faults.saturating_add(1);
        }
    }
}

impl<P: SetDutyCycle> WeldOutput for PwmWeldOutput<P> {
    fn max_duty(&self) -> u16 {
        self.channel.max_duty_cycle()
    }

    fn drive(&mut self, duty: u16) {
        let result = self.channel.set_duty_cycle(duty.min(self.channel.max_duty_cycle()));
        self.record(result);
    }

    fn off(&mut self) {
        let result = self.channel.set_duty_cycle_fully_off();
        self.record(result);
    }
}

/// Maps a power percentage onto `0..=max_duty`, flooring partial counts.
#[must_use]
pub fn pct_to_duty(pct: u8, max_duty: u16) -> u16 {
    if pct >= MAX_POWER_PCT {
        return max_duty;
    }
    let scaled = u32::from(pct) * u32::from(max_duty) / u32::from(MAX_POWER_PCT);
    u16::try_from(scaled).unwrap_or(max_duty)
}

/// Audit record of one completed weld cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeldSummary {
    /// Milliseconds from the end of the deadtime to the final output-off.
    pub total_ms: u32,
    /// Recipe exactly as executed.
    pub recipe: WeldRecipe,
}

impl fmt::Display for WeldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.recipe;
        write!(
            f,
            "total_ms={},mode={},d1={},gap1={},d2={},gap2={},d3={},power_pct={},",
            self.total_ms, r.mode, r.d1, r.gap1, r.d2, r.gap2, r.d3, r.power_pct
        )?;
        write!(
            f,
            "preheat_en={},preheat_ms={},preheat_pct={},preheat_gap_ms={}",
            u8::from(r.preheat.enabled),
            r.preheat.ms,
            r.preheat.pct,
            r.preheat.gap_ms
        )
    }
}

/// Executes weld plans against an output and a clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseSequencer {
    deadtime_ms: u32,
}

impl PulseSequencer {
    #[must_use]
    pub const fn new(deadtime_ms: u32) -> Self {
        Self { deadtime_ms }
    }

    #[must_use]
    pub const fn deadtime_ms(&self) -> u32 {
        self.deadtime_ms
    }

    /// Runs one full cycle for `recipe` and returns its summary.
    ///
    /// The output is off on return.
    pub fn execute<O, C>(&self, recipe: &WeldRecipe, output: &mut O, clock: &mut C) -> WeldSummary
    where
        O: WeldOutput + ?Sized,
        C: Clock + ?Sized,
    {
        let plan = WeldPlan::from_recipe(recipe);
        let max_duty = output.max_duty();

        output.off();
        clock.busy_wait_ms(self.deadtime_ms);
        let started = clock.now();

        for step in plan.steps() {
            output.step_started(step);
            match step.kind {
                StepKind::Drive { pct } => {
                    output.drive(pct_to_duty(pct, max_duty));
                    clock.busy_wait_ms(u32::from(step.duration_ms));
                    output.off();
                }
                StepKind::Dwell => {
                    output.off();
                    clock.busy_wait_ms(u32::from(step.duration_ms));
                }
            }
        }

        output.off();

        WeldSummary {
            total_ms: clock.now().wrapping_since(started),
            recipe: *plan.realized(),
        }
    }
}

impl Default for PulseSequencer {
    fn default() -> Self {
        Self::new(DEADTIME_MS)
    }
}
