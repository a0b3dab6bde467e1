//! Hardware-independent weld controller.
//!
//! [`WeldController`] owns the recipe, the interlock, the pedal debouncer,
//! and the output. Board crates bind a [`WeldOutput`] and a [`Clock`], then
//! call [`WeldController::run_once`] from their control loop.

use core::str;

use crate::clock::Clock;
use crate::interlock::{Denial, Interlock, InterlockConfig};
use crate::link::{LineMailbox, LineSink};
use crate::protocol::{
    CommandTarget, Event, Outcome, ProtocolError, Reply, StatusSnapshot, execute_line,
};
use crate::recipe::{ParameterStore, WeldRecipe};
use crate::sequencer::{DEADTIME_MS, PulseSequencer, WeldOutput, WeldSummary};
use crate::trigger::{DEBOUNCE_MS, Debouncer, PedalInput, PedalLevel};

/// Ready marker announced in the `BOOT` line.
pub const BOOT_MARKER: &str = "STM32_WELD_BRAIN_PWM_READY";

/// Result of one call to the shared fire entry point.
pub type FireAttempt = Result<WeldSummary, Denial>;

/// Controller tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    pub interlock: InterlockConfig,
    pub debounce_ms: u32,
    pub deadtime_ms: u32,
    pub boot_marker: &'static str,
}

impl ControllerConfig {
    #[must_use]
    pub const fn new(interlock: InterlockConfig) -> Self {
        Self {
            interlock,
            debounce_ms: DEBOUNCE_MS,
            deadtime_ms: DEADTIME_MS,
            boot_marker: BOOT_MARKER,
        }
    }

    /// Board that must be armed after power-up.
    #[must_use]
    pub const fn disarmed_at_boot() -> Self {
        Self::new(InterlockConfig::disarmed_at_boot())
    }

    /// Board that powers up armed.
    #[must_use]
    pub const fn armed_at_boot() -> Self {
        Self::new(InterlockConfig::armed_at_boot())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::disarmed_at_boot()
    }
}

/// Running totals kept by the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub lines: u32,
    pub welds: u32,
    pub denials: u32,
    pub pedal_presses: u32,
}

pub struct WeldController<O, C> {
    config: ControllerConfig,
    output: O,
    clock: C,
    interlock: Interlock,
    parameters: ParameterStore,
    sequencer: PulseSequencer,
    pedal: Debouncer,
    stats: ControllerStats,
}

impl<O, C> WeldController<O, C>
where
    O: WeldOutput,
    C: Clock,
{
    /// Forces the output off and starts the boot-inhibit window now.
    pub fn new(config: ControllerConfig, mut output: O, clock: C, pedal: PedalLevel) -> Self {
        output.off();
        let now = clock.now();
        Self {
            config,
            output,
            interlock: Interlock::new(config.interlock, now),
            parameters: ParameterStore::new(),
            sequencer: PulseSequencer::new(config.deadtime_ms),
            pedal: Debouncer::new(pedal, now, config.debounce_ms),
            stats: ControllerStats::default(),
            clock,
        }
    }

    /// Emits the `BOOT` line.
    pub fn announce_boot<S: LineSink + ?Sized>(&self, sink: &mut S) {
        sink.send(&Reply::Boot(self.config.boot_marker));
    }

    /// One control-loop iteration: drain the mailbox, then sample the pedal
    /// and expire the arm deadline.
    pub fn run_once<P, S>(&mut self, mailbox: &LineMailbox, pedal: &mut P, sink: &mut S)
    where
        P: PedalInput + ?Sized,
        S: LineSink + ?Sized,
    {
        if let Some(line) = mailbox.take() {
            self.handle_line(&line, sink);
        }
        self.poll(pedal, sink);
    }

    /// Interprets one inbound line. Returns the fire attempt for `CMD,FIRE`.
    pub fn handle_line<S: LineSink + ?Sized>(
        &mut self,
        line: &[u8],
        sink: &mut S,
    ) -> Option<FireAttempt> {
        self.stats.lines = self.stats.lines.wrapping_add(1);

        let Ok(text) = str::from_utf8(line) else {
            sink.send(&ProtocolError::UnknownCommand.into());
            return None;
        };

        match execute_line(self, text) {
            Outcome::Reply(reply) => {
                sink.send(&reply);
                None
            }
            Outcome::Fire => Some(self.fire(sink)),
        }
    }

    /// Samples the pedal and services the arm deadline.
    ///
    /// A debounced press emits `PEDAL_PRESS` and goes through [`WeldController::fire`].
    pub fn poll<P, S>(&mut self, pedal: &mut P, sink: &mut S) -> Option<FireAttempt>
    where
        P: PedalInput + ?Sized,
        S: LineSink + ?Sized,
    {
        let now = self.clock.now();
        let attempt = if self.pedal.sample(pedal.level(), now).is_some() {
            self.stats.pedal_presses = self.stats.pedal_presses.wrapping_add(1);
            sink.send(&Event::PedalPress.into());
            Some(self.fire(sink))
        } else {
            None
        };

        if let Some(event) = self.interlock.service(self.clock.now()) {
            sink.send(&Event::from(event).into());
        }

        attempt
    }

    /// Shared fire entry point for `CMD,FIRE` and the pedal.
    ///
    /// Blocks for the whole weld cycle when authorized.
    pub fn fire<S: LineSink + ?Sized>(&mut self, sink: &mut S) -> FireAttempt {
        let now = self.clock.now();
        let verdict = self
            .interlock
            .authorize_fire(now, |event| sink.send(&Event::from(event).into()));

        if let Err(denial) = verdict {
            self.stats.denials = self.stats.denials.wrapping_add(1);
            sink.send(&Reply::Deny(denial));
            return Err(denial);
        }

        self.interlock.begin_weld();
        sink.send(&Event::WeldStart.into());
        sink.flush();

        let recipe = self.parameters.snapshot();
        let summary = self
            .sequencer
            .execute(&recipe, &mut self.output, &mut self.clock);

        self.interlock.finish_weld(self.clock.now());
        self.stats.welds = self.stats.welds.wrapping_add(1);
        sink.send(&Event::WeldDone(summary).into());
        Ok(summary)
    }

    #[must_use]
    pub fn snapshot(&mut self) -> StatusSnapshot {
        let now = self.clock.now();
        StatusSnapshot::new(
            self.interlock.is_armed(),
            self.interlock.cooldown_remaining(now),
            self.interlock.is_welding(),
            self.parameters.snapshot(),
        )
    }

    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub const fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub const fn recipe(&self) -> WeldRecipe {
        self.parameters.snapshot()
    }

    pub const fn interlock(&self) -> &Interlock {
        &self.interlock
    }

    pub fn interlock_mut(&mut self) -> &mut Interlock {
        &mut self.interlock
    }

    pub const fn pedal(&self) -> &Debouncer {
        &self.pedal
    }

    pub const fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn into_parts(self) -> (O, C) {
        (self.output, self.clock)
    }
}

impl<O, C> CommandTarget for WeldController<O, C>
where
    O: WeldOutput,
    C: Clock,
{
    fn arm(&mut self, armed: bool) {
        let now = self.clock.now();
        self.interlock.arm(armed, now);
    }

    fn enable(&mut self) {
        self.interlock.enable();
    }

    fn disable(&mut self) {
        self.interlock.disable();
    }

    fn parameters(&mut self) -> &mut ParameterStore {
        &mut self.parameters
    }

    fn status(&mut self) -> StatusSnapshot {
        self.snapshot()
    }
}
