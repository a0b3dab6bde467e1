//! Command dispatcher for the line protocol.
//!
//! Parsed commands are applied to a [`CommandTarget`]. Every command yields
//! exactly one reply, except `CMD,FIRE`, which is handed back to the caller
//! so the fire entry point stays shared with the pedal.

use core::fmt;

use crate::recipe::ParameterStore;

use super::grammar::{self, Command, FieldList, ParseError};
use super::catalog::CommandTag;
use super::reply::{Ack, Reply};
use super::status::StatusSnapshot;

/// Malformed, unknown, or out-of-range requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    UnknownCommand,
    BadSetPulse,
    BadSetPreheat,
    PulseRange,
    PowerRange,
}

impl ProtocolError {
    /// Leading keyword of the rendered line.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            ProtocolError::BadSetPulse | ProtocolError::BadSetPreheat => "DENY",
            ProtocolError::UnknownCommand
            | ProtocolError::PulseRange
            | ProtocolError::PowerRange => "ERR",
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            ProtocolError::UnknownCommand => "UNKNOWN_CMD",
            ProtocolError::BadSetPulse => "BAD_SET_PULSE",
            ProtocolError::BadSetPreheat => "BAD_SET_PREHEAT",
            ProtocolError::PulseRange => "PULSE_RANGE",
            ProtocolError::PowerRange => "POWER_RANGE",
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<&ParseError<'_>> for ProtocolError {
    fn from(error: &ParseError<'_>) -> Self {
        match error.short_command() {
            Some(CommandTag::SetPulse) => ProtocolError::BadSetPulse,
            Some(CommandTag::SetPreheat) => ProtocolError::BadSetPreheat,
            _ => ProtocolError::UnknownCommand,
        }
    }
}

/// State the dispatcher can observe and change.
pub trait CommandTarget {
    /// Handles `ARM,<v>`.
    fn arm(&mut self, armed: bool);

    /// Arms without a deadline.
    fn enable(&mut self);

    fn disable(&mut self);

    fn parameters(&mut self) -> &mut ParameterStore;

    fn status(&mut self) -> StatusSnapshot;
}

/// Result of dispatching one line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Reply(Reply),
    /// The caller must run the shared fire entry point.
    Fire,
}

/// Parses `line` and applies it to `target`.
pub fn execute_line<T: CommandTarget + ?Sized>(target: &mut T, line: &str) -> Outcome {
    match grammar::parse(line) {
        Ok(command) => execute(target, &command),
        Err(error) => Outcome::Reply(ProtocolError::from(&error).into()),
    }
}

/// Applies an already parsed command to `target`.
pub fn execute<T: CommandTarget + ?Sized>(target: &mut T, command: &Command) -> Outcome {
    let reply: Reply = match command {
        Command::Arm(value) => {
            let armed = *value == 1;
            target.arm(armed);
            Ack::Arm { armed }.into()
        }
        Command::SetPulse(fields) => {
            let stored = target.parameters().set_pulse(
                field(fields, 0),
                field(fields, 1),
                field(fields, 2),
                field(fields, 3),
                field(fields, 4),
                field(fields, 5),
            );
            Ack::SetPulse { mode: stored.mode }.into()
        }
        Command::SetPower(pct) => Ack::SetPower {
            pct: target.parameters().set_power(*pct),
        }
        .into(),
        Command::SetPreheat(fields) => {
            let store = target.parameters();
            let gap_ms = fields
                .get(3)
                .copied()
                .unwrap_or_else(|| i32::from(store.snapshot().preheat.gap_ms));
            let stored = store.set_preheat(
                field(fields, 0) == 1,
                field(fields, 1),
                field(fields, 2),
                gap_ms,
            );
            Ack::SetPreheat {
                enabled: stored.enabled,
            }
            .into()
        }
        Command::Fire => return Outcome::Fire,
        Command::Enable => {
            target.enable();
            Ack::Enabled.into()
        }
        Command::Disable => {
            target.disable();
            Ack::Disabled.into()
        }
        Command::Status => Reply::Status(target.status()),
        Command::SetPulseChecked(d1) => match target.parameters().set_stage1_checked(*d1) {
            Ok(d1) => Ack::Pulse { d1 }.into(),
            Err(_) => ProtocolError::PulseRange.into(),
        },
        Command::SetPowerChecked(pct) => match target.parameters().set_power_checked(*pct) {
            Ok(pct) => Ack::Power { pct }.into(),
            Err(_) => ProtocolError::PowerRange.into(),
        },
    };
    Outcome::Reply(reply)
}

fn field(fields: &FieldList, index: usize) -> i32 {
    fields.get(index).copied().unwrap_or(0)
}
