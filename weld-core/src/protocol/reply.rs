//! Outbound protocol lines.

use core::fmt;

use heapless::String;

use crate::interlock::{Denial, InterlockEvent};
use crate::sequencer::WeldSummary;

use super::commands::ProtocolError;
use super::status::{StatusFormatter, StatusSnapshot};

/// Longest rendered reply, excluding the line terminator.
pub const MAX_REPLY_LEN: usize = 192;

/// Rendered reply ready for a transport.
pub type OutboundLine = String<MAX_REPLY_LEN>;

/// Positive acknowledgement of a state-changing command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
    Arm { armed: bool },
    SetPulse { mode: u8 },
    SetPower { pct: u8 },
    SetPreheat { enabled: bool },
    Enabled,
    Disabled,
    Pulse { d1: u16 },
    Power { pct: u8 },
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ack::Arm { armed } => write!(f, "ARM,{}", u8::from(*armed)),
            Ack::SetPulse { mode } => write!(f, "SET_PULSE,mode={mode}"),
            Ack::SetPower { pct } => write!(f, "SET_POWER,pct={pct}"),
            Ack::SetPreheat { enabled } => write!(f, "SET_PREHEAT,en={}", u8::from(*enabled)),
            Ack::Enabled => f.write_str("ENABLED"),
            Ack::Disabled => f.write_str("DISABLED"),
            Ack::Pulse { d1 } => write!(f, "PULSE={d1}"),
            Ack::Power { pct } => write!(f, "POWER={pct}"),
        }
    }
}

/// Unsolicited notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    PedalPress,
    ArmTimeout,
    WeldStart,
    WeldDone(WeldSummary),
}

impl From<InterlockEvent> for Event {
    fn from(event: InterlockEvent) -> Self {
        match event {
            InterlockEvent::ArmTimeout => Event::ArmTimeout,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::PedalPress => f.write_str("PEDAL_PRESS"),
            Event::ArmTimeout => f.write_str("ARM_TIMEOUT"),
            Event::WeldStart => f.write_str("WELD_START"),
            Event::WeldDone(summary) => write!(f, "WELD_DONE,{summary}"),
        }
    }
}

/// Every line the controller can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Boot(&'static str),
    Ack(Ack),
    Deny(Denial),
    Error(ProtocolError),
    Status(StatusSnapshot),
    Event(Event),
}

impl Reply {
    /// Leading keyword of the rendered line.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Reply::Boot(_) => "BOOT",
            Reply::Ack(_) => "ACK",
            Reply::Deny(_) => "DENY",
            Reply::Error(error) => error.keyword(),
            Reply::Status(_) => "STATUS",
            Reply::Event(_) => "EVENT",
        }
    }

    /// Renders the reply without a line terminator.
    pub fn render(&self) -> Result<OutboundLine, fmt::Error> {
        let mut line = OutboundLine::new();
        fmt::Write::write_fmt(&mut line, format_args!("{self}"))?;
        Ok(line)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())?;
        f.write_str(",")?;
        match self {
            Reply::Boot(marker) => f.write_str(marker),
            Reply::Ack(ack) => ack.fmt(f),
            Reply::Deny(denial) => denial.fmt(f),
            Reply::Error(error) => error.fmt(f),
            Reply::Status(snapshot) => StatusFormatter::new(snapshot).write_fields(f),
            Reply::Event(event) => event.fmt(f),
        }
    }
}

impl From<Ack> for Reply {
    fn from(ack: Ack) -> Self {
        Reply::Ack(ack)
    }
}

impl From<Denial> for Reply {
    fn from(denial: Denial) -> Self {
        Reply::Deny(denial)
    }
}

impl From<ProtocolError> for Reply {
    fn from(error: ProtocolError) -> Self {
        Reply::Error(error)
    }
}

impl From<Event> for Reply {
    fn from(event: Event) -> Self {
        Reply::Event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::WeldRecipe;

    fn rendered(reply: Reply) -> OutboundLine {
        reply.render().expect("reply fits")
    }

    #[test]
    fn acknowledgements_echo_stored_values() {
        assert_eq!(rendered(Ack::Arm { armed: true }.into()), "ACK,ARM,1");
        assert_eq!(rendered(Ack::SetPulse { mode: 2 }.into()), "ACK,SET_PULSE,mode=2");
        assert_eq!(rendered(Ack::SetPower { pct: 50 }.into()), "ACK,SET_POWER,pct=50");
        assert_eq!(
            rendered(Ack::SetPreheat { enabled: false }.into()),
            "ACK,SET_PREHEAT,en=0"
        );
        assert_eq!(rendered(Ack::Enabled.into()), "ACK,ENABLED");
        assert_eq!(rendered(Ack::Pulse { d1: 25 }.into()), "ACK,PULSE=25");
        assert_eq!(rendered(Ack::Power { pct: 80 }.into()), "ACK,POWER=80");
    }

    #[test]
    fn denials_and_errors_use_their_own_keywords() {
        assert_eq!(
            rendered(Denial::BootInhibit { remaining_ms: 4_000 }.into()),
            "DENY,BOOT_INHIBIT,ms=4000"
        );
        assert_eq!(
            rendered(ProtocolError::BadSetPreheat.into()),
            "DENY,BAD_SET_PREHEAT"
        );
        assert_eq!(
            rendered(ProtocolError::UnknownCommand.into()),
            "ERR,UNKNOWN_CMD"
        );
        assert_eq!(rendered(ProtocolError::PowerRange.into()), "ERR,POWER_RANGE");
    }

    #[test]
    fn events_and_status_render() {
        assert_eq!(rendered(Reply::Boot("READY")), "BOOT,READY");
        assert_eq!(rendered(Event::PedalPress.into()), "EVENT,PEDAL_PRESS");
        let snapshot = StatusSnapshot::new(false, 0, false, WeldRecipe::factory());
        assert_eq!(
            rendered(Reply::Status(snapshot)),
            "STATUS,armed=0,cooldown_ms=0,welding=0,mode=1,power_pct=100,preheat_en=0"
        );
    }

    #[test]
    fn longest_weld_summary_fits_outbound_line() {
        let summary = WeldSummary {
            total_ms: u32::MAX,
            recipe: WeldRecipe {
                mode: 3,
                d1: 200,
                gap1: u16::MAX,
                d2: 200,
                gap2: u16::MAX,
                d3: 200,
                power_pct: 100,
                preheat: crate::recipe::Preheat {
                    enabled: true,
                    ms: 200,
                    pct: 100,
                    gap_ms: u16::MAX,
                },
            },
        };
        assert!(Reply::Event(Event::WeldDone(summary)).render().is_ok());
    }
}
