use std::io;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, SessionConfig};

/// Scripted sessions replayed on a virtual clock, one transcript each.
#[derive(Clone, Copy, Debug)]
enum Scenario {
    Fire,
    Recipe,
    Pedal,
    ArmTimeout,
}

impl Scenario {
    const ALL: [Scenario; 4] = [
        Scenario::Fire,
        Scenario::Recipe,
        Scenario::Pedal,
        Scenario::ArmTimeout,
    ];

    fn tag(self) -> &'static str {
        match self {
            Scenario::Fire => "fire",
            Scenario::Recipe => "recipe",
            Scenario::Pedal => "pedal",
            Scenario::ArmTimeout => "arm-timeout",
        }
    }

    fn config(self) -> SessionConfig {
        SessionConfig {
            armed: matches!(self, Scenario::Fire | Scenario::Pedal),
            arm_timeout_ms: if matches!(self, Scenario::ArmTimeout) {
                2_000
            } else {
                0
            },
            virtual_clock: true,
            transcript: Some(PathBuf::from(format!("transcripts/{}.log", self.tag()))),
            trace_pwm: true,
        }
    }
}

fn main() -> io::Result<()> {
    for scenario in Scenario::ALL {
        record(scenario)?;
    }
    Ok(())
}

fn record(scenario: Scenario) -> io::Result<()> {
    let mut session = Session::new(&scenario.config())?;
    session.boot()?;
    match scenario {
        Scenario::Fire => record_fire(&mut session),
        Scenario::Recipe => record_recipe(&mut session),
        Scenario::Pedal => record_pedal(&mut session),
        Scenario::ArmTimeout => record_arm_timeout(&mut session),
    }
}

fn run(session: &mut Session, commands: &[&str]) -> io::Result<()> {
    for command in commands {
        session.handle_command(command)?;
    }
    Ok(())
}

fn record_fire(session: &mut Session) -> io::Result<()> {
    run(
        session,
        &[
            "STATUS",
            "CMD,FIRE",
            "wait 5000",
            "CMD,FIRE",
            "CMD,FIRE",
            "wait 500",
            "CMD,FIRE",
            "ARM,0",
            "CMD,FIRE",
        ],
    )
}

fn record_recipe(session: &mut Session) -> io::Result<()> {
    run(
        session,
        &[
            "recipe",
            "SET_PULSE,3,40,5,60,5,30",
            "SET_POWER,80",
            "SET_PREHEAT,1,20,30,3",
            "recipe",
            "SET_PREHEAT,1,20",
            "SET_PULSE,2",
            "CMD,SET,PULSE,25",
            "CMD,SET,POWER,150",
            "POWER,50",
            "STATUS",
            "ARM,1",
            "wait 5000",
            "CMD,FIRE",
        ],
    )
}

fn record_pedal(session: &mut Session) -> io::Result<()> {
    run(
        session,
        &[
            "wait 5000",
            "pedal press",
            "wait 20",
            "pedal release",
            "wait 100",
            "pedal tap",
            "wait 600",
            "CMD,DISABLE",
            "pedal tap",
            "CMD,ENABLE",
        ],
    )
}

fn record_arm_timeout(session: &mut Session) -> io::Result<()> {
    run(
        session,
        &["ARM,1", "wait 5000", "STATUS", "CMD,FIRE", "ARM,1", "CMD,FIRE"],
    )
}
