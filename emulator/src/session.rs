use std::cell::{Cell, RefCell};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant as HostInstant};

use weld_core::clock::{Clock, Millis};
use weld_core::controller::{ControllerConfig, WeldController};
use weld_core::interlock::InterlockConfig;
use weld_core::protocol::StatusFormatter;
use weld_core::protocol::catalog::COMMANDS;
use weld_core::sequencer::{StepKind, WeldOutput, WeldStep};
use weld_core::trigger::{DEBOUNCE_MS, PedalLevel};

/// Counter top of TIM1 at 84 MHz and 10 kHz, mirrored so traced duties match
/// the board.
const EMULATED_MAX_DUTY: u16 = 8_400;

pub const META_COMMANDS: &[(&str, &str)] = &[
    ("help", "list protocol and emulator commands"),
    ("recipe", "show the stored recipe"),
    ("pedal <press|release|tap>", "drive the foot pedal input"),
    ("wait <ms>", "let time pass while the control loop runs"),
    ("exit | quit", "end the session"),
];

/// Emulator start-up options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub armed: bool,
    pub arm_timeout_ms: u32,
    pub virtual_clock: bool,
    pub transcript: Option<PathBuf>,
    pub trace_pwm: bool,
}

impl SessionConfig {
    pub fn controller(&self) -> ControllerConfig {
        let interlock = if self.armed {
            InterlockConfig::armed_at_boot()
        } else {
            InterlockConfig::disarmed_at_boot()
        };
        ControllerConfig::new(interlock.with_arm_timeout(self.arm_timeout_ms))
    }
}

/// One line of emulator output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmuLine {
    /// Protocol line exactly as the board would send it.
    Reply(String),
    /// PWM trace produced with `--trace-pwm`.
    Trace(String),
    /// Output of an emulator meta command.
    Note(String),
}

impl EmuLine {
    pub fn text(&self) -> &str {
        match self {
            EmuLine::Reply(text) | EmuLine::Trace(text) | EmuLine::Note(text) => text,
        }
    }
}

impl fmt::Display for EmuLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Host wall clock or a virtual clock that only moves on busy waits and `wait`.
#[derive(Clone)]
pub enum EmuClock {
    Host(HostInstant),
    Virtual(Rc<Cell<u32>>),
}

impl EmuClock {
    fn advance(&self, ms: u32) {
        match self {
            EmuClock::Host(_) => thread::sleep(Duration::from_millis(u64::from(ms))),
            EmuClock::Virtual(now) => now.set(now.get().wrapping_add(ms)),
        }
    }
}

impl Clock for EmuClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now(&self) -> Millis {
        match self {
            EmuClock::Host(origin) => Millis::from_ticks(origin.elapsed().as_millis() as u32),
            EmuClock::Virtual(now) => Millis::from_ticks(now.get()),
        }
    }

    fn busy_wait_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}

/// Weld output that keeps the duty and optionally narrates every step.
pub struct TraceOutput {
    duty: u16,
    trace: Option<Rc<RefCell<Vec<String>>>>,
}

impl TraceOutput {
    fn note(&self, line: String) {
        if let Some(trace) = &self.trace {
            trace.borrow_mut().push(line);
        }
    }
}

impl WeldOutput for TraceOutput {
    fn max_duty(&self) -> u16 {
        EMULATED_MAX_DUTY
    }

    fn drive(&mut self, duty: u16) {
        self.duty = duty;
        self.note(format!("PWM duty={duty}/{EMULATED_MAX_DUTY}"));
    }

    fn off(&mut self) {
        if self.duty != 0 {
            self.note("PWM off".to_string());
        }
        self.duty = 0;
    }

    fn step_started(&mut self, step: &WeldStep) {
        let action = match step.kind {
            StepKind::Drive { pct } => format!("drive {pct}%"),
            StepKind::Dwell => "dwell".to_string(),
        };
        self.note(format!(
            "PWM {} {action} for {} ms",
            step.phase.name(),
            step.duration_ms
        ));
    }
}

pub struct Session {
    controller: WeldController<TraceOutput, EmuClock>,
    clock: EmuClock,
    pedal: PedalLevel,
    trace: Rc<RefCell<Vec<String>>>,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    pub fn new(config: &SessionConfig) -> io::Result<Self> {
        let transcript = match &config.transcript {
            Some(path) => Some(TranscriptLogger::new(path, config)?),
            None => None,
        };

        let clock = if config.virtual_clock {
            EmuClock::Virtual(Rc::new(Cell::new(0)))
        } else {
            EmuClock::Host(HostInstant::now())
        };

        let trace = Rc::new(RefCell::new(Vec::new()));
        let output = TraceOutput {
            duty: 0,
            trace: config.trace_pwm.then(|| Rc::clone(&trace)),
        };
        let controller = WeldController::new(
            config.controller(),
            output,
            clock.clone(),
            PedalLevel::Released,
        );

        Ok(Self {
            controller,
            clock,
            pedal: PedalLevel::Released,
            trace,
            transcript,
        })
    }

    /// Emits the `BOOT` line.
    pub fn boot(&mut self) -> io::Result<Vec<EmuLine>> {
        let mut replies = Vec::new();
        self.controller.announce_boot(&mut replies);
        self.emit(replies)
    }

    /// Handles one line of operator input: a meta command or a protocol line.
    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<EmuLine>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        self.log(TranscriptRole::Host, trimmed)?;

        if let Some(lines) = self.handle_meta(trimmed) {
            return self.record(lines);
        }

        let mut replies = Vec::new();
        self.controller.handle_line(trimmed.as_bytes(), &mut replies);
        self.controller.poll(&mut self.pedal, &mut replies);
        self.emit(replies)
    }

    /// One idle control-loop iteration.
    pub fn tick(&mut self) -> io::Result<Vec<EmuLine>> {
        let mut replies = Vec::new();
        self.controller.poll(&mut self.pedal, &mut replies);
        self.emit(replies)
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.clock, EmuClock::Virtual(_))
    }

    fn handle_meta(&mut self, line: &str) -> Option<Vec<EmuLine>> {
        let mut words = line.split_whitespace();
        let lines = match (words.next()?, words.next(), words.next()) {
            ("help", None, None) => help_lines(),
            ("recipe", None, None) => vec![EmuLine::Note(self.recipe_line())],
            ("pedal", Some(action), None) => self.pedal_action(action),
            ("wait", Some(ms), None) => match ms.parse::<u32>() {
                Ok(ms) => self.wait(ms),
                Err(_) => vec![EmuLine::Note(format!("wait: `{ms}` is not a duration in ms"))],
            },
            _ => return None,
        };
        Some(lines)
    }

    fn pedal_action(&mut self, action: &str) -> Vec<EmuLine> {
        match action {
            "press" => self.set_pedal(PedalLevel::Pressed),
            "release" => self.set_pedal(PedalLevel::Released),
            "tap" => {
                let mut lines = self.set_pedal(PedalLevel::Pressed);
                lines.extend(self.wait(DEBOUNCE_MS + 10));
                lines.extend(self.set_pedal(PedalLevel::Released));
                lines.extend(self.wait(DEBOUNCE_MS + 10));
                lines
            }
            other => vec![EmuLine::Note(format!(
                "pedal: unknown action `{other}` (press, release, tap)"
            ))],
        }
    }

    fn set_pedal(&mut self, level: PedalLevel) -> Vec<EmuLine> {
        self.pedal = level;
        let mut replies = Vec::new();
        self.controller.poll(&mut self.pedal, &mut replies);
        self.interleave(replies)
    }

    /// Runs the control loop once per millisecond for `ms` milliseconds.
    fn wait(&mut self, ms: u32) -> Vec<EmuLine> {
        let mut replies = Vec::new();
        let start = self.clock.now();
        while self.clock.now().wrapping_since(start) < ms {
            self.clock.advance(1);
            self.controller.poll(&mut self.pedal, &mut replies);
        }
        let mut lines = self.interleave(replies);
        lines.push(EmuLine::Note(format!("t={}", self.clock.now())));
        lines
    }

    fn recipe_line(&mut self) -> String {
        let snapshot = self.controller.snapshot();
        let mut line = String::new();
        // Writing into a String cannot fail.
        let _ = StatusFormatter::new(&snapshot).write_recipe_line(&mut line);
        line
    }

    /// Interleaves PWM trace lines with the protocol replies they precede.
    fn interleave(&mut self, replies: Vec<String>) -> Vec<EmuLine> {
        let traced: Vec<String> = self.trace.borrow_mut().drain(..).collect();
        if traced.is_empty() {
            return replies.into_iter().map(EmuLine::Reply).collect();
        }

        // Trace lines belong between WELD_START and WELD_DONE.
        let mut lines = Vec::with_capacity(replies.len() + traced.len());
        let mut traced = Some(traced);
        for reply in replies {
            if reply.starts_with("EVENT,WELD_DONE") {
                if let Some(trace) = traced.take() {
                    lines.extend(trace.into_iter().map(EmuLine::Trace));
                }
            }
            lines.push(EmuLine::Reply(reply));
        }
        if let Some(trace) = traced {
            lines.extend(trace.into_iter().map(EmuLine::Trace));
        }
        lines
    }

    fn emit(&mut self, replies: Vec<String>) -> io::Result<Vec<EmuLine>> {
        let lines = self.interleave(replies);
        self.record(lines)
    }

    fn record(&mut self, lines: Vec<EmuLine>) -> io::Result<Vec<EmuLine>> {
        for line in &lines {
            self.log(TranscriptRole::Emulator, line.text())?;
        }
        Ok(lines)
    }

    fn log(&mut self, role: TranscriptRole, line: &str) -> io::Result<()> {
        let now = self.clock.now();
        match &mut self.transcript {
            Some(transcript) => transcript.append_line(now, role, line),
            None => Ok(()),
        }
    }
}

fn help_lines() -> Vec<EmuLine> {
    let mut lines = vec![EmuLine::Note("Protocol commands:".to_string())];
    for spec in &COMMANDS {
        lines.push(EmuLine::Note(format!(
            "  {:<58} {}",
            spec.usage, spec.summary
        )));
    }
    lines.push(EmuLine::Note("Emulator commands:".to_string()));
    for (usage, summary) in META_COMMANDS {
        lines.push(EmuLine::Note(format!("  {usage:<58} {summary}")));
    }
    lines
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, config: &SessionConfig) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(config)?;
        Ok(logger)
    }

    fn write_header(&mut self, config: &SessionConfig) -> io::Result<()> {
        writeln!(self.writer, "# Spot-weld controller emulator transcript")?;
        writeln!(
            self.writer,
            "# armed_at_boot={} arm_timeout_ms={} clock={}",
            config.armed,
            config.arm_timeout_ms,
            if config.virtual_clock { "virtual" } else { "host" }
        )?;
        writeln!(
            self.writer,
            "# Timestamps are controller milliseconds since boot"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, now: Millis, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            now.ticks(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
