#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weld_core::clock::{Clock, Millis};
use weld_core::controller::{ControllerConfig, WeldController};
use weld_core::link::LineSink;
use weld_core::protocol::Reply;
use weld_core::sequencer::WeldOutput;
use weld_core::trigger::PedalLevel;

/// Clock that only moves when a test or a busy wait advances it.
#[derive(Clone, Default)]
pub struct FakeClock {
    now: Rc<Cell<u32>>,
}

impl FakeClock {
    pub fn at(ms: u32) -> Self {
        Self {
            now: Rc::new(Cell::new(ms)),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn ticks(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Millis {
        Millis::from_ticks(self.now.get())
    }

    fn busy_wait_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Drive { at: u32, duty: u16 },
    Off { at: u32 },
}

/// Output that timestamps every duty change against the shared fake clock.
#[derive(Clone)]
pub struct ScopeOutput {
    clock: FakeClock,
    edges: Rc<RefCell<Vec<Edge>>>,
    duty: Rc<Cell<u16>>,
}

impl ScopeOutput {
    pub fn new(clock: &FakeClock) -> Self {
        Self {
            clock: clock.clone(),
            edges: Rc::default(),
            duty: Rc::default(),
        }
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.edges.borrow().clone()
    }

    pub fn duty(&self) -> u16 {
        self.duty.get()
    }

    /// Total milliseconds spent with a non-zero duty.
    pub fn energized_ms(&self) -> u32 {
        let mut total = 0;
        let mut since = None;
        for edge in self.edges.borrow().iter() {
            match *edge {
                Edge::Drive { at, duty } if duty > 0 => {
                    since.get_or_insert(at);
                }
                Edge::Drive { at, .. } | Edge::Off { at } => {
                    if let Some(start) = since.take() {
                        total += at - start;
                    }
                }
            }
        }
        total
    }
}

impl WeldOutput for ScopeOutput {
    fn max_duty(&self) -> u16 {
        1_000
    }

    fn drive(&mut self, duty: u16) {
        self.duty.set(duty);
        self.edges.borrow_mut().push(Edge::Drive {
            at: self.clock.ticks(),
            duty,
        });
    }

    fn off(&mut self) {
        self.duty.set(0);
        self.edges.borrow_mut().push(Edge::Off {
            at: self.clock.ticks(),
        });
    }
}

/// Every line the controller emitted, in order.
#[derive(Default)]
pub struct Transcript {
    pub lines: Vec<String>,
}

impl Transcript {
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    pub fn count(&self, line: &str) -> usize {
        self.lines.iter().filter(|candidate| *candidate == line).count()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}

impl LineSink for Transcript {
    fn send(&mut self, reply: &Reply) {
        self.lines.push(reply.to_string());
    }
}

pub struct Rig {
    pub clock: FakeClock,
    pub scope: ScopeOutput,
    pub controller: WeldController<ScopeOutput, FakeClock>,
    pub transcript: Transcript,
}

impl Rig {
    pub fn boot(config: ControllerConfig) -> Self {
        let clock = FakeClock::at(0);
        let scope = ScopeOutput::new(&clock);
        let controller = WeldController::new(config, scope.clone(), clock.clone(), PedalLevel::Released);
        Self {
            clock,
            scope,
            controller,
            transcript: Transcript::default(),
        }
    }

    pub fn send(&mut self, line: &str) -> Vec<String> {
        self.controller
            .handle_line(line.as_bytes(), &mut self.transcript);
        self.transcript.take()
    }

    pub fn pedal(&mut self, level: PedalLevel) -> Vec<String> {
        let mut pedal = level;
        self.controller.poll(&mut pedal, &mut self.transcript);
        self.transcript.take()
    }
}
