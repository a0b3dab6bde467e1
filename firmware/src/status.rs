#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Lightweight atomics mirror the controller statistics, transport health,
//! and the latest ADC readings so the heartbeat can report them without
//! borrowing the controller.

use portable_atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use weld_core::controller::ControllerStats;

static LINES: AtomicU32 = AtomicU32::new(0);
static WELDS: AtomicU32 = AtomicU32::new(0);
static DENIALS: AtomicU32 = AtomicU32::new(0);
static PEDAL_PRESSES: AtomicU32 = AtomicU32::new(0);
/// Inbound lines discarded because the mailbox was still occupied.
static DROPPED_LINES: AtomicU32 = AtomicU32::new(0);
/// Outbound lines discarded because a transmit queue was full.
static TX_OVERFLOWS: AtomicU32 = AtomicU32::new(0);
static USB_ATTACHED: AtomicBool = AtomicBool::new(false);
/// Pack voltage in millivolts, `i32::MIN` until the first sample.
static BUS_MILLIVOLTS: AtomicI32 = AtomicI32::new(i32::MIN);
/// Weld current in amps, `i32::MIN` until the first sample.
static WELD_AMPS: AtomicI32 = AtomicI32::new(i32::MIN);

/// Heartbeat view of the counters.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct Heartbeat {
    pub lines: u32,
    pub welds: u32,
    pub denials: u32,
    pub pedal_presses: u32,
    pub dropped_lines: u32,
    pub tx_overflows: u32,
    pub usb_attached: bool,
    pub bus_millivolts: Option<i32>,
    pub weld_amps: Option<i32>,
}

pub fn record_stats(stats: &ControllerStats) {
    LINES.store(stats.lines, Ordering::Relaxed);
    WELDS.store(stats.welds, Ordering::Relaxed);
    DENIALS.store(stats.denials, Ordering::Relaxed);
    PEDAL_PRESSES.store(stats.pedal_presses, Ordering::Relaxed);
}

pub fn record_dropped_line() {
    DROPPED_LINES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_tx_overflow() {
    TX_OVERFLOWS.fetch_add(1, Ordering::Relaxed);
}

pub fn set_usb_attached(attached: bool) {
    USB_ATTACHED.store(attached, Ordering::Relaxed);
}

pub fn usb_attached() -> bool {
    USB_ATTACHED.load(Ordering::Relaxed)
}

pub fn record_bus_volts(volts: f32) {
    BUS_MILLIVOLTS.store(saturate(volts * 1_000.0), Ordering::Relaxed);
}

pub fn record_weld_amps(amps: f32) {
    WELD_AMPS.store(saturate(amps), Ordering::Relaxed);
}

pub fn heartbeat() -> Heartbeat {
    Heartbeat {
        lines: LINES.load(Ordering::Relaxed),
        welds: WELDS.load(Ordering::Relaxed),
        denials: DENIALS.load(Ordering::Relaxed),
        pedal_presses: PEDAL_PRESSES.load(Ordering::Relaxed),
        dropped_lines: DROPPED_LINES.load(Ordering::Relaxed),
        tx_overflows: TX_OVERFLOWS.load(Ordering::Relaxed),
        usb_attached: usb_attached(),
        bus_millivolts: sample(&BUS_MILLIVOLTS),
        weld_amps: sample(&WELD_AMPS),
    }
}

fn sample(cell: &AtomicI32) -> Option<i32> {
    match cell.load(Ordering::Relaxed) {
        i32::MIN => None,
        value => Some(value),
    }
}

/// Float-to-int `as` saturates; keep clear of the "no sample" marker.
#[allow(clippy::cast_possible_truncation)]
fn saturate(value: f32) -> i32 {
    (value as i32).max(i32::MIN + 1)
}
