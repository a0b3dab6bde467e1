mod common;

use common::Rig;
use weld_core::controller::ControllerConfig;
use weld_core::interlock::InterlockConfig;
use weld_core::link::{LineAssembler, LineMailbox};
use weld_core::trigger::PedalLevel;

fn ready_rig() -> Rig {
    let mut rig = Rig::boot(ControllerConfig::armed_at_boot());
    rig.clock.set(6_000);
    rig
}

#[test]
fn bounce_shorter_than_debounce_window_never_presses() {
    let mut rig = ready_rig();
    for _ in 0..5 {
        assert!(rig.pedal(PedalLevel::Pressed).is_empty());
        rig.clock.advance(39);
        assert!(rig.pedal(PedalLevel::Pressed).is_empty());
        rig.clock.advance(1);
        assert!(rig.pedal(PedalLevel::Released).is_empty());
        rig.clock.advance(10);
    }
    assert_eq!(rig.controller.stats().pedal_presses, 0);
}

#[test]
fn sustained_press_fires_exactly_once() {
    let mut rig = ready_rig();
    assert!(rig.pedal(PedalLevel::Pressed).is_empty());
    rig.clock.advance(40);

    let lines = rig.pedal(PedalLevel::Pressed);
    assert_eq!(lines[0], "EVENT,PEDAL_PRESS");
    assert_eq!(lines[1], "EVENT,WELD_START");
    assert!(lines[2].starts_with("EVENT,WELD_DONE,"));

    for _ in 0..100 {
        rig.clock.advance(10);
        assert!(rig.pedal(PedalLevel::Pressed).is_empty());
    }
    assert_eq!(rig.controller.stats().pedal_presses, 1);
}

#[test]
fn pedal_press_shares_interlock_with_fire_command() {
    let mut rig = Rig::boot(ControllerConfig::disarmed_at_boot());
    rig.clock.set(6_000);
    rig.pedal(PedalLevel::Pressed);
    rig.clock.advance(40);
    assert_eq!(
        rig.pedal(PedalLevel::Pressed),
        ["EVENT,PEDAL_PRESS", "DENY,NOT_ARMED"]
    );
}

#[test]
fn arm_timeout_disarms_and_is_announced_once() {
    let config = ControllerConfig::new(InterlockConfig::disarmed_at_boot().with_arm_timeout(2_000));
    let mut rig = Rig::boot(config);
    rig.clock.set(6_000);
    rig.send("ARM,1");

    rig.clock.set(7_999);
    assert!(rig.pedal(PedalLevel::Released).is_empty());
    rig.clock.set(8_000);
    assert_eq!(rig.pedal(PedalLevel::Released), ["EVENT,ARM_TIMEOUT"]);
    assert!(rig.pedal(PedalLevel::Released).is_empty());
    assert_eq!(rig.send("CMD,FIRE"), ["DENY,NOT_ARMED"]);
}

#[test]
fn expired_arm_is_reported_before_fire_denial() {
    let config = ControllerConfig::new(InterlockConfig::disarmed_at_boot().with_arm_timeout(500));
    let mut rig = Rig::boot(config);
    rig.send("ARM,1");
    rig.clock.set(6_000);
    assert_eq!(rig.send("CMD,FIRE"), ["EVENT,ARM_TIMEOUT", "DENY,NOT_ARMED"]);
}

#[test]
fn control_loop_drains_mailbox_then_samples_pedal() {
    let mut rig = ready_rig();
    let mailbox = LineMailbox::new();
    let mut assembler = LineAssembler::new();
    for byte in b"SET_POWER,70\r\n" {
        assembler.push(*byte, &mailbox);
    }

    let mut pedal = PedalLevel::Released;
    rig.controller
        .run_once(&mailbox, &mut pedal, &mut rig.transcript);
    assert_eq!(rig.transcript.take(), ["ACK,SET_POWER,pct=70"]);
    assert!(!mailbox.is_ready());

    rig.controller
        .run_once(&mailbox, &mut pedal, &mut rig.transcript);
    assert!(rig.transcript.lines.is_empty());
}

#[test]
fn invalid_utf8_line_is_an_unknown_command() {
    let mut rig = ready_rig();
    rig.controller
        .handle_line(&[0xFF, 0xFE, b','], &mut rig.transcript);
    assert_eq!(rig.transcript.last(), Some("ERR,UNKNOWN_CMD"));
}

#[test]
fn boot_line_carries_marker() {
    let mut rig = ready_rig();
    rig.controller.announce_boot(&mut rig.transcript);
    assert_eq!(rig.transcript.take(), ["BOOT,STM32_WELD_BRAIN_PWM_READY"]);
}
