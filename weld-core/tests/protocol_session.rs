mod common;

use common::Rig;
use weld_core::controller::ControllerConfig;
use weld_core::recipe::WeldRecipe;

fn rig() -> Rig {
    Rig::boot(ControllerConfig::disarmed_at_boot())
}

#[test]
fn power_is_clamped_into_range() {
    let mut rig = rig();
    for (requested, stored) in [(-5, 50), (0, 50), (49, 50), (50, 50), (75, 75), (100, 100), (101, 100), (9_999, 100)] {
        assert_eq!(
            rig.send(&format!("SET_POWER,{requested}")),
            [format!("ACK,SET_POWER,pct={stored}")]
        );
        assert_eq!(rig.controller.recipe().power_pct, stored);
    }
}

#[test]
fn set_pulse_is_reflected_in_status() {
    let mut rig = rig();
    assert_eq!(rig.send("SET_PULSE,2,20,5,30,0,0"), ["ACK,SET_PULSE,mode=2"]);
    assert_eq!(
        rig.send("STATUS"),
        ["STATUS,armed=0,cooldown_ms=0,welding=0,mode=2,power_pct=100,preheat_en=0"]
    );
    assert_eq!(rig.send("CMD,STATUS"), rig.send("STATUS"));
}

#[test]
fn malformed_preheat_is_denied_without_mutation() {
    let mut rig = rig();
    assert_eq!(rig.send("SET_PREHEAT,1,2"), ["DENY,BAD_SET_PREHEAT"]);
    assert_eq!(rig.send("SET_PULSE,2"), ["DENY,BAD_SET_PULSE"]);
    assert_eq!(rig.controller.recipe(), WeldRecipe::factory());
}

#[test]
fn legacy_setters_validate_instead_of_clamping() {
    let mut rig = rig();
    assert_eq!(rig.send("CMD,SET,PULSE,201"), ["ERR,PULSE_RANGE"]);
    assert_eq!(rig.send("CMD,SET,PULSE,45"), ["ACK,PULSE=45"]);
    assert_eq!(rig.send("CMD,SET,POWER,49"), ["ERR,POWER_RANGE"]);
    assert_eq!(rig.send("CMD,SET,POWER,80"), ["ACK,POWER=80"]);
    let recipe = rig.controller.recipe();
    assert_eq!((recipe.d1, recipe.power_pct), (45, 80));
}

#[test]
fn arm_replies_echo_state_and_status_follows() {
    let mut rig = rig();
    assert_eq!(rig.send("ARM,1"), ["ACK,ARM,1"]);
    assert!(rig.send("STATUS")[0].starts_with("STATUS,armed=1,"));
    assert_eq!(rig.send("ARM,0"), ["ACK,ARM,0"]);
    assert!(rig.send("STATUS")[0].starts_with("STATUS,armed=0,"));
}

#[test]
fn status_reports_cooldown_after_weld() {
    let mut rig = rig();
    rig.send("ARM,1");
    rig.clock.set(6_000);
    rig.send("CMD,FIRE");
    rig.clock.advance(100);
    assert!(rig.send("STATUS")[0].starts_with("STATUS,armed=1,cooldown_ms=400,welding=0,"));
    rig.clock.advance(400);
    assert!(rig.send("STATUS")[0].starts_with("STATUS,armed=1,cooldown_ms=0,"));
}

#[test]
fn unknown_lines_get_one_error_each() {
    let mut rig = rig();
    for line in ["HELLO", "arm,1", "CMD,NOPE", "SET_POWER", ","] {
        assert_eq!(rig.send(line), ["ERR,UNKNOWN_CMD"], "line {line:?}");
    }
    assert_eq!(rig.controller.stats().lines, 5);
}

#[test]
fn long_trailing_text_after_valid_fields_is_ignored() {
    let mut rig = rig();
    let pulse = format!("SET_PULSE,2,20,5,30,0,0{}", ",0".repeat(21));
    assert_eq!(rig.send(&pulse), ["ACK,SET_PULSE,mode=2"]);
    assert_eq!(rig.controller.recipe().mode, 2);

    let arm = format!("ARM,1{}", " 1".repeat(50));
    assert!(arm.len() <= weld_core::link::MAX_LINE_LEN);
    assert_eq!(rig.send(&arm), ["ACK,ARM,1"]);
}

#[test]
fn spaced_fire_is_not_a_fire() {
    let mut rig = Rig::boot(ControllerConfig::armed_at_boot());
    rig.clock.set(6_000);
    for line in ["CMD , FIRE", "CMD,  FIRE", "CMD ,FIRE"] {
        assert_eq!(rig.send(line), ["ERR,UNKNOWN_CMD"], "line {line:?}");
    }
    assert_eq!(rig.controller.stats().welds, 0);
    assert_eq!(rig.send("CMD,FIRE")[0], "EVENT,WELD_START");
}
