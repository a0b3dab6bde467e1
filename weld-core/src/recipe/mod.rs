//! Weld recipe storage with bounded parameters.
//!
//! The [`ParameterStore`] is the only way to mutate a [`WeldRecipe`]. Each
//! setter clamps its inputs before storing them and hands back the stored
//! values so acknowledgements can echo exactly what will be fired.

use core::fmt;

/// Longest drive stage or forced-off dwell executed by the sequencer.
pub const MAX_WELD_MS: u16 = 200;

/// Lowest main-stage power percentage accepted by the store.
pub const MIN_POWER_PCT: u8 = 50;

/// Highest power percentage accepted by the store.
pub const MAX_POWER_PCT: u8 = 100;

/// Number of drive stages supported by a single recipe.
pub const MAX_STAGES: u8 = 3;

/// Optional low-power pulse that runs before the main stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preheat {
    pub enabled: bool,
    pub ms: u16,
    pub pct: u8,
    pub gap_ms: u16,
}

impl Preheat {
    /// Factory preheat settings: disabled, 20 ms at 30 % followed by 3 ms off.
    #[must_use]
    pub const fn factory() -> Self {
        Self {
            enabled: false,
            ms: 20,
            pct: 30,
            gap_ms: 3,
        }
    }

    /// Returns `true` when the preheat pulse will actually be driven.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.enabled && self.ms > 0
    }
}

impl Default for Preheat {
    fn default() -> Self {
        Self::factory()
    }
}

/// Complete description of one weld cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeldRecipe {
    /// Number of drive stages, `1..=3`.
    pub mode: u8,
    pub d1: u16,
    pub gap1: u16,
    pub d2: u16,
    pub gap2: u16,
    pub d3: u16,
    pub power_pct: u8,
    pub preheat: Preheat,
}

impl WeldRecipe {
    /// Factory recipe: a single 10 ms stage at full power.
    #[must_use]
    pub const fn factory() -> Self {
        Self {
            mode: 1,
            d1: 10,
            gap1: 0,
            d2: 0,
            gap2: 0,
            d3: 0,
            power_pct: MAX_POWER_PCT,
            preheat: Preheat::factory(),
        }
    }

    /// Stage-shape fields of the recipe.
    #[must_use]
    pub const fn pulse(&self) -> PulseSettings {
        PulseSettings {
            mode: self.mode,
            d1: self.d1,
            gap1: self.gap1,
            d2: self.d2,
            gap2: self.gap2,
            d3: self.d3,
        }
    }
}

impl Default for WeldRecipe {
    fn default() -> Self {
        Self::factory()
    }
}

/// Stage count, durations, and gaps as stored by [`ParameterStore::set_pulse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseSettings {
    pub mode: u8,
    pub d1: u16,
    pub gap1: u16,
    pub d2: u16,
    pub gap2: u16,
    pub d3: u16,
}

/// Rejection returned by the range-validated setters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeError {
    pub value: i32,
    pub min: i32,
    pub max: i32,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value {} outside {}..={}",
            self.value, self.min, self.max
        )
    }
}

/// Owner of the active recipe.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterStore {
    recipe: WeldRecipe,
}

impl ParameterStore {
    /// Creates a store holding the factory recipe.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            recipe: WeldRecipe::factory(),
        }
    }

    /// Creates a store seeded with `recipe`, clamping every field.
    #[must_use]
    pub fn with_recipe(recipe: WeldRecipe) -> Self {
        let mut store = Self::new();
        store.set_pulse(
            i32::from(recipe.mode),
            i32::from(recipe.d1),
            i32::from(recipe.gap1),
            i32::from(recipe.d2),
            i32::from(recipe.gap2),
            i32::from(recipe.d3),
        );
        store.set_power(i32::from(recipe.power_pct));
        store.set_preheat(
            recipe.preheat.enabled,
            i32::from(recipe.preheat.ms),
            i32::from(recipe.preheat.pct),
            i32::from(recipe.preheat.gap_ms),
        );
        store
    }

    /// Copy of the current recipe.
    #[must_use]
    pub const fn snapshot(&self) -> WeldRecipe {
        self.recipe
    }

    /// Stores a new stage layout.
    ///
    /// Mode clamps to `1..=3`, stage durations to `0..=MAX_WELD_MS`, and gaps
    /// to the `u16` range.
    pub fn set_pulse(
        &mut self,
        mode: i32,
        d1: i32,
        gap1: i32,
        d2: i32,
        gap2: i32,
        d3: i32,
    ) -> PulseSettings {
        self.recipe.mode = clamp_u8(mode, 1, MAX_STAGES);
        self.recipe.d1 = clamp_stage(d1);
        self.recipe.gap1 = clamp_gap(gap1);
        self.recipe.d2 = clamp_stage(d2);
        self.recipe.gap2 = clamp_gap(gap2);
        self.recipe.d3 = clamp_stage(d3);
        self.recipe.pulse()
    }

    /// Stores the main-stage power, clamped to `50..=100`.
    pub fn set_power(&mut self, pct: i32) -> u8 {
        self.recipe.power_pct = clamp_u8(pct, MIN_POWER_PCT, MAX_POWER_PCT);
        self.recipe.power_pct
    }

    /// Stores the preheat sub-recipe.
    ///
    /// Duration clamps to `0..=MAX_WELD_MS` and power to `0..=100`.
    pub fn set_preheat(&mut self, enabled: bool, ms: i32, pct: i32, gap_ms: i32) -> Preheat {
        self.recipe.preheat = Preheat {
            enabled,
            ms: clamp_stage(ms),
            pct: clamp_u8(pct, 0, MAX_POWER_PCT),
            gap_ms: clamp_gap(gap_ms),
        };
        self.recipe.preheat
    }

    /// Sets only the first stage duration, rejecting values outside `1..=MAX_WELD_MS`.
    pub fn set_stage1_checked(&mut self, d1: i32) -> Result<u16, RangeError> {
        let max = i32::from(MAX_WELD_MS);
        if d1 <= 0 || d1 > max {
            return Err(RangeError {
                value: d1,
                min: 1,
                max,
            });
        }
        self.recipe.d1 = clamp_stage(d1);
        Ok(self.recipe.d1)
    }

    /// Sets the main-stage power, rejecting values outside `50..=100`.
    pub fn set_power_checked(&mut self, pct: i32) -> Result<u8, RangeError> {
        let (min, max) = (i32::from(MIN_POWER_PCT), i32::from(MAX_POWER_PCT));
        if !(min..=max).contains(&pct) {
            return Err(RangeError {
                value: pct,
                min,
                max,
            });
        }
        Ok(self.set_power(pct))
    }
}

fn clamp_u8(value: i32, min: u8, max: u8) -> u8 {
    u8::try_from(value.clamp(i32::from(min), i32::from(max))).unwrap_or(max)
}

fn clamp_stage(value: i32) -> u16 {
    u16::try_from(value.clamp(0, i32::from(MAX_WELD_MS))).unwrap_or(MAX_WELD_MS)
}

fn clamp_gap(value: i32) -> u16 {
    u16::try_from(value.clamp(0, i32::from(u16::MAX))).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_recipe_matches_power_on_defaults() {
        let recipe = ParameterStore::new().snapshot();
        assert_eq!(recipe.mode, 1);
        assert_eq!(recipe.d1, 10);
        assert_eq!((recipe.gap1, recipe.d2, recipe.gap2, recipe.d3), (0, 0, 0, 0));
        assert_eq!(recipe.power_pct, 100);
        assert_eq!(recipe.preheat, Preheat::factory());
        assert!(!recipe.preheat.is_active());
    }

    #[test]
    fn power_clamps_to_bounds() {
        let mut store = ParameterStore::new();
        let cases = [
            (-5, 50),
            (0, 50),
            (49, 50),
            (50, 50),
            (73, 73),
            (100, 100),
            (101, 100),
            (i32::MAX, 100),
        ];
        for (requested, stored) in cases {
            assert_eq!(store.set_power(requested), stored, "requested {requested}");
            assert_eq!(store.snapshot().power_pct, stored);
        }
    }

    #[test]
    fn pulse_clamps_mode_and_stage_durations() {
        let mut store = ParameterStore::new();
        let stored = store.set_pulse(7, 450, 70_000, -3, 12, 200);
        assert_eq!(stored.mode, 3);
        assert_eq!(stored.d1, MAX_WELD_MS);
        assert_eq!(stored.gap1, u16::MAX);
        assert_eq!(stored.d2, 0);
        assert_eq!(stored.gap2, 12);
        assert_eq!(stored.d3, 200);

        assert_eq!(store.set_pulse(0, 10, 0, 0, 0, 0).mode, 1);
    }

    #[test]
    fn preheat_clamps_duration_and_power() {
        let mut store = ParameterStore::new();
        let stored = store.set_preheat(true, 900, 140, 4);
        assert_eq!(
            stored,
            Preheat {
                enabled: true,
                ms: MAX_WELD_MS,
                pct: 100,
                gap_ms: 4,
            }
        );
        assert_eq!(store.snapshot().preheat, stored);
    }

    #[test]
    fn checked_setters_reject_without_mutation() {
        let mut store = ParameterStore::new();
        assert_eq!(
            store.set_stage1_checked(0),
            Err(RangeError {
                value: 0,
                min: 1,
                max: 200
            })
        );
        assert!(store.set_stage1_checked(201).is_err());
        assert!(store.set_power_checked(49).is_err());
        assert_eq!(store.snapshot(), WeldRecipe::factory());

        assert_eq!(store.set_stage1_checked(200), Ok(200));
        assert_eq!(store.set_power_checked(75), Ok(75));
    }

    #[test]
    fn seeding_clamps_every_field() {
        let store = ParameterStore::with_recipe(WeldRecipe {
            mode: 9,
            d1: 1_000,
            power_pct: 10,
            ..WeldRecipe::factory()
        });
        let recipe = store.snapshot();
        assert_eq!(recipe.mode, 3);
        assert_eq!(recipe.d1, MAX_WELD_MS);
        assert_eq!(recipe.power_pct, MIN_POWER_PCT);
    }
}
