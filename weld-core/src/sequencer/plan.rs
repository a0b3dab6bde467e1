//! Flattening of a [`WeldRecipe`] into the ordered steps the sequencer runs.

use heapless::Vec;

use crate::recipe::{MAX_WELD_MS, WeldRecipe};

/// Upper bound on steps in a plan: preheat, its gap, three stages, two gaps.
pub const MAX_STEPS: usize = 7;

/// Position of a step within the weld cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeldPhase {
    Preheat,
    PreheatGap,
    Stage1,
    Gap1,
    Stage2,
    Gap2,
    Stage3,
}

impl WeldPhase {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            WeldPhase::Preheat => "preheat",
            WeldPhase::PreheatGap => "preheat-gap",
            WeldPhase::Stage1 => "stage1",
            WeldPhase::Gap1 => "gap1",
            WeldPhase::Stage2 => "stage2",
            WeldPhase::Gap2 => "gap2",
            WeldPhase::Stage3 => "stage3",
        }
    }
}

/// What the output does for the duration of a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// Output driven at the given power percentage.
    Drive { pct: u8 },
    /// Output forced off.
    Dwell,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeldStep {
    pub phase: WeldPhase,
    pub kind: StepKind,
    pub duration_ms: u16,
}

/// Ordered, non-empty-duration steps derived from one recipe snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeldPlan {
    steps: Vec<WeldStep, MAX_STEPS>,
    realized: WeldRecipe,
}

impl WeldPlan {
    /// Builds the plan for `recipe`.
    ///
    /// Zero-length steps are omitted and every step is capped at
    /// [`MAX_WELD_MS`]. The realized recipe carries the capped values.
    #[must_use]
    pub fn from_recipe(recipe: &WeldRecipe) -> Self {
        let mut realized = *recipe;
        realized.d1 = realized.d1.min(MAX_WELD_MS);
        realized.gap1 = realized.gap1.min(MAX_WELD_MS);
        realized.d2 = realized.d2.min(MAX_WELD_MS);
        realized.gap2 = realized.gap2.min(MAX_WELD_MS);
        realized.d3 = realized.d3.min(MAX_WELD_MS);
        realized.preheat.ms = realized.preheat.ms.min(MAX_WELD_MS);
        realized.preheat.gap_ms = realized.preheat.gap_ms.min(MAX_WELD_MS);

        let mut plan = Self {
            steps: Vec::new(),
            realized,
        };

        let main = StepKind::Drive {
            pct: realized.power_pct,
        };

        if realized.preheat.is_active() {
            plan.push(
                WeldPhase::Preheat,
                StepKind::Drive {
                    pct: realized.preheat.pct,
                },
                realized.preheat.ms,
            );
            plan.push(WeldPhase::PreheatGap, StepKind::Dwell, realized.preheat.gap_ms);
        }

        plan.push(WeldPhase::Stage1, main, realized.d1);

        if realized.mode >= 2 {
            plan.push(WeldPhase::Gap1, StepKind::Dwell, realized.gap1);
            plan.push(WeldPhase::Stage2, main, realized.d2);
        }

        if realized.mode >= 3 {
            plan.push(WeldPhase::Gap2, StepKind::Dwell, realized.gap2);
            plan.push(WeldPhase::Stage3, main, realized.d3);
        }

        plan
    }

    fn push(&mut self, phase: WeldPhase, kind: StepKind, duration_ms: u16) {
        if duration_ms == 0 {
            return;
        }
        // Capacity covers every phase exactly once.
        let _ = self.steps.push(WeldStep {
            phase,
            kind,
            duration_ms,
        });
    }

    #[must_use]
    pub fn steps(&self) -> &[WeldStep] {
        &self.steps
    }

    /// Recipe as it will actually be executed.
    #[must_use]
    pub const fn realized(&self) -> &WeldRecipe {
        &self.realized
    }

    /// Sum of every step duration.
    #[must_use]
    pub fn nominal_ms(&self) -> u32 {
        self.steps
            .iter()
            .map(|step| u32::from(step.duration_ms))
            .sum()
    }
}
