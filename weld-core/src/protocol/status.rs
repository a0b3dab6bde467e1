//! Status surface shared by the protocol and host tooling.
//!
//! The controller produces a [`StatusSnapshot`] and [`StatusFormatter`] keeps
//! the textual rendering consistent across front-ends.

use core::fmt;

use crate::recipe::WeldRecipe;

/// Point-in-time view of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub armed: bool,
    pub cooldown_ms: u32,
    pub welding: bool,
    pub recipe: WeldRecipe,
}

impl StatusSnapshot {
    #[must_use]
    pub const fn new(armed: bool, cooldown_ms: u32, welding: bool, recipe: WeldRecipe) -> Self {
        Self {
            armed,
            cooldown_ms,
            welding,
            recipe,
        }
    }
}

/// Helper that renders a [`StatusSnapshot`] into text.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the protocol fields (e.g. `armed=1,cooldown_ms=0,welding=0,mode=1,...`).
    pub fn write_fields<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let snapshot = self.snapshot;
        write!(
            writer,
            "armed={},cooldown_ms={},welding={},mode={},power_pct={},preheat_en={}",
            u8::from(snapshot.armed),
            snapshot.cooldown_ms,
            u8::from(snapshot.welding),
            snapshot.recipe.mode,
            snapshot.recipe.power_pct,
            u8::from(snapshot.recipe.preheat.enabled)
        )
    }

    /// Writes the full recipe for operators (e.g. `recipe mode=2 stages=20/5/30/0/0 power=80% preheat=off`).
    pub fn write_recipe_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let recipe = &self.snapshot.recipe;
        write!(
            writer,
            "recipe mode={} stages={}/{}/{}/{}/{} power={}%",
            recipe.mode, recipe.d1, recipe.gap1, recipe.d2, recipe.gap2, recipe.d3, recipe.power_pct
        )?;

        writer.write_str(" preheat=")?;
        if recipe.preheat.enabled {
            write!(
                writer,
                "{}ms@{}%+{}ms",
                recipe.preheat.ms, recipe.preheat.pct, recipe.preheat.gap_ms
            )
        } else {
            writer.write_str("off")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::String;

    #[test]
    fn fields_match_wire_format() {
        let snapshot = StatusSnapshot::new(true, 120, false, WeldRecipe::factory());
        let mut line = String::<96>::new();
        StatusFormatter::new(&snapshot).write_fields(&mut line).unwrap();
        assert_eq!(
            line.as_str(),
            "armed=1,cooldown_ms=120,welding=0,mode=1,power_pct=100,preheat_en=0"
        );
    }

    #[test]
    fn recipe_line_lists_stages_and_preheat() {
        let mut recipe = WeldRecipe::factory();
        recipe.preheat.enabled = true;
        let snapshot = StatusSnapshot::new(false, 0, false, recipe);
        let mut line = String::<96>::new();
        StatusFormatter::new(&snapshot)
            .write_recipe_line(&mut line)
            .unwrap();
        assert_eq!(
            line.as_str(),
            "recipe mode=1 stages=10/0/0/0/0 power=100% preheat=20ms@30%+3ms"
        );
    }
}
