use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Hard ceiling on optimization passes for both the crossing-reduction
/// sweep and the link router.
pub const MAX_OPT_PASSES: usize = 20;

/// Weights for the link-routing goodness function. Lower scores are
/// better. Instances are clamped on construction and never mutated by a
/// layout run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoodnessParams {
    /// Weight on grid-cell conflicts, in [0, 1].
    pub crossing_coeff: f32,
    /// Scale applied on top of `crossing_coeff`, in [0.01, 1].
    pub crossing_multiplier: f32,
    /// Weight on deviation from the straight path, in [0, 1].
    pub difference_coeff: f32,
    /// Falloff width for the deviation penalty, in [1, 100]. Larger sigma
    /// tolerates longer detours.
    pub difference_sigma: f32,
}

impl GoodnessParams {
    pub fn new(
        crossing_coeff: f32,
        crossing_multiplier: f32,
        difference_coeff: f32,
        difference_sigma: f32,
    ) -> Self {
        Self {
            crossing_coeff,
            crossing_multiplier,
            difference_coeff,
            difference_sigma,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        Self {
            crossing_coeff: self.crossing_coeff.clamp(0.0, 1.0),
            crossing_multiplier: self.crossing_multiplier.clamp(0.01, 1.0),
            difference_coeff: self.difference_coeff.clamp(0.0, 1.0),
            difference_sigma: self.difference_sigma.clamp(1.0, 100.0),
        }
    }

    /// Score one candidate route: weighted conflict count plus a
    /// Gaussian-falloff penalty on deviation from the preferred path.
    pub fn score(&self, conflicts: u32, deviation: f32) -> f32 {
        let crossing = self.crossing_multiplier * self.crossing_coeff * conflicts as f32;
        let ratio = deviation / self.difference_sigma;
        let difference = self.difference_coeff * (1.0 - (-(ratio * ratio)).exp());
        crossing + difference
    }
}

impl Default for GoodnessParams {
    fn default() -> Self {
        Self {
            crossing_coeff: 0.0,
            crossing_multiplier: 1.0,
            difference_coeff: 0.0,
            difference_sigma: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayeringMethod {
    /// Rank by longest path from a source.
    LongestPath,
    /// Rank by breadth-first depth from the sources.
    Topological,
    /// Rank by hierarchy depth; links only influence in-layer order.
    HierarchyConstrained,
}

/// What happens to overlay module boxes after the base layout moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayOption {
    None,
    Refit,
    FullRelayout,
}

/// Tunables for the layered pipeline. Built by the host (dialog or saved
/// preference), consumed once per run as an immutable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub goodness: GoodnessParams,
    /// Improvement passes for crossing reduction and link routing,
    /// in [0, MAX_OPT_PASSES].
    pub optimization_passes: usize,
    /// Layer occupancy cap, in [5, 40]; larger layers split.
    pub max_per_layer: usize,
    pub layering_method: LayeringMethod,
    /// When false, skip layering-from-scratch and crossing passes and pin
    /// every previously positioned node (edit-time re-layout).
    pub first_pass: bool,
    pub topo_compress: bool,
    pub do_crossing_reduction: bool,
    pub normalize_rows: bool,
    pub incremental_compress: bool,
    /// Pull a node whose only incoming link comes from its hierarchy
    /// parent to the layer just below that parent.
    pub inheritance_squash: bool,
    pub overlay_option: OverlayOption,
    /// Horizontal slot pitch within a layer.
    pub node_spacing: f32,
    /// Vertical pitch between layers.
    pub rank_spacing: f32,
}

impl LayoutOptions {
    pub fn clamped(self) -> Self {
        Self {
            goodness: self.goodness.clamped(),
            optimization_passes: self.optimization_passes.min(MAX_OPT_PASSES),
            max_per_layer: self.max_per_layer.clamp(5, 40),
            node_spacing: self.node_spacing.max(20.0),
            rank_spacing: self.rank_spacing.max(20.0),
            ..self
        }
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            goodness: GoodnessParams::default(),
            optimization_passes: 4,
            max_per_layer: 20,
            layering_method: LayeringMethod::LongestPath,
            first_pass: true,
            topo_compress: true,
            do_crossing_reduction: true,
            normalize_rows: true,
            incremental_compress: false,
            inheritance_squash: false,
            overlay_option: OverlayOption::None,
            node_spacing: 80.0,
            rank_spacing: 80.0,
        }
    }
}

/// Worksheet strategy: row-major grid placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorksheetParams {
    pub columns: usize,
    /// Stagger each row by half a column pitch.
    pub diagonal: bool,
    pub node_spacing: f32,
    pub row_spacing: f32,
    pub goodness: GoodnessParams,
    pub optimization_passes: usize,
    pub overlay_option: OverlayOption,
}

impl Default for WorksheetParams {
    fn default() -> Self {
        Self {
            columns: 6,
            diagonal: false,
            node_spacing: 100.0,
            row_spacing: 80.0,
            goodness: GoodnessParams::default(),
            optimization_passes: 4,
            overlay_option: OverlayOption::Refit,
        }
    }
}

/// Halo strategy: radial rings around a designated core set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaloParams {
    /// Core node ids. Empty picks the first declared node.
    pub core: Vec<String>,
    pub ring_spacing: f32,
    pub start_angle_deg: f32,
    pub goodness: GoodnessParams,
    pub optimization_passes: usize,
    pub overlay_option: OverlayOption,
}

impl Default for HaloParams {
    fn default() -> Self {
        Self {
            core: Vec::new(),
            ring_spacing: 120.0,
            start_angle_deg: 0.0,
            goodness: GoodnessParams::default(),
            optimization_passes: 4,
            overlay_option: OverlayOption::Refit,
        }
    }
}

/// StackedBlock strategy: hierarchy-rooted blocks stacked vertically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedBlockParams {
    pub max_per_row: usize,
    pub block_gap: f32,
    pub node_spacing: f32,
    pub row_spacing: f32,
    pub goodness: GoodnessParams,
    pub optimization_passes: usize,
    pub overlay_option: OverlayOption,
}

impl Default for StackedBlockParams {
    fn default() -> Self {
        Self {
            max_per_row: 8,
            block_gap: 60.0,
            node_spacing: 100.0,
            row_spacing: 70.0,
            goodness: GoodnessParams::default(),
            optimization_passes: 4,
            overlay_option: OverlayOption::Refit,
        }
    }
}

/// Whole-diagram algorithm selection, dispatched once per run. Each
/// variant carries its own parameter payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStrategy {
    Layered(LayoutOptions),
    Worksheet(WorksheetParams),
    Halo(HaloParams),
    StackedBlock(StackedBlockParams),
}

static PRESETS: Lazy<BTreeMap<&'static str, LayoutOptions>> = Lazy::new(|| {
    let mut table = BTreeMap::new();
    table.insert("default", LayoutOptions::default());
    table.insert(
        "tight",
        LayoutOptions {
            goodness: GoodnessParams::new(0.8, 0.5, 0.4, 5.0),
            optimization_passes: 8,
            max_per_layer: 12,
            node_spacing: 50.0,
            rank_spacing: 50.0,
            ..LayoutOptions::default()
        },
    );
    table.insert(
        "sparse",
        LayoutOptions {
            goodness: GoodnessParams::new(0.3, 1.0, 0.1, 40.0),
            optimization_passes: 2,
            max_per_layer: 40,
            node_spacing: 140.0,
            rank_spacing: 120.0,
            ..LayoutOptions::default()
        },
    );
    table
});

/// Named baseline option sets, used by hosts for "reset to defaults".
pub fn preset(name: &str) -> Option<LayoutOptions> {
    PRESETS.get(name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goodness_params_clamp_to_range() {
        let params = GoodnessParams::new(2.0, 0.0, -1.0, 500.0);
        assert_eq!(params.crossing_coeff, 1.0);
        assert_eq!(params.crossing_multiplier, 0.01);
        assert_eq!(params.difference_coeff, 0.0);
        assert_eq!(params.difference_sigma, 100.0);
    }

    #[test]
    fn fewer_conflicts_score_strictly_better() {
        let params = GoodnessParams::new(0.5, 0.5, 0.5, 10.0);
        assert!(params.score(1, 20.0) < params.score(2, 20.0));
    }

    #[test]
    fn larger_sigma_tolerates_detours() {
        let narrow = GoodnessParams::new(0.0, 1.0, 1.0, 5.0);
        let wide = GoodnessParams::new(0.0, 1.0, 1.0, 50.0);
        assert!(wide.score(0, 30.0) < narrow.score(0, 30.0));
    }

    #[test]
    fn options_clamp_passes_and_layer_cap() {
        let options = LayoutOptions {
            optimization_passes: 99,
            max_per_layer: 2,
            ..LayoutOptions::default()
        }
        .clamped();
        assert_eq!(options.optimization_passes, MAX_OPT_PASSES);
        assert_eq!(options.max_per_layer, 5);
    }

    #[test]
    fn presets_exist() {
        assert!(preset("default").is_some());
        assert!(preset("tight").is_some());
        assert!(preset("sparse").is_some());
        assert!(preset("unknown").is_none());
    }
}
