//! Writing the branch-predictor profile file.

use std::io::{self, Write};

use crate::predictor::BranchStats;

/// Everything needed to render a profile file.
#[derive(Debug, Clone)]
pub struct ProfileReport {
    /// Name of the predictor that was used, or `None` if simulation ran
    /// without one.
    pub predictor_name: Option<String>,
    /// Predictor table size, for the sized variants (bimodal/gshare) only.
    pub predictor_size: Option<usize>,
    /// Instructions retired during the run.
    pub instructions: u64,
    /// Branch prediction statistics accumulated during the run.
    pub stats: BranchStats,
}

/// Write `report` in the plain-text profile format: `Predictor`, `Size`
/// (sized predictors only), `Instructions`, `Total branches`,
/// `Mispredictions`, then `Misprediction rate` and `MPKI` only when their
/// denominators are nonzero.
pub fn write_profile(mut out: impl Write, report: &ProfileReport) -> io::Result<()> {
    writeln!(out, "Predictor: {}", report.predictor_name.as_deref().unwrap_or("none"))?;
    if let Some(size) = report.predictor_size {
        writeln!(out, "Size: {size}")?;
    }
    writeln!(out, "Instructions: {}", report.instructions)?;
    writeln!(out, "Total branches: {}", report.stats.total_branches)?;
    writeln!(out, "Mispredictions: {}", report.stats.mispredictions)?;

    if let Some(rate) = report.stats.misprediction_rate() {
        writeln!(out, "Misprediction rate: {rate:.2}%")?;
    }
    if let Some(mpki) = report.stats.mpki(report.instructions) {
        writeln!(out, "MPKI: {mpki:.3}")?;
    }
    Ok(())
}
