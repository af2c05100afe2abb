use crate::core::race::RacePars;
use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;

/// read_race_pars reads the JSON file and decodes the JSON string into the race parameters struct.
/// Only `total_distance` is mandatory, everything else falls back to its default.
pub fn read_race_pars(filepath: &Path) -> anyhow::Result<RacePars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}
