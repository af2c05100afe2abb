use anyhow::Context;
use chrono::{DateTime, Local};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Extension shared by the roster and all race result files.
pub const RESULT_FILE_EXTENSION: &str = "simulation";

const NO_FIELDS: usize = 8;

/// Standing stores the finish of one participant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Standing {
    pub uuid: String,
    pub place: u32,
    pub distance: f64,
    pub score: i64,
}

/// RaceResult contains everything that is persisted about one race. Only finishers have a
/// standing, ordered by place.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RaceResult {
    pub race_id: String,
    pub total_distance: f64,
    pub rounds: u32,
    pub date: String,
    pub time: String,
    pub standings: Vec<Standing>,
}

impl RaceResult {
    pub fn new(
        race_id: &str,
        total_distance: f64,
        rounds: u32,
        recorded_at: DateTime<Local>,
        standings: Vec<Standing>,
    ) -> RaceResult {
        RaceResult {
            race_id: race_id.to_owned(),
            total_distance,
            rounds,
            date: recorded_at.format("%Y-%m-%d").to_string(),
            time: recorded_at.format("%H:%M:%S").to_string(),
            standings,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.race_id, RESULT_FILE_EXTENSION)
    }

    /// includes returns true if the given participant finished this race.
    pub fn includes(&self, uuid: &str) -> bool {
        self.standings.iter().any(|s| s.uuid == uuid)
    }

    /// write_to_dir writes the result file into dir (created if missing) and returns its path.
    /// The first row carries the race metadata, every further row one standing.
    pub fn write_to_dir(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .context(format!("Failed to create data directory {}!", dir.display()))?;
        let out_path = dir.join(self.file_name());

        let fh = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&out_path)
            .context(format!("Failed to open result file {}!", out_path.display()))?;
        let mut writer = csv::Writer::from_writer(fh);

        let total_distance = self.total_distance.to_string();
        let rounds = self.rounds.to_string();

        writer.write_record(&[
            self.race_id.as_str(),
            "",
            "",
            "",
            total_distance.as_str(),
            rounds.as_str(),
            self.date.as_str(),
            self.time.as_str(),
        ])?;
        for standing in self.standings.iter() {
            writer.write_record(&[
                standing.uuid.to_owned(),
                standing.place.to_string(),
                standing.distance.to_string(),
                standing.score.to_string(),
                total_distance.to_owned(),
                rounds.to_owned(),
                self.date.to_owned(),
                self.time.to_owned(),
            ])?;
        }
        writer
            .flush()
            .context(format!("Failed to write result file {}!", out_path.display()))?;

        Ok(out_path)
    }

    /// format_standings renders the placements as a text table. Names are looked up by UUID,
    /// unknown participants are shown by their UUID.
    pub fn format_standings(&self, names: &HashMap<String, String>) -> String {
        let mut content = String::new();
        // writing into a String cannot fail
        let _ = writeln!(
            &mut content,
            "RESULT: {} | {} {} | {} rounds | total distance {}",
            self.race_id, self.date, self.time, self.rounds, self.total_distance
        );
        for standing in self.standings.iter() {
            let name = names
                .get(&standing.uuid)
                .map(String::as_str)
                .unwrap_or(&standing.uuid);
            let _ = writeln!(
                &mut content,
                "{:3}. {:<20} {:>9.1} {:>6} pts",
                standing.place, name, standing.distance, standing.score
            );
        }
        content
    }
}

/// read_race_result reads a result file. A missing file or an unreadable metadata row is an error,
/// malformed standing rows are skipped.
pub fn read_race_result(filepath: &Path) -> anyhow::Result<RaceResult> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(filepath)
        .context(format!("Failed to open result file {}!", filepath.display()))?;
    let mut records = reader.records();

    let meta = records
        .next()
        .ok_or_else(|| anyhow::anyhow!("Result file {} is empty!", filepath.display()))?
        .context(format!("Failed to read result file {}!", filepath.display()))?;
    if meta.len() < NO_FIELDS {
        anyhow::bail!(
            "Result file {} has an invalid metadata row ({} fields)!",
            filepath.display(),
            meta.len()
        );
    }

    let mut result = RaceResult {
        race_id: meta[0].to_owned(),
        total_distance: meta[4]
            .trim()
            .parse()
            .context(format!("Invalid total distance in {}!", filepath.display()))?,
        rounds: meta[5]
            .trim()
            .parse()
            .context(format!("Invalid round count in {}!", filepath.display()))?,
        date: meta[6].to_owned(),
        time: meta[7].to_owned(),
        standings: Vec::new(),
    };

    for (row, record) in records.enumerate() {
        match record.map_err(anyhow::Error::from).and_then(|r| parse_standing(&r)) {
            Ok(standing) => result.standings.push(standing),
            Err(e) => warn!(
                "Skipping row {} of result file {}: {}",
                row + 2,
                filepath.display(),
                e
            ),
        }
    }

    Ok(result)
}

fn parse_standing(record: &csv::StringRecord) -> anyhow::Result<Standing> {
    if record.len() < NO_FIELDS {
        anyhow::bail!("expected {} fields, found {}", NO_FIELDS, record.len());
    }
    Ok(Standing {
        uuid: record[0].to_owned(),
        place: record[1].trim().parse()?,
        distance: record[2].trim().parse()?,
        score: record[3].trim().parse()?,
    })
}

/// list_race_results reads every result file in dir, skipping the roster file and files that
/// cannot be read. Results are ordered from oldest to newest.
pub fn list_race_results(dir: &Path, roster_path: &Path) -> anyhow::Result<Vec<RaceResult>> {
    let entries = std::fs::read_dir(dir)
        .context(format!("Failed to read data directory {}!", dir.display()))?;
    let roster_name = roster_path.file_name();

    let mut results = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_result_file = path.extension().map_or(false, |ext| ext == RESULT_FILE_EXTENSION)
            && path.file_name() != roster_name;
        if !is_result_file {
            continue;
        }

        match read_race_result(&path) {
            Ok(result) => results.push(result),
            Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
        }
    }

    results.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));
    Ok(results)
}
