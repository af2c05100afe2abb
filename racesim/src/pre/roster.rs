use crate::core::participant::Participant;
use crate::error::ConfigError;
use crate::post::race_result::Standing;
use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const ROSTER_FILE_NAME: &str = "animal.simulation";
pub const ROSTER_HEADER: [&str; 5] = ["Name", "Score", "MinSpeed", "MaxSpeed", "UUID"];

/// One roster row, in file column order.
#[derive(Debug, Deserialize, Serialize)]
struct RosterRecord {
    name: String,
    score: i64,
    min_speed: f64,
    max_speed: f64,
    uuid: String,
}

impl From<&Participant> for RosterRecord {
    fn from(p: &Participant) -> Self {
        RosterRecord {
            name: p.name.to_owned(),
            score: p.score,
            min_speed: p.min_speed,
            max_speed: p.max_speed,
            uuid: p.uuid.to_owned(),
        }
    }
}

pub fn roster_path(data_dir: &Path) -> PathBuf {
    data_dir.join(ROSTER_FILE_NAME)
}

/// ensure_roster creates the parent folder and an empty roster (header only) if they do not exist
/// yet. Returns true if the file was created.
pub fn ensure_roster(filepath: &Path) -> anyhow::Result<bool> {
    if filepath.exists() {
        return Ok(false);
    }
    if let Some(dir) = filepath.parent() {
        std::fs::create_dir_all(dir)
            .context(format!("Failed to create data directory {}!", dir.display()))?;
    }

    let mut writer = csv::Writer::from_path(filepath)
        .context(format!("Failed to create roster file {}!", filepath.display()))?;
    writer.write_record(&ROSTER_HEADER)?;
    writer.flush()?;

    info!("Created roster file {}", filepath.display());
    Ok(true)
}

/// load_roster reads all participants of the roster file. A missing file or a malformed header is
/// an error, malformed participant rows are skipped.
pub fn load_roster(filepath: &Path) -> anyhow::Result<Vec<Participant>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(filepath)
        .context(format!("Failed to open roster file {}!", filepath.display()))?;
    let mut records = reader.records();

    let header = records
        .next()
        .ok_or_else(|| anyhow::anyhow!("Roster file {} is empty!", filepath.display()))?
        .context(format!("Failed to read roster file {}!", filepath.display()))?;
    if header.len() != ROSTER_HEADER.len() {
        anyhow::bail!(
            "Roster file {} has a malformed header ({} fields)!",
            filepath.display(),
            header.len()
        );
    }

    let mut participants = Vec::new();
    for (row, record) in records.enumerate() {
        match record.map_err(anyhow::Error::from).and_then(|r| parse_roster_row(&r)) {
            Ok(participant) => participants.push(participant),
            Err(e) => warn!(
                "Skipping row {} of roster file {}: {}",
                row + 2,
                filepath.display(),
                e
            ),
        }
    }

    Ok(participants)
}

fn parse_roster_row(record: &csv::StringRecord) -> anyhow::Result<Participant> {
    if record.len() != ROSTER_HEADER.len() {
        anyhow::bail!("expected {} fields, found {}", ROSTER_HEADER.len(), record.len());
    }
    let row: RosterRecord = record.deserialize(None)?;
    if row.uuid.is_empty() {
        anyhow::bail!("missing UUID");
    }
    Ok(Participant::new(
        &row.uuid,
        &row.name,
        row.min_speed,
        row.max_speed,
        row.score,
    ))
}

/// add_participant appends a new participant with a fresh UUID and zero score to the roster,
/// creating the roster first if necessary.
pub fn add_participant(
    filepath: &Path,
    name: &str,
    min_speed: f64,
    max_speed: f64,
) -> anyhow::Result<Participant> {
    ensure_roster(filepath)?;
    let participant = Participant::create(name, min_speed, max_speed);

    let fh = OpenOptions::new()
        .append(true)
        .open(filepath)
        .context(format!("Failed to open roster file {}!", filepath.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(fh);
    writer.serialize(RosterRecord::from(&participant))?;
    writer
        .flush()
        .context(format!("Failed to write roster file {}!", filepath.display()))?;

    Ok(participant)
}

/// select_participants picks the roster entries with the given UUIDs, in the given order. An empty
/// selection means the whole roster.
pub fn select_participants(
    roster: &[Participant],
    uuids: &[String],
) -> Result<Vec<Participant>, ConfigError> {
    if uuids.is_empty() {
        return Ok(roster.to_vec());
    }

    uuids
        .iter()
        .map(|uuid| {
            roster
                .iter()
                .find(|p| &p.uuid == uuid)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownParticipant(uuid.to_owned()))
        })
        .collect()
}

/// update_roster_scores adds the points of each standing to the score of the roster row with the
/// same UUID. The whole file is read, patched in memory and written to a temporary file which then
/// replaces the roster. Rows that cannot be patched are written back unchanged. Returns the number
/// of patched rows.
pub fn update_roster_scores(filepath: &Path, standings: &[Standing]) -> anyhow::Result<usize> {
    let mut points: HashMap<&str, i64> = HashMap::with_capacity(standings.len());
    for standing in standings.iter() {
        *points.entry(standing.uuid.as_str()).or_insert(0) += standing.score;
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(filepath)
        .context(format!("Failed to open roster file {}!", filepath.display()))?;
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record.context(format!("Failed to read roster file {}!", filepath.display()))?);
    }

    let mut no_patched = 0;
    for (row, record) in records.iter_mut().enumerate().skip(1) {
        if record.len() != ROSTER_HEADER.len() {
            continue;
        }
        let add = match points.get(record[4].trim()) {
            Some(&add) => add,
            None => continue,
        };
        let old_score: i64 = match record[1].trim().parse() {
            Ok(score) => score,
            Err(_) => {
                warn!(
                    "Row {} of roster file {} has an unreadable score, leaving it untouched",
                    row + 1,
                    filepath.display()
                );
                continue;
            }
        };

        let new_score = (old_score + add).to_string();
        let patched: csv::StringRecord = record
            .iter()
            .enumerate()
            .map(|(i, field)| if i == 1 { new_score.as_str() } else { field })
            .collect();
        *record = patched;
        no_patched += 1;
    }

    write_atomically(filepath, &records)?;
    Ok(no_patched)
}

fn write_atomically(filepath: &Path, records: &[csv::StringRecord]) -> anyhow::Result<()> {
    let file_name = filepath
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid roster path {}!", filepath.display()))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = filepath.with_file_name(tmp_name);

    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&tmp_path)
            .context(format!("Failed to create {}!", tmp_path.display()))?;
        for record in records.iter() {
            writer.write_record(record)?;
        }
        writer
            .flush()
            .context(format!("Failed to write {}!", tmp_path.display()))?;
    }

    std::fs::rename(&tmp_path, filepath).context(format!(
        "Failed to replace roster file {}!",
        filepath.display()
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(uuid: &str, score: i64) -> Standing {
        Standing {
            uuid: uuid.to_owned(),
            place: 1,
            distance: 0.0,
            score,
        }
    }

    #[test]
    fn new_roster_has_only_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = roster_path(&dir.path().join("data"));
        assert!(ensure_roster(&path).unwrap());
        assert!(!ensure_roster(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Name,Score,MinSpeed,MaxSpeed,UUID\n");
        assert!(load_roster(&path).unwrap().is_empty());
    }

    #[test]
    fn added_participants_are_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = roster_path(dir.path());
        let hare = add_participant(&path, "Hare, the fast", 9.0, 3.0).unwrap();
        let tortoise = add_participant(&path, "Tortoise", 0.0, 2.0).unwrap();

        let roster = load_roster(&path).unwrap();
        assert_eq!(roster, vec![hare, tortoise]);
        assert_eq!(roster[0].name, "Hare, the fast");
        assert_eq!((roster[0].min_speed, roster[0].max_speed), (3.0, 9.0));
        assert_eq!((roster[1].min_speed, roster[1].max_speed), (1.0, 2.0));
    }

    #[test]
    fn malformed_rows_are_skipped_but_a_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = roster_path(dir.path());
        assert!(load_roster(&path).is_err());

        std::fs::write(
            &path,
            "Name,Score,Min Speed,Max Speed,UUID\n\
             Hare,12,3,9,u1\n\
             Broken,abc,3,9,u2\n\
             Short,1,2\n\
             Tortoise, 4 , 1 , 2 ,u3\n",
        )
        .unwrap();
        let roster = load_roster(&path).unwrap();
        let uuids: Vec<&str> = roster.iter().map(|p| p.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["u1", "u3"]);
        assert_eq!(roster[1].score, 4);
    }

    #[test]
    fn scores_are_added_and_other_rows_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = roster_path(dir.path());
        std::fs::write(
            &path,
            "Name,Score,MinSpeed,MaxSpeed,UUID\n\
             Hare,12,3,9,u1\n\
             Short,1,2\n\
             Tortoise,4,1,2,u3\n\
             Fox,7,2,8,u4\n",
        )
        .unwrap();

        let no_patched =
            update_roster_scores(&path, &[standing("u3", 30), standing("u1", 5), standing("zz", 9)])
                .unwrap();
        assert_eq!(no_patched, 2);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Name,Score,MinSpeed,MaxSpeed,UUID\n\
             Hare,17,3,9,u1\n\
             Short,1,2\n\
             Tortoise,34,1,2,u3\n\
             Fox,7,2,8,u4\n"
        );
        assert!(!dir.path().join("animal.simulation.tmp").exists());
    }

    #[test]
    fn selection_keeps_the_requested_order() {
        let roster = vec![
            Participant::new("u1", "Hare", 3.0, 9.0, 0),
            Participant::new("u2", "Tortoise", 1.0, 2.0, 0),
        ];
        let picked = select_participants(&roster, &["u2".to_owned(), "u1".to_owned()]).unwrap();
        assert_eq!(picked[0].name, "Tortoise");
        assert_eq!(select_participants(&roster, &[]).unwrap().len(), 2);
        assert_eq!(
            select_participants(&roster, &["nope".to_owned()]).unwrap_err(),
            ConfigError::UnknownParticipant("nope".to_owned())
        );
    }
}
