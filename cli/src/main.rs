use clap::Parser;
use log::{info, warn};
use racesim::core::control::{EnginePhase, RaceController};
use racesim::core::handle_race::{handle_race, RaceEngine};
use racesim::core::race::RaceOutcome;
use racesim::core::speed_draw::{RngDraw, SpeedDraw};
use racesim::interfaces::render_interface::{RaceState, MAX_RENDER_UPDATE_FREQUENCY};
use racesim::post::leaderboard::{find_participants, format_leaderboard, sort_roster};
use racesim::post::race_result::list_race_results;
use racesim::post::recorder::ResultRecorder;
use racesim::pre::roster::{
    add_participant, ensure_roster, load_roster, roster_path, select_participants,
};
use racesim::pre::sim_opts::{Command, RaceOpts, SimOpts};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

// width of the track bar in the console view
const TRACK_WIDTH: usize = 40;

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    // RUST_LOG takes precedence over the debug flag
    let default_filter = if sim_opts.debug { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .try_init();

    // EXECUTION -----------------------------------------------------------------------------------
    let data_dir = sim_opts.data_dir.as_path();
    match &sim_opts.command {
        Command::Init => {
            let filepath = roster_path(data_dir);
            if !ensure_roster(&filepath)? {
                info!("Roster {} already exists", filepath.display());
            }
        }
        Command::Add {
            name,
            min_speed,
            max_speed,
        } => {
            let participant = add_participant(&roster_path(data_dir), name, *min_speed, *max_speed)?;
            println!(
                "Added {} (speed {} to {}) with UUID {}",
                participant.name, participant.min_speed, participant.max_speed, participant.uuid
            );
        }
        Command::Race(race_opts) => run_race(data_dir, race_opts)?,
        Command::Leaderboard { sort } => {
            let roster = load_roster(&roster_path(data_dir))?;
            print!("{}", format_leaderboard(&sort_roster(&roster, *sort)));
        }
        Command::Races { participant } => list_races(data_dir, participant.as_deref())?,
    }

    Ok(())
}

fn run_race(data_dir: &Path, race_opts: &RaceOpts) -> anyhow::Result<()> {
    let race_pars = race_opts.race_pars()?;
    let roster = load_roster(&roster_path(data_dir))?;
    let participants = select_participants(&roster, &race_pars.participants)?;
    let names = name_lookup(&participants);

    let mut draw: Box<dyn SpeedDraw> = match race_opts.seed {
        Some(seed) => Box::new(RngDraw::seeded(seed)),
        None => Box::new(RngDraw::from_entropy()),
    };

    let t_start = Instant::now();
    let outcome: RaceOutcome = if race_opts.headless {
        info!("Running race without real-time pacing...");
        handle_race(&race_pars, participants, draw.as_mut(), None)?
    } else {
        let mut engine = RaceEngine::new();
        let rx = engine.subscribe();
        engine.start(&race_pars, participants, draw)?;

        if race_opts.interactive {
            println!("Control the race with p (pause), r (resume) and e (end) followed by Enter");
            spawn_control_thread(engine.controller());
        }

        // fast races would flood the console, so rounds are skipped down to the render frequency
        let min_render_gap = Duration::from_secs_f64(1.0 / MAX_RENDER_UPDATE_FREQUENCY);
        let mut t_last_render: Option<Instant> = None;

        loop {
            match rx.recv_timeout(Duration::from_millis(500)) {
                Ok(race_state) => {
                    let is_final = race_state.final_result.is_some();
                    let render_due = t_last_render.map_or(true, |t| t.elapsed() >= min_render_gap);
                    if is_final || render_due {
                        render_race_state(&race_state);
                        t_last_render = Some(Instant::now());
                    }
                    if is_final {
                        break;
                    }
                }
                Err(flume::RecvTimeoutError::Timeout) => {
                    if engine.phase() == EnginePhase::Completed {
                        break;
                    }
                }
                Err(flume::RecvTimeoutError::Disconnected) => break,
            }
        }

        engine.join()?
    };
    info!("Execution time: {}ms", t_start.elapsed().as_millis());

    if outcome.ended_early {
        println!("Race ended before all participants finished, only finishers are ranked");
    }
    print!("{}", outcome.result.format_standings(&names));

    // failures are logged by the recorder, the race itself is over anyway
    let report = ResultRecorder::new(data_dir).record(&outcome.result);
    if !report.is_ok() {
        warn!("Race {} was not fully recorded", outcome.result.race_id);
    }

    Ok(())
}

fn list_races(data_dir: &Path, query: Option<&str>) -> anyhow::Result<()> {
    let roster_filepath = roster_path(data_dir);
    let roster = load_roster(&roster_filepath)?;
    let names = name_lookup(&roster);

    let uuids: Option<Vec<&str>> = match query {
        Some(query) => {
            let matches = find_participants(&roster, query);
            if matches.is_empty() {
                anyhow::bail!("No participant in the roster matches {:?}!", query);
            }
            Some(matches.iter().map(|p| p.uuid.as_str()).collect())
        }
        None => None,
    };

    let mut no_shown = 0;
    for result in list_race_results(data_dir, &roster_filepath)?.iter() {
        let shown = match &uuids {
            Some(uuids) => uuids.iter().any(|uuid| result.includes(uuid)),
            None => true,
        };
        if shown {
            println!("{}", result.format_standings(&names));
            no_shown += 1;
        }
    }
    info!("{} races listed", no_shown);

    Ok(())
}

// METHODS (HELPERS) -------------------------------------------------------------------------------

fn name_lookup(participants: &[racesim::core::participant::Participant]) -> HashMap<String, String> {
    participants
        .iter()
        .map(|p| (p.uuid.to_owned(), p.name.to_owned()))
        .collect()
}

fn render_race_state(race_state: &RaceState) {
    println!("ROUND {} ({:?})", race_state.round, race_state.phase);
    for idx in race_state.display_order() {
        let p = &race_state.participant_states[idx];
        let filled = ((p.track_pos * TRACK_WIDTH as f64).round() as usize).min(TRACK_WIDTH);
        let status = match p.place {
            Some(place) => format!("finished #{}", place),
            None if p.resting => "resting".to_owned(),
            None => format!("endurance {:.1}", p.endurance),
        };
        println!(
            "  {:<16} |{}{}| {:>8.1}  {}",
            p.name,
            "=".repeat(filled),
            " ".repeat(TRACK_WIDTH - filled),
            p.distance,
            status
        );
    }
}

fn spawn_control_thread(controller: RaceController) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            let command = line.trim();
            let accepted = match command {
                "p" => controller.pause(),
                "r" => controller.resume(),
                "e" => controller.end(),
                "" => continue,
                _ => {
                    warn!("Unknown command {:?}, use p, r or e", command);
                    continue;
                }
            };
            if !accepted {
                warn!("Command {:?} ignored while {:?}", command, controller.phase());
            }
            if controller.phase() == EnginePhase::Completed {
                break;
            }
        }
    });
}
