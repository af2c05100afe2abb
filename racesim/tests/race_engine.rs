use racesim::core::control::EnginePhase;
use racesim::core::handle_race::RaceEngine;
use racesim::core::participant::Participant;
use racesim::core::race::RacePars;
use racesim::core::speed_draw::SequenceDraw;
use racesim::error::ConfigError;
use racesim::interfaces::render_interface::RaceState;
use std::thread;
use std::time::{Duration, Instant};

fn participant(uuid: &str, speed: f64) -> Participant {
    Participant::new(uuid, uuid, speed, speed, 0)
}

fn race_pars(total_distance: f64, tick_interval_ms: u64) -> RacePars {
    let mut pars = RacePars::new(total_distance);
    pars.tick_interval_ms = tick_interval_ms;
    pars
}

fn wait_for_round(engine: &RaceEngine, round: u32) -> RaceState {
    let t_start = Instant::now();
    loop {
        let race_state = engine.snapshot();
        if race_state.round >= round {
            return race_state;
        }
        assert!(t_start.elapsed() < Duration::from_secs(5), "race did not reach round {}", round);
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn race_runs_to_completion_and_streams_every_round() {
    let mut engine = RaceEngine::new();
    let rx = engine.subscribe();
    engine
        .start(
            &race_pars(25.0, 1),
            vec![participant("a", 10.0), participant("b", 10.0)],
            Box::new(SequenceDraw::constant(0.0)),
        )
        .unwrap();

    let outcome = engine.join().unwrap();
    assert_eq!(engine.phase(), EnginePhase::Completed);
    assert!(!outcome.ended_early);
    assert_eq!(outcome.result.rounds, 3);
    let uuids: Vec<&str> = outcome.result.standings.iter().map(|s| s.uuid.as_str()).collect();
    assert_eq!(uuids, vec!["a", "b"]);

    let states: Vec<RaceState> = rx.try_iter().collect();
    let rounds: Vec<u32> = states.iter().map(|s| s.round).collect();
    assert_eq!(rounds, vec![1, 2, 3, 3]);

    let last = states.last().unwrap();
    assert_eq!(last.phase, EnginePhase::Completed);
    assert_eq!(last.final_result.as_ref(), Some(&outcome.result));
    assert_eq!(engine.snapshot(), *last);
}

#[test]
fn ending_a_race_ranks_only_the_finishers() {
    let mut engine = RaceEngine::new();
    engine
        .start(
            &race_pars(25.0, 10_000),
            vec![
                participant("fast-1", 30.0),
                participant("slow-1", 1.0),
                participant("fast-2", 30.0),
                participant("slow-2", 1.0),
                participant("fast-3", 30.0),
            ],
            Box::new(SequenceDraw::constant(0.0)),
        )
        .unwrap();

    let race_state = wait_for_round(&engine, 1);
    assert_eq!(race_state.participant_states.iter().filter(|p| p.finished).count(), 3);

    let t_end = Instant::now();
    assert!(engine.end());
    let outcome = engine.join().unwrap();
    // the long tick interval must not delay the end
    assert!(t_end.elapsed() < Duration::from_secs(5));

    assert!(outcome.ended_early);
    assert_eq!(outcome.result.rounds, 1);
    let placed: Vec<(&str, u32)> = outcome
        .result
        .standings
        .iter()
        .map(|s| (s.uuid.as_str(), s.place))
        .collect();
    assert_eq!(placed, vec![("fast-1", 1), ("fast-2", 2), ("fast-3", 3)]);
    assert!(!outcome.result.includes("slow-1"));
    assert!(!outcome.result.includes("slow-2"));
}

#[test]
fn paused_race_does_not_advance() {
    let mut engine = RaceEngine::new();
    let rx = engine.subscribe();
    engine
        .start(
            &race_pars(1000.0, 5),
            vec![participant("a", 1.0), participant("b", 1.0)],
            Box::new(SequenceDraw::constant(0.0)),
        )
        .unwrap();

    wait_for_round(&engine, 2);
    assert!(engine.pause());
    assert!(!engine.pause());
    assert_eq!(engine.phase(), EnginePhase::Paused);

    let frozen = engine.snapshot();
    let no_sent = rx.len();
    thread::sleep(Duration::from_millis(60));
    assert_eq!(engine.snapshot(), frozen);
    assert_eq!(rx.len(), no_sent);

    assert!(engine.resume());
    wait_for_round(&engine, frozen.round + 1);

    assert!(engine.end());
    let outcome = engine.join().unwrap();
    assert!(outcome.ended_early);
    assert!(outcome.result.standings.is_empty());
    assert!(outcome.result.rounds > frozen.round);
}

#[test]
fn a_paused_race_can_be_ended() {
    let mut engine = RaceEngine::new();
    engine
        .start(
            &race_pars(1000.0, 5),
            vec![participant("a", 1.0)],
            Box::new(SequenceDraw::constant(0.0)),
        )
        .unwrap();

    wait_for_round(&engine, 1);
    assert!(engine.pause());
    assert!(engine.end());
    assert!(!engine.resume());

    let outcome = engine.join().unwrap();
    assert!(outcome.ended_early);
    assert_eq!(engine.phase(), EnginePhase::Completed);
}

#[test]
fn engine_runs_a_single_race() {
    let mut engine = RaceEngine::new();
    assert_eq!(
        engine
            .start(&race_pars(25.0, 1), Vec::new(), Box::new(SequenceDraw::constant(0.0)))
            .unwrap_err(),
        ConfigError::NoParticipants
    );
    assert_eq!(engine.phase(), EnginePhase::Idle);
    assert!(engine.join().is_err());

    engine
        .start(&race_pars(25.0, 1), vec![participant("a", 10.0)], Box::new(SequenceDraw::constant(0.0)))
        .unwrap();
    assert_eq!(
        engine
            .start(&race_pars(25.0, 1), vec![participant("b", 10.0)], Box::new(SequenceDraw::constant(0.0)))
            .unwrap_err(),
        ConfigError::AlreadyStarted
    );

    engine.join().unwrap();
    assert!(engine.join().is_err());
}

#[test]
fn dropping_a_running_engine_stops_the_race() {
    let t_start = Instant::now();
    {
        let mut engine = RaceEngine::new();
        engine
            .start(
                &race_pars(1000.0, 10_000),
                vec![participant("a", 1.0)],
                Box::new(SequenceDraw::constant(0.0)),
            )
            .unwrap();
        wait_for_round(&engine, 1);
    }
    assert!(t_start.elapsed() < Duration::from_secs(5));
}

#[test]
fn every_subscriber_sees_every_round() {
    let mut engine = RaceEngine::new();
    let receivers = vec![engine.subscribe(), engine.subscribe()];
    let mut pars = race_pars(200.0, 1);
    // nobody collapses, so the race lasts exactly 200 / 4 rounds
    pars.full_endurance = 10_000.0;
    engine
        .start(
            &pars,
            vec![participant("a", 4.0), participant("b", 5.0)],
            Box::new(SequenceDraw::constant(0.0)),
        )
        .unwrap();

    // drain concurrently so the subscribers compete for states while the race runs
    let readers: Vec<_> = receivers
        .into_iter()
        .map(|rx| thread::spawn(move || rx.iter().collect::<Vec<RaceState>>()))
        .collect();

    let outcome = engine.join().unwrap();
    assert_eq!(outcome.result.rounds, 50);

    let expected_rounds: Vec<u32> = (1..=50).chain(std::iter::once(50)).collect();
    for reader in readers {
        let states = reader.join().unwrap();
        let rounds: Vec<u32> = states.iter().map(|s| s.round).collect();
        assert_eq!(rounds, expected_rounds);
        assert_eq!(states.last().unwrap().final_result.as_ref(), Some(&outcome.result));
    }
}

#[test]
fn states_are_not_queued_without_subscribers() {
    let mut engine = RaceEngine::new();
    let dropped = engine.subscribe();
    drop(dropped);
    assert_eq!(engine.subscriber_count(), 1);

    engine
        .start(
            &race_pars(1000.0, 10_000),
            vec![participant("a", 1.0)],
            Box::new(SequenceDraw::constant(0.0)),
        )
        .unwrap();
    wait_for_round(&engine, 1);
    assert_eq!(engine.subscriber_count(), 0);

    assert!(engine.end());
    let outcome = engine.join().unwrap();
    assert_eq!(engine.snapshot().final_result, Some(outcome.result));
    assert_eq!(engine.subscriber_count(), 0);
    assert_eq!(engine.subscribe().len(), 0);
}
