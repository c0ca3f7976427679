use paramorph::{
    parameter::Parameter,
    preset::PresetHandler,
    sequencer::{Phase, PresetSequencer, Sequence, SequencerState, Step},
};
use pretty_assertions::assert_eq;
use std::{fs, sync::Arc, time::Duration};
use tempdir::TempDir;

fn setup() -> (TempDir, Arc<Parameter>, PresetSequencer) {
    let dir = TempDir::new("sequencer").unwrap();
    let handler = PresetHandler::new(dir.path()).unwrap();
    let x = Arc::new(Parameter::new("X", "Position", 0.0).with_range(-10.0, 10.0));
    handler.register(Arc::clone(&x)).unwrap();

    for &(label, value) in &[("A", 1.0), ("B", 5.0), ("C", 3.0)] {
        x.set(value);
        handler.store_preset(label).unwrap();
    }
    x.set(0.0);

    fs::write(
        dir.path().join("demo.sequence"),
        "A:0:3\nB:4:2\nC:1:1\n::\n",
    )
    .unwrap();
    (dir, x, PresetSequencer::new(handler))
}

fn playing(step: usize, phase: Phase) -> SequencerState {
    SequencerState::Playing {
        sequence: "demo".into(),
        step,
        phase,
    }
}

#[test]
fn test_timeline() {
    let (_dir, x, sequencer) = setup();
    let half_second = Duration::from_millis(500);

    sequencer.play_sequence("demo").unwrap();
    assert_eq!(x.get(), 1.0);
    assert_eq!(sequencer.state(), playing(0, Phase::Waiting));

    // (seconds since start, expected x, expected state)
    let expected = vec![
        (1.0, 1.0, playing(0, Phase::Waiting)),
        (3.0, 1.0, playing(1, Phase::Morphing)),
        (5.0, 3.0, playing(1, Phase::Morphing)),
        (7.0, 5.0, playing(1, Phase::Waiting)),
        (8.0, 5.0, playing(1, Phase::Waiting)),
        (9.0, 5.0, playing(2, Phase::Morphing)),
        (9.5, 4.0, playing(2, Phase::Morphing)),
        (10.0, 3.0, playing(2, Phase::Waiting)),
        (10.5, 3.0, playing(2, Phase::Waiting)),
        (11.0, 3.0, SequencerState::Idle),
    ];

    let mut now = 0.0;
    for (at, value, state) in expected {
        while now < at {
            sequencer.advance(half_second);
            now += 0.5;
        }
        assert_eq!((now, x.get(), sequencer.state()), (at, value, state));
    }
}

#[test]
fn test_single_advance_covers_whole_sequence() {
    let (_dir, x, sequencer) = setup();
    sequencer.play_sequence("demo").unwrap();
    sequencer.advance(Duration::from_secs(11));
    assert_eq!(x.get(), 3.0);
    assert!(!sequencer.is_playing());
}

#[test]
fn test_leftover_time_carries_into_next_step() {
    let (_dir, x, sequencer) = setup();
    sequencer.play_sequence("demo").unwrap();

    // 3s of waiting plus 2s into the 4s morph to B.
    sequencer.advance(Duration::from_secs(5));
    assert_eq!(x.get(), 3.0);
    assert_eq!(sequencer.state(), playing(1, Phase::Morphing));
}

#[test]
fn test_retrigger_restarts() {
    let (_dir, x, sequencer) = setup();
    sequencer.play_sequence("demo").unwrap();
    sequencer.advance(Duration::from_secs(5));
    assert_eq!(x.get(), 3.0);

    sequencer.play_sequence("demo").unwrap();
    assert_eq!(x.get(), 1.0);
    assert_eq!(sequencer.state(), playing(0, Phase::Waiting));
}

#[test]
fn test_missing_sequence_keeps_playing() {
    let (_dir, _x, sequencer) = setup();
    sequencer.play_sequence("demo").unwrap();
    sequencer.advance(Duration::from_secs(1));

    let err = sequencer.play_sequence("nothing").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(sequencer.state(), playing(0, Phase::Waiting));
}

#[test]
fn test_missing_preset_is_skipped() {
    let (dir, x, sequencer) = setup();
    fs::write(
        dir.path().join("gaps.sequence"),
        "A:0:1\nmissing:5:1\nC:0:1\n::\n",
    )
    .unwrap();

    sequencer.play_sequence("gaps").unwrap();
    sequencer.advance(Duration::from_secs(1));
    assert_eq!(
        sequencer.state(),
        SequencerState::Playing {
            sequence: "gaps".into(),
            step: 1,
            phase: Phase::Waiting,
        }
    );
    assert_eq!(x.get(), 1.0);

    sequencer.advance(Duration::from_secs(1));
    assert_eq!(x.get(), 3.0);
}

#[test]
fn test_stop_leaves_values() {
    let (_dir, x, sequencer) = setup();
    sequencer.play_sequence("demo").unwrap();
    sequencer.advance(Duration::from_secs(5));
    sequencer.stop();

    sequencer.advance(Duration::from_secs(5));
    assert_eq!(x.get(), 3.0);
    assert_eq!(sequencer.state(), SequencerState::Idle);
    assert!(!sequencer.handler().is_morphing());
}

#[test]
fn test_store_and_list_sequences() {
    let (dir, _x, sequencer) = setup();
    let sequence = Sequence {
        name: "short".into(),
        steps: vec![
            Step::new("A", Duration::from_millis(250), Duration::from_secs(1)),
            Step::new("C", Duration::ZERO, Duration::from_secs(2)),
        ],
    };
    sequencer.store_sequence(&sequence).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("short.sequence")).unwrap(),
        "A:0.25:1.0\nC:0.0:2.0\n::\n"
    );
    assert_eq!(sequencer.load_sequence("short").unwrap(), sequence);
    assert_eq!(
        sequencer.sequence_names().unwrap(),
        vec!["demo".to_owned(), "short".to_owned()]
    );
}
