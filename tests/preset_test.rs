use paramorph::{
    parameter::Parameter,
    preset::{self, PresetHandler},
};
use pretty_assertions::assert_eq;
use std::{fs, sync::Arc, time::Duration};
use tempdir::TempDir;

struct Fixture {
    dir: TempDir,
    x: Arc<Parameter>,
    y: Arc<Parameter>,
    scale: Arc<Parameter>,
    handler: PresetHandler,
}

fn fixture() -> Fixture {
    let dir = TempDir::new("presets").unwrap();
    let x = Arc::new(Parameter::new("X", "Position", 0.0).with_range(-1.0, 1.0));
    let y = Arc::new(Parameter::new("Y", "Position", 0.0).with_range(-1.0, 1.0));
    let scale = Arc::new(Parameter::new("Scale", "Size", 1.0).with_range(0.1, 3.0));
    let handler = PresetHandler::new(dir.path()).unwrap();
    handler
        .register_all(vec![Arc::clone(&x), Arc::clone(&y), Arc::clone(&scale)])
        .unwrap();
    Fixture {
        dir,
        x,
        y,
        scale,
        handler,
    }
}

fn values(f: &Fixture) -> (f32, f32, f32) {
    (f.x.get(), f.y.get(), f.scale.get())
}

#[test]
fn test_store_writes_preset_file() {
    let f = fixture();
    f.x.set(-0.25);
    f.y.set(0.5);
    f.scale.set(2.0);
    f.handler.store_preset_indexed(1, "1").unwrap();

    let text = fs::read_to_string(f.dir.path().join("1.preset")).unwrap();
    assert_eq!(
        text,
        "::1\n/Position/X f -0.25\n/Position/Y f 0.5\n/Size/Scale f 2.0\n::\n"
    );
}

#[test]
fn test_store_and_recall() {
    let f = fixture();
    f.x.set(-0.25);
    f.y.set(0.5);
    f.scale.set(2.0);
    f.handler.store_preset("corner").unwrap();

    f.x.set(1.0);
    f.y.set(1.0);
    f.scale.set(1.0);

    f.handler.recall_preset("corner").unwrap();
    f.handler.advance(Duration::ZERO);
    assert_eq!(values(&f), (-0.25, 0.5, 2.0));
    assert!(!f.handler.is_morphing());
}

#[test]
fn test_recall_morphs_over_morph_time() {
    let f = fixture();
    f.x.set(1.0);
    f.handler.store_preset("right").unwrap();
    f.x.set(0.0);

    f.handler.set_morph_time(Duration::from_secs(4));
    f.handler.recall_preset("right").unwrap();
    assert!(f.handler.is_morphing());

    f.handler.advance(Duration::from_secs(1));
    assert_eq!(f.x.get(), 0.25);
    f.handler.advance(Duration::from_secs(2));
    assert_eq!(f.x.get(), 0.75);
    assert!(f.handler.advance(Duration::from_secs(2)));
    assert_eq!(f.x.get(), 1.0);
}

#[test]
fn test_recall_by_index() {
    let f = fixture();
    f.x.set(0.5);
    f.handler.store_preset_indexed(3, "three").unwrap();
    f.x.set(0.0);

    assert_eq!(f.handler.index_for_label("three"), Some(3));
    assert_eq!(f.handler.label_for_index(3), "three");
    assert_eq!(f.handler.label_for_index(4), "4");

    f.handler.recall_preset_index(3).unwrap();
    f.handler.advance(Duration::ZERO);
    assert_eq!(f.x.get(), 0.5);

    assert!(f.handler.recall_preset_index(4).unwrap_err().is_not_found());
}

#[test]
fn test_recall_subset_and_superset() {
    let f = fixture();
    fs::write(
        f.dir.path().join("partial.preset"),
        "::\n/Position/X f 0.75\n/Colour/Hue f 0.3\n::\n",
    )
    .unwrap();

    f.y.set(-0.5);
    f.handler.recall_preset("partial").unwrap();
    f.handler.advance(Duration::ZERO);
    assert_eq!(values(&f), (0.75, -0.5, 1.0));
}

#[test]
fn test_recalled_values_are_clamped() {
    let f = fixture();
    fs::write(
        f.dir.path().join("loud.preset"),
        "::\n/Position/X f 5.0\n/Size/Scale d 0.0\n::\n",
    )
    .unwrap();

    f.handler.recall_preset("loud").unwrap();
    f.handler.advance(Duration::ZERO);
    assert_eq!(values(&f), (1.0, 0.0, 0.1));
}

#[test]
fn test_missing_preset_leaves_values() {
    let f = fixture();
    f.x.set(0.3);
    let err = f.handler.recall_preset("nothing").unwrap_err();
    assert!(err.is_not_found());
    f.handler.advance(Duration::from_secs(1));
    assert_eq!(f.x.get(), 0.3);
    assert!(!f.handler.is_morphing());
}

#[test]
fn test_malformed_preset() {
    let f = fixture();
    fs::write(f.dir.path().join("broken.preset"), "::\n/Position/X f 0.5\n").unwrap();
    f.x.set(0.3);

    match f.handler.recall_preset("broken") {
        Err(preset::Error::Malformed { .. }) => {}
        other => panic!("unexpected {:?}", other),
    }
    f.handler.advance(Duration::ZERO);
    assert_eq!(f.x.get(), 0.3);
}

#[test]
fn test_failed_store_changes_nothing() {
    let f = fixture();
    f.handler.store_preset_indexed(1, "calm").unwrap();
    let events = f.handler.subscribe();
    fs::remove_dir_all(f.dir.path()).unwrap();

    match f.handler.store_preset_indexed(2, "calm") {
        Err(preset::Error::Write { .. }) => {}
        other => panic!("unexpected {:?}", other),
    }
    assert!(!f.dir.path().join("calm.preset").exists());
    assert_eq!(f.handler.index_for_label("calm"), Some(1));
    assert_eq!(f.handler.label_for_index(1), "calm");
    assert_eq!(f.handler.label_for_index(2), "2");
    assert_eq!(events.try_iter().count(), 0);
}
