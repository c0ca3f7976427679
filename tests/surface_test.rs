use paramorph::{
    config::{ControlSurfaceConfig, ParameterConfig, ServerConfig},
    surface::{self, ControlSurface},
};
use pretty_assertions::assert_eq;
use std::{fs, time::Duration};
use tempdir::TempDir;

fn parameter(name: &str, group: &str, default: f32, min: f32, max: f32) -> ParameterConfig {
    ParameterConfig {
        name: name.into(),
        group: group.into(),
        prefix: "".into(),
        default,
        min,
        max,
    }
}

fn server(address: Option<&str>) -> Option<ServerConfig> {
    Some(ServerConfig {
        bind: "127.0.0.1:0".into(),
        address: address.map(str::to_owned),
        listeners: Vec::new(),
    })
}

#[test]
fn test_from_config_file() {
    let dir = TempDir::new("surface").unwrap();
    let config = ControlSurfaceConfig {
        morph_time: 1.0,
        parameters: vec![
            parameter("X", "Position", 0.0, -1.0, 1.0),
            parameter("Y", "Position", 0.0, -1.0, 1.0),
            parameter("Scale", "Size", 1.0, 0.1, 3.0),
        ],
        parameter_server: server(None),
        preset_server: server(Some("/scene")),
        sequence_server: server(None),
        ..ControlSurfaceConfig::new(dir.path().join("presets"))
    };
    let config_path = dir.path().join("surface.json");
    fs::write(&config_path, config.to_json().unwrap()).unwrap();

    let config = ControlSurfaceConfig::from_path(&config_path).unwrap();
    let surface = ControlSurface::from_config(&config).unwrap();

    assert!(dir.path().join("presets").is_dir());
    assert_eq!(
        surface.parameters().addresses(),
        vec!["/Position/X", "/Position/Y", "/Size/Scale"]
    );
    assert_eq!(surface.handler().morph_time(), Duration::from_secs(1));
    assert_eq!(
        surface.parameter_server().unwrap().addresses(),
        vec!["/Position/X", "/Position/Y", "/Size/Scale"]
    );
    assert_eq!(surface.preset_server().unwrap().address(), "/scene");
    assert_eq!(surface.sequence_server().unwrap().address(), "/sequence");

    let description = surface.to_string();
    assert!(description.contains("Parameter server listening on: 127.0.0.1:"));
    assert!(description.contains("Communicating on path: /scene"));

    let x = surface.parameter("/Position/X").unwrap();
    let scale = surface.parameter("/Size/Scale").unwrap();
    x.set(0.5);
    scale.set(2.0);
    surface.handler().store_preset("A").unwrap();
    x.set(-0.5);
    scale.set(1.0);
    fs::write(dir.path().join("presets").join("s.sequence"), "A:1:1\n::\n").unwrap();

    surface.sequencer().play_sequence("s").unwrap();
    surface.advance(Duration::from_millis(500));
    assert_eq!((x.get(), scale.get()), (0.0, 1.5));
    surface.advance(Duration::from_millis(1500));
    assert_eq!((x.get(), scale.get()), (0.5, 2.0));
    assert!(!surface.sequencer().is_playing());
}

#[test]
fn test_duplicate_parameters() {
    let dir = TempDir::new("surface").unwrap();
    let config = ControlSurfaceConfig {
        parameters: vec![
            parameter("X", "Position", 0.0, -1.0, 1.0),
            parameter("X", "Position", 0.5, 0.0, 1.0),
        ],
        ..ControlSurfaceConfig::new(dir.path())
    };
    assert!(matches!(
        ControlSurface::from_config(&config),
        Err(surface::Error::Registry(_))
    ));
}

#[test]
fn test_invalid_config() {
    let dir = TempDir::new("surface").unwrap();
    let config = ControlSurfaceConfig {
        parameters: vec![parameter("X", "Position", 0.0, 1.0, -1.0)],
        ..ControlSurfaceConfig::new(dir.path())
    };
    assert!(matches!(
        ControlSurface::from_config(&config),
        Err(surface::Error::Config(_))
    ));

    assert!(ControlSurfaceConfig::from_path(dir.path().join("missing.json")).is_err());
}
