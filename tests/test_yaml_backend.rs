mod common;
use common::*;

use kospel_cmi::backend::YamlBackend;
use kospel_cmi::prelude::*;

#[tokio::test]
async fn write_then_read_back() {
    common_setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    let backend = YamlBackend::new(&path);

    assert!(backend.write_register("0b55", "2000").await);
    assert!(backend.write_register("0b51", "0500").await);

    assert_eq!(backend.read_register("0b55").await.as_deref(), Some("2000"));
    let regs = backend.read_registers("0b50", 8).await;
    assert_eq!(regs.len(), 8);
    assert_eq!(regs.get("0b51").map(String::as_str), Some("0500"));
    assert_eq!(regs.get("0b57").map(String::as_str), Some("0000"));

    // sorted by address, values stay strings
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.find("0b51").unwrap() < content.find("0b55").unwrap());
    let parsed: BTreeMap<String, String> = serde_yaml::from_str(&content).unwrap();
    assert_eq!(parsed.get("0b51").map(String::as_str), Some("0500"));
}

#[tokio::test]
async fn external_edits_are_seen() {
    common_setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    let backend = YamlBackend::new(&path);

    assert!(backend.write_register("0b55", "2000").await);
    std::fs::write(&path, "\"0b55\": \"0800\"\n").unwrap();

    assert_eq!(backend.read_register("0b55").await.as_deref(), Some("0800"));
}

#[tokio::test]
async fn unreadable_file_is_an_empty_register_map() {
    common_setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    std::fs::write(&path, "[not: a mapping").unwrap();
    let backend = YamlBackend::new(&path);

    assert_eq!(backend.read_register("0b55").await.as_deref(), Some("0000"));

    // a write replaces the broken file
    assert!(backend.write_register("0b55", "2000").await);
    assert_eq!(backend.read_register("0b55").await.as_deref(), Some("2000"));
}

#[tokio::test]
async fn instances_do_not_share_state() {
    common_setup();
    let dir = tempfile::tempdir().unwrap();
    let a = YamlBackend::new(dir.path().join("a.yaml"));
    let b = YamlBackend::new(dir.path().join("b.yaml"));

    assert!(a.write_register("0b55", "2000").await);

    assert_eq!(a.read_register("0b55").await.as_deref(), Some("2000"));
    assert_eq!(b.read_register("0b55").await.as_deref(), Some("0000"));
}

#[tokio::test]
async fn range_past_the_address_space_is_truncated() {
    common_setup();
    let dir = tempfile::tempdir().unwrap();
    let backend = YamlBackend::new(dir.path().join("state.yaml"));

    let regs = backend.read_registers("0bfe", 4).await;
    assert_eq!(regs.len(), 2);
    assert!(regs.contains_key("0bff"));

    assert!(backend.read_registers("bogus", 4).await.is_empty());
}

#[tokio::test]
async fn controller_over_yaml_state() {
    common_setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    let registry = standard_registry();

    {
        let backend = YamlBackend::new(&path);
        let mut controller = HeaterController::new(backend, registry.clone());
        controller.refresh().await;
        assert_eq!(controller.heater_mode(), Some(HeaterMode::Off));

        controller.set_heater_mode(HeaterMode::Winter).unwrap();
        controller.set_water_heater_enabled(WaterHeaterEnabled::Enabled).unwrap();
        controller.set_cwu_temperature_comfort(48.5).unwrap();
        assert!(controller.save().await);
        controller.release().await;
    }

    let mut controller = HeaterController::new(YamlBackend::new(&path), registry);
    controller.refresh().await;
    assert_eq!(controller.heater_mode(), Some(HeaterMode::Winter));
    assert_eq!(
        controller.is_water_heater_enabled(),
        Some(WaterHeaterEnabled::Enabled)
    );
    assert_eq!(controller.cwu_temperature_comfort(), Some(48.5));
    assert_eq!(controller.backend().read_register("0b55").await.as_deref(), Some("3000"));
}

#[tokio::test]
async fn flag_bit_on_yaml_state() {
    common_setup();
    let dir = tempfile::tempdir().unwrap();
    let state = YamlBackend::new(dir.path().join("state.yaml"));

    assert!(backend::write_flag_bit(&state, "0b55", 3, true).await);
    assert_eq!(state.read_register("0b55").await.as_deref(), Some("0800"));
}
