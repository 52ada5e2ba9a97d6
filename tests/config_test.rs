use avatar_stage::config::{build_runtime, RuntimeFlavor, StageSettings};
use avatar_stage::world::{Gesture, ManifestFile};

#[tokio::test]
async fn test_default_settings() {
    let settings = StageSettings::default();

    assert_eq!(settings.frame.target_fps, 60.0);
    assert_eq!(settings.materials.flat_shininess, 0.0);
    assert_eq!(settings.materials.flat_specular, 0.0);
    assert!(settings.assets.base_url.is_none());
    assert_eq!(settings.logging.level, "info");
    assert_eq!(settings.runtime.flavor, RuntimeFlavor::MultiThread);
}

#[tokio::test]
async fn test_settings_serialization() {
    let mut settings = StageSettings::default();
    settings.assets.base_url = Some("https://cdn.example.com/stage/".to_string());
    settings.frame.target_fps = 30.0;
    settings.materials.flat_specular = 0.25;

    let toml_str = toml::to_string_pretty(&settings).unwrap();
    let parsed: StageSettings = toml::from_str(&toml_str).unwrap();
    assert_eq!(parsed, settings);
}

#[tokio::test]
async fn test_partial_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stage.toml");
    std::fs::write(
        &path,
        r#"
        [frame]
        target_fps = 24.0

        [runtime]
        flavor = "current_thread"
        "#,
    )
    .unwrap();

    let settings = StageSettings::from_file(&path).unwrap();
    assert_eq!(settings.frame.target_fps, 24.0);
    assert_eq!(settings.frame.viewport_width, 1280);
    assert_eq!(settings.runtime.flavor, RuntimeFlavor::CurrentThread);
    assert_eq!(settings.assets.base_dir, std::path::PathBuf::from("static"));
}

#[tokio::test]
async fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("stage.toml");

    let mut settings = StageSettings::default();
    settings.logging.file = Some(dir.path().join("stage.log"));
    settings.save_to(&path).unwrap();

    assert_eq!(StageSettings::from_file(&path).unwrap(), settings);
}

#[tokio::test]
async fn test_invalid_settings_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stage.toml");
    std::fs::write(&path, "[frame]\ntarget_fps = \"fast\"\n").unwrap();

    let err = StageSettings::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("invalid settings"));
}

#[tokio::test]
async fn test_manifest_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("avatar.toml");
    std::fs::write(
        &path,
        r#"
        [avatar]
        name = "sam"
        base = "models/female/body.glb"
        hair = ""

        [gestures]
        dance1 = "clips/dance-one.glb"
        "#,
    )
    .unwrap();

    let manifest = ManifestFile::from_file(&path).unwrap();
    assert_eq!(manifest.avatar.name, "sam");
    assert_eq!(manifest.avatar.part_count(), 2);
    assert_eq!(manifest.gestures.path(Gesture::Dance1), "clips/dance-one.glb");
    assert_eq!(manifest.gestures.path(Gesture::Yelling), "animations/yelling.glb");
}

#[test]
fn test_runtime_from_settings() {
    let mut settings = StageSettings::default();
    settings.runtime.flavor = RuntimeFlavor::CurrentThread;

    let runtime = build_runtime(&settings.runtime).unwrap();
    let answer = runtime.block_on(async { tokio::task::spawn(async { 7 * 6 }).await.unwrap() });
    assert_eq!(answer, 42);
}
