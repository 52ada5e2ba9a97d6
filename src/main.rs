use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use avatar_stage::config::{
    build_runtime, load_stage_settings, save_stage_settings, stage_config_path, StageSettings,
};
use avatar_stage::rendering::HeadlessHost;
use avatar_stage::ui::{StageCommand, HELP};
use avatar_stage::utils::logging::{init_logging, log_system_info};
use avatar_stage::world::ManifestFile;
use avatar_stage::{CommandOutcome, Session, VERSION};

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);

    let settings = match args.next() {
        Some(path) => StageSettings::from_file(path)?,
        None => load_stage_settings().unwrap_or_else(default_settings),
    };
    let manifest = match args.next() {
        Some(path) => ManifestFile::from_file(path)?,
        None => ManifestFile::default(),
    };

    init_logging(&settings.logging)?;
    info!("avatar-stage {}", VERSION);
    log_system_info();

    let runtime = build_runtime(&settings.runtime)?;
    runtime.block_on(run(settings, manifest))
}

/// Defaults, written out on first run so there is a file to edit.
fn default_settings() -> StageSettings {
    let settings = StageSettings::default();
    if stage_config_path().is_some_and(|path| !path.exists()) {
        if let Err(e) = save_stage_settings(&settings) {
            eprintln!("could not write default settings: {}", e);
        }
    }
    settings
}

async fn run(settings: StageSettings, manifest: ManifestFile) -> anyhow::Result<()> {
    let host = HeadlessHost::new(settings.frame.viewport_width, settings.frame.viewport_height);
    let mut session = Session::init(&settings, manifest.gestures, Box::new(host))?;
    session.start();

    let avatar = match session.composer().build(&manifest.avatar).await {
        Ok(avatar) => avatar,
        Err(e) => {
            session.teardown().await;
            return Err(e.into());
        }
    };
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<StageCommand>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                println!("{}\n{}", e, HELP);
                continue;
            }
        };

        match session.execute(&avatar, command).await {
            Ok(CommandOutcome::Done(message)) => println!("{}", message),
            Ok(CommandOutcome::Quit) => break,
            Err(e) => {
                error!("Command failed: {:#}", e);
                println!("error: {:#}", e);
            }
        }
    }

    session.teardown().await;
    Ok(())
}
