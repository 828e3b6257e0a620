use std::path::PathBuf;

use anyhow::Result;
use log::{error, info};
use ringout_bridge_lib::commands::{self, CommandOutcome, HELP_TEXT, OperatorCommand};
use ringout_bridge_lib::config::{AppConfig, CONFIG_FILE_NAME};
use ringout_bridge_lib::logging;
use ringout_bridge_lib::state::AppState;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    let config = AppConfig::load_config(&config_path).await?;
    logging::init(config.log_level());
    info!("Using config {:?}", config_path);

    let app_state = AppState::new(&config).await;
    let manager = app_state.manager_handle();

    let mut status_rx = manager.subscribe();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            info!(
                "Status: {} (connected: {}, alert: {})",
                status.status_text, status.connected, status.alert_active
            );
        }
    });

    info!("{}", HELP_TEXT);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let outcome = line
                    .parse::<OperatorCommand>()
                    .and_then(|command| commands::execute(command, &manager));
                match outcome {
                    Ok(CommandOutcome::Continue(message)) => println!("{}", message),
                    Ok(CommandOutcome::Quit) => break,
                    Err(e) => error!("{}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    app_state.shutdown().await
}
