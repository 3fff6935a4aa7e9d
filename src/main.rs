use anyhow::{Context, Result};
use qr_attend::api::client::HttpGateway;
use qr_attend::console::app::{Console, Step};
use qr_attend::console::commands::parse;
use qr_attend::core::config::Config;
use qr_attend::core::startup::warm_caches;
use qr_attend::core::state::AppState;
use qr_attend::core::tracing_init::init_tracing;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("config.toml")
    };

    let config = Config::from_file(&config_path).context(format!(
        "Failed to load configuration from '{}'. \
        If this is your first run, copy config.example.toml to config.toml and adjust the values.",
        config_path.display()
    ))?;

    init_tracing(&config.logging)?;

    // One user, one console; no need for a worker pool
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config, config_path))
}

async fn async_main(config: Config, config_path: PathBuf) -> Result<()> {
    info!(
        config_path = %config_path.display(),
        endpoint = %config.gateway.endpoint,
        signed_in = config.gateway.identity_token.is_some(),
        log_level = %config.logging.level,
        log_format = %config.logging.format,
        "QR Attend starting"
    );

    let gateway = HttpGateway::new(
        config.gateway.endpoint.clone(),
        config.gateway.identity_token.clone(),
        config.gateway.request_timeout_ms,
    )
    .context("Failed to create gateway client")?;

    let state = AppState::new(config, Arc::new(gateway));

    if state.is_authenticated() {
        if let Err(e) = warm_caches(&state).await {
            warn!(error = %e, "Failed to warm caches, pages will load on demand");
        }
    }

    let mut console = Console::new(state);
    let mut stdout = tokio::io::stdout();

    let boot = console.boot().await;
    print_lines(&mut stdout, &boot).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C signal");
                None
            }
        };

        let Some(line) = line else {
            break;
        };

        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                print_lines(&mut stdout, &[e.to_string()]).await?;
                continue;
            }
        };

        match console.execute(command).await {
            Step::Continue(output) => print_lines(&mut stdout, &output).await?,
            Step::Quit => break,
        }
    }

    info!(route = console.route().path(), "Shutting down");
    Ok(())
}

async fn print_lines(stdout: &mut tokio::io::Stdout, lines: &[String]) -> Result<()> {
    for line in lines {
        if let Err(e) = stdout.write_all(format!("{}\n", line).as_bytes()).await {
            error!(error = %e, "Failed to write to stdout");
            return Err(e.into());
        }
    }
    stdout.flush().await?;
    Ok(())
}
