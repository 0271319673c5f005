//! fuelbot server and console transport.
//!
//! `fuelbot` serves the HTTP API. `fuelbot --console` reads messages from
//! stdin as user `console`; lines starting with `!` are sent as button
//! presses (`!toggle:diesel`).

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use fuelbot::adapters::http::app;
use fuelbot::adapters::SystemClock;
use fuelbot::bootstrap::{run_maintenance, Backends, Services};
use fuelbot::config::AppConfig;
use fuelbot::domain::foundation::UserKey;
use fuelbot::domain::messaging::{InboundMessage, TurnReply};
use fuelbot::ports::Clock;
use fuelbot::telemetry;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let console = std::env::args().skip(1).any(|arg| arg == "--console");

    let config = AppConfig::load()?;
    telemetry::init(&config.server);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backends = Backends::connect(&config, clock.clone()).await?;
    let services = Services::assemble(&config, &backends, clock)?;

    tokio::spawn(run_maintenance(
        services.clone(),
        backends.clone(),
        MAINTENANCE_INTERVAL,
    ));

    if console {
        return run_console(services).await;
    }

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "fuelbot listening");

    axum::serve(listener, app(services.app_state(), config.server.request_timeout()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("fuelbot stopped");
    Ok(())
}

async fn run_console(services: Services) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let user = UserKey::new("console")?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout.write_all(b"fuelbot console. Try /help, or !payload to press a button.\n").await?;
    while let Some(line) = lines.next_line().await? {
        let message = match line.strip_prefix('!') {
            Some(payload) => InboundMessage::callback(user.clone(), payload),
            None => InboundMessage::text(user.clone(), line),
        };
        let reply = services.router.route(message).await;
        stdout.write_all(render(&reply).as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

fn render(reply: &TurnReply) -> String {
    let mut out = String::new();
    for message in &reply.messages {
        out.push_str(&message.text);
        out.push('\n');
        if let Some(keyboard) = &message.keyboard {
            for row in &keyboard.rows {
                let buttons: Vec<String> = row
                    .iter()
                    .map(|b| format!("[{} -> !{}]", b.label, b.payload))
                    .collect();
                out.push_str(&buttons.join(" "));
                out.push('\n');
            }
        }
    }
    out.push_str(&format!("({})\n", reply.outcome.as_str()));
    out
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
