use anyhow::Context;
use clap::{value_parser, Arg, Command};
use mural_core::GridConfig;
use mural_payment::MockProcessor;
use mural_service::{
    CanvasService, Collaborators, Identity, JsonFilePersistence, ServiceConfig, SnapshotPersistence,
    StaticIdentities, SubmitRequest,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Command::new("mural-service")
        .version(mural_service::VERSION)
        .about("Collaborative canvas mutation and synchronization service")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Run the canvas service")
                .arg(
                    Arg::new("width")
                        .long("width")
                        .default_value("320")
                        .value_parser(value_parser!(u32))
                        .help("Grid width in cells"),
                )
                .arg(
                    Arg::new("height")
                        .long("height")
                        .default_value("320")
                        .value_parser(value_parser!(u32))
                        .help("Grid height in cells"),
                )
                .arg(
                    Arg::new("cooldown-ms")
                        .long("cooldown-ms")
                        .default_value("900000")
                        .value_parser(value_parser!(i64))
                        .help("Free-mutation cooldown in milliseconds"),
                )
                .arg(
                    Arg::new("board")
                        .long("board")
                        .default_value("board.json")
                        .help("Board snapshot file"),
                )
                .arg(
                    Arg::new("participants")
                        .long("participants")
                        .default_value("participants.json")
                        .help("Participant snapshot file"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run a scripted local session against an in-memory canvas")
                .arg(
                    Arg::new("paints")
                        .long("paints")
                        .default_value("16")
                        .value_parser(value_parser!(u32))
                        .help("Number of free placements to attempt"),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("Print the persisted board snapshot as JSON")
                .arg(
                    Arg::new("board")
                        .long("board")
                        .default_value("board.json")
                        .help("Board snapshot file"),
                )
                .arg(
                    Arg::new("participants")
                        .long("participants")
                        .default_value("participants.json")
                        .help("Participant snapshot file"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("serve", matches)) => {
            let width = *matches.get_one::<u32>("width").expect("has default");
            let height = *matches.get_one::<u32>("height").expect("has default");
            let cooldown_ms = *matches.get_one::<i64>("cooldown-ms").expect("has default");
            let board = matches.get_one::<String>("board").expect("has default");
            let participants = matches
                .get_one::<String>("participants")
                .expect("has default");

            let processor = Arc::new(MockProcessor::new());
            let service = CanvasService::start(
                ServiceConfig::new().with_grid(
                    GridConfig::new()
                        .with_dimensions(width, height)
                        .with_cooldown_ms(cooldown_ms),
                ),
                Collaborators {
                    identity: Arc::new(StaticIdentities::new()),
                    processor_key: processor.verifying_key(),
                    processor,
                    persistence: Arc::new(JsonFilePersistence::new(board, participants)),
                },
            );
            tracing::info!(
                width,
                height,
                cells = service.cell_count(),
                "canvas service running; ctrl-c to stop"
            );

            tokio::signal::ctrl_c()
                .await
                .context("waiting for shutdown signal")?;
            tracing::info!("shutting down");
        }
        Some(("simulate", matches)) => {
            let paints = *matches.get_one::<u32>("paints").expect("has default");

            let processor = Arc::new(MockProcessor::new());
            let identities = StaticIdentities::new().with(Identity::new("simulant", "Simulant"));
            let service = CanvasService::start(
                ServiceConfig::new().with_grid(
                    GridConfig::new()
                        .with_dimensions(64, 64)
                        .with_cooldown_ms(0),
                ),
                Collaborators {
                    identity: Arc::new(identities),
                    processor_key: processor.verifying_key(),
                    processor,
                    persistence: Arc::new(mural_service::NullPersistence),
                },
            );

            let mut committed = 0u32;
            for i in 0..paints {
                let x = i % 64;
                let y = i / 64;
                let color = format!("#{:06x}", i.wrapping_mul(97) % 0x00ff_ffff);
                match service
                    .submit(SubmitRequest::free("simulant".into(), x, y, color))
                    .await
                {
                    Ok(_) => committed += 1,
                    Err(err) => tracing::warn!(%err, "placement rejected"),
                }
            }
            println!(
                "simulated {paints} placements: {committed} committed, {} cells painted",
                service.cell_count()
            );
        }
        Some(("export", matches)) => {
            let board = matches.get_one::<String>("board").expect("has default");
            let participants = matches
                .get_one::<String>("participants")
                .expect("has default");

            let store = JsonFilePersistence::new(board, participants);
            let state = store.load().context("loading persisted state")?;
            println!("{}", serde_json::to_string_pretty(&state.cells)?);
        }
        _ => unreachable!("arg_required_else_help"),
    }

    Ok(())
}
