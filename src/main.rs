use clap::Parser;
use std::process::ExitCode;
use synthcast::plugin::{list_components, system_registry, MUSIC_DEVICE};
use synthcast::{logging, Action, Cli, Config, Engine, Error};

fn main() -> ExitCode {
    let config = match Config::from_cli(Cli::parse()) {
        Ok(config) => config,
        Err(e) => return fail(&e.into()),
    };
    logging::init(config.verbose);

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn fail(err: &Error) -> ExitCode {
    eprintln!("{}", err.report());
    ExitCode::FAILURE
}

fn run(config: Config) -> synthcast::Result<()> {
    if config.action == Action::List {
        list_instruments();
        return Ok(());
    }

    let engine = Engine::builder().config(&config).build()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let stats = runtime.block_on(engine.run_until(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Could not listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }))?;

    tracing::info!(
        "Rendered {} blocks ({} dropped, {} failed)",
        stats.sent + stats.dropped,
        stats.dropped,
        stats.failed
    );
    Ok(())
}

fn list_instruments() {
    let registry = system_registry();
    let instruments = list_components(registry.as_ref(), MUSIC_DEVICE);
    if instruments.is_empty() {
        println!("No music devices found");
        return;
    }
    println!("Available music devices:");
    for summary in instruments {
        println!(
            "  sub={}, mfr={}, name={}",
            summary.description.subtype,
            summary.description.manufacturer,
            summary.name.as_deref().unwrap_or("<unnamed>")
        );
    }
}
