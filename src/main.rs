use color_eyre::{eyre::eyre, Result};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;
use wheelbridge::controller::event_collector::open_wheel;
use wheelbridge::output::log_injector::{LogKeyInjector, LogMouseInjector, LogPadDriver};
use wheelbridge::output::{AlwaysFocused, OutputSink, VirtualPadSink, SELF_TEST_PAUSE};
use wheelbridge::{ConfigStore, EngineHandle, EngineIo};

// Log one snapshot per second at 60 Hz
const SNAPSHOT_LOG_EVERY: u64 = 60;

const SELF_TEST_FLAG: &str = "--self-test";

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == SELF_TEST_FLAG) {
        return tokio::task::spawn_blocking(run_pad_self_test)
            .await
            .map_err(|e| eyre!("Self test task failed: {}", e))?;
    }

    let store = match args.iter().find(|arg| !arg.starts_with("--")) {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::at_default_location(),
    };
    info!("Using config file {}", store.path().display());
    let config = store.load_or_default().await;

    let tokens = config.device_name_tokens.clone();
    let io = EngineIo {
        device: Box::new(move || open_wheel(tokens)),
        keys: Box::new(LogKeyInjector),
        mouse: Box::new(LogMouseInjector),
        pad: Some(Box::new(LogPadDriver::default())),
        focus: Box::new(AlwaysFocused),
    };

    // Opening the wheel blocks, keep it off the runtime threads
    let mut engine = tokio::task::spawn_blocking(move || EngineHandle::start(config, io))
        .await
        .map_err(|e| eyre!("Engine startup task failed: {}", e))?
        .map_err(|e| eyre!("Failed to start engine: {}", e))?;

    let mut snapshots = engine.subscribe();
    let display = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if snapshot.tick % SNAPSHOT_LOG_EVERY == 0 {
                debug!(
                    "Tick {}: steering {:.3} -> {:.3}, throttle {:.2}, brake {:.2}, keys {:?}, mode {}",
                    snapshot.tick,
                    snapshot.raw_steering,
                    snapshot.conditioned_steering,
                    snapshot.pedals.throttle,
                    snapshot.pedals.brake,
                    snapshot.active_keys,
                    snapshot.mode
                );
            }
        }
    });

    info!("Bridge running, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for Ctrl+C: {}", e))?;

    display.abort();
    tokio::task::spawn_blocking(move || engine.stop())
        .await
        .map_err(|e| eyre!("Engine shutdown task failed: {}", e))?
        .map_err(|e| eyre!("Failed to stop engine: {}", e))?;

    info!("Bye");
    Ok(())
}

// Sweeps a throwaway virtual pad and leaves it neutral
fn run_pad_self_test() -> Result<()> {
    let mut pad = VirtualPadSink::new(Box::new(LogPadDriver::default()));
    pad.self_test(SELF_TEST_PAUSE)
        .map_err(|e| eyre!("Virtual controller test failed: {}", e))?;
    pad.release_all()
        .map_err(|e| eyre!("Failed to reset virtual controller: {}", e))?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
