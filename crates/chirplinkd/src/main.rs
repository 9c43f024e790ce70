//! chirplinkd — acoustic link transport session daemon.

mod audio;
mod cli;
mod modem;
mod pipeline;
mod session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use chirplink_core::config::Config;
use cli::Args;
use modem::LoopbackModem;
use pipeline::EchoPipeline;
use session::Session;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.list {
        for device in audio::list_devices().context("listing audio devices")? {
            println!(
                "[{}] {} ({})",
                device.index,
                device.name,
                if device.is_input { "input" } else { "output" }
            );
        }
        return Ok(());
    }

    let config = Config::load().context("loading configuration")?;
    tracing::info!(
        volume = args.volume,
        protocol = args.protocol,
        "chirplinkd starting"
    );

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let io = audio::AudioIo::open(args.input_device, args.output_device)
        .context("opening audio devices")?;

    // The real acoustic modem is an external collaborator not implemented
    // in this repository; `LoopbackModem` stands in until one is wired up.
    let modem = LoopbackModem::new();
    let mut session = Session::new(
        modem,
        EchoPipeline,
        config.transport,
        args.protocol as u8,
        args.volume,
    );

    session.run(
        || io.samples_in.recv().unwrap_or_default(),
        |block| {
            let _ = io.samples_out.try_send(block);
        },
        || running.load(Ordering::SeqCst),
    );

    tracing::info!("chirplinkd shutting down");
    Ok(())
}

/// Installs a `Ctrl-C` handler that flips `on_interrupt` once. Mirrors the
/// signal-flag pattern used elsewhere for cooperative shutdown.
fn ctrlc_handler(on_interrupt: impl Fn() + Send + 'static) -> Result<()> {
    ctrlc::set_handler(on_interrupt).context("installing SIGINT handler")
}
