use clap::Parser;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dmr_config::{SharedConfig, toml_config};
use dmr_core::{STACK_VERSION, debug};
use dmr_entities::{DmrControl, DmrNetwork, IdLookup, ModemEvent, TableLookup, UdpModem};

/// Engine tick, a little under half a burst
const POLL_INTERVAL: Duration = Duration::from_millis(5);
const STATUS_INTERVAL: Duration = Duration::from_millis(250);

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            println!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

fn load_lookup(cfg: &SharedConfig) -> Arc<dyn IdLookup> {
    match cfg.config().id_lookup.as_deref() {
        Some(path) => match TableLookup::from_file(path) {
            Ok(table) => Arc::new(table),
            Err(e) => {
                tracing::warn!("could not read id table {}: {}, ids will not be resolved", path, e);
                Arc::new(TableLookup::default())
            }
        },
        None => Arc::new(TableLookup::default()),
    }
}

fn open_modem(cfg: &SharedConfig) -> UdpModem {
    let Some(modem_cfg) = cfg.config().modem.clone() else {
        eprintln!("No [modem] section in the configuration");
        std::process::exit(1);
    };
    let mut modem = match UdpModem::new(cfg.clone(), &modem_cfg) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to open modem link: {}", e);
            std::process::exit(1);
        }
    };
    match modem.open() {
        Ok(ModemEvent::Version { protocol, description }) => {
            eprintln!(" -> modem protocol {}: {}", protocol, description);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("Modem at {} did not answer: {}", modem_cfg.modem_address, e);
            std::process::exit(1);
        }
    }
    modem
}

fn open_network(cfg: &SharedConfig) -> Option<DmrNetwork> {
    let net_cfg = cfg.config().network.clone()?;
    match DmrNetwork::new(cfg.clone(), net_cfg) {
        Ok(n) => {
            eprintln!(" -> network gateway enabled");
            Some(n)
        }
        Err(e) => {
            eprintln!("Failed to start network link: {}", e);
            std::process::exit(1);
        }
    }
}

/// Moves bursts and packets between modem, network and both slots until `running` drops
fn run(control: &mut DmrControl, modem: &mut UdpModem, mut network: Option<DmrNetwork>, running: Arc<AtomicBool>) {
    if let Err(e) = modem.poll_status() {
        tracing::warn!("modem status poll failed: {}", e);
    }
    let mut last_tick = Instant::now();
    let mut last_status = Instant::now();

    while running.load(Ordering::SeqCst) {
        // Modem to slots
        match modem.read() {
            Ok(events) => {
                for event in events {
                    if let ModemEvent::Burst { slot_no, burst } = event {
                        control.write_modem(slot_no, &burst);
                    }
                }
            }
            Err(e) => tracing::warn!("modem read failed: {}", e),
        }

        // Network to slots, slots to network
        if let Some(net) = network.as_mut() {
            while let Some(data) = net.read() {
                control.write_network(&data);
            }
            while let Some(frame) = control.read_network() {
                net.write(frame);
            }
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last_tick).as_millis() as u32;
        if elapsed > 0 {
            control.clock(elapsed);
            last_tick = now;
        }

        if let Some(lc) = control.short_lc() {
            if let Err(e) = modem.write_short_lc(&lc) {
                tracing::warn!("short LC write failed: {}", e);
            }
        }

        // Slots to modem, as far as the modem buffers allow
        for slot_no in [1, 2] {
            while modem.has_space(slot_no) {
                let Some(burst) = control.read_modem(slot_no) else { break };
                if let Err(e) = modem.write_burst(slot_no, &burst) {
                    tracing::warn!("modem write failed on slot {}: {}", slot_no, e);
                    break;
                }
            }
        }

        if now.duration_since(last_status) >= STATUS_INTERVAL {
            if let Err(e) = modem.poll_status() {
                tracing::warn!("modem status poll failed: {}", e);
            }
            last_status = now;
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    tracing::info!("shutting down");
    for slot_no in [1, 2] {
        let _ = modem.write_abort(slot_no);
    }
    // DmrNetwork::drop stops the worker
    network.take();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "MMDVM DMR host",
    long_about = "Runs the DMR repeater engine between an MMDVM modem and a network gateway, using the provided TOML configuration file"
)]
struct Args {
    /// Config file (required)
    #[arg(help = "TOML config with DMR, modem and network parameters")]
    config: String,
}

fn main() {
    eprintln!("[+] MMDVM DMR host {}", STACK_VERSION);

    let args = Args::parse();
    let cfg = load_config_from_toml(&args.config);
    let _log_guard = debug::setup_logging_default(cfg.config().debug_log.clone());

    let lookup = load_lookup(&cfg);
    let mut modem = open_modem(&cfg);
    let network = open_network(&cfg);
    let mut control = DmrControl::new(cfg.clone(), lookup);

    if cfg.config().dmr.duplex {
        if let Err(e) = modem.write_start(true) {
            tracing::warn!("could not start modem transmitter: {}", e);
        }
    }

    // Set up Ctrl+C handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("failed to set Ctrl+C handler");

    run(&mut control, &mut modem, network, running);

    if cfg.config().dmr.duplex {
        let _ = modem.write_start(false);
    }
    // modem drops here and clears the connected flag
}
