#![warn(clippy::pedantic)]
#![warn(clippy::all)]

use std::env;
use std::fs::read_to_string;
use std::path::Path;

use chrono::Local;

use roughlock::configs;
use roughlock::replay;
use roughlock::session::Session;
use roughlock::sim::SimRig;
use roughlock::util::find_file;

fn main() {
    env_logger::init();

    // `roughlock replay <dump.json>` renders a previous session log instead
    // of touching any hardware
    let args: Vec<String> = env::args().collect();

    let cfg_path = find_file(Path::new("config.toml")).expect("Failed to find config file!");
    println!("[{}] Reading config file {}", Local::now(), cfg_path.display());
    let cfg_text = read_to_string(&cfg_path).expect("Failed to open config file!");
    let cfg = toml::from_str(&cfg_text).expect("Failed to parse config file");

    let rough_lock_cfg = configs::rough_lock_from_config(&cfg)
        .expect("Failed to construct rough lock settings from config file");
    let session_params = configs::session_from_config(&cfg)
        .expect("Failed to construct session parameters from config file");

    if args.get(1).map(String::as_str) == Some("replay") {
        let dump_path = args.get(2).expect("Usage: roughlock replay <dump.json>");
        let dump = replay::load(Path::new(dump_path)).expect("Failed to load session dump");
        replay::replay(&dump, session_params.target_frequencies);
        return;
    }

    let rig = SimRig::new(configs::sim_from_config(&cfg));
    let targets = session_params.target_frequencies;
    println!(
        "[{}] Searching for modes covering {:.3e} and {:.3e} Hz",
        Local::now(),
        targets.0,
        targets.1
    );

    let mut session = Session::new(rig, rough_lock_cfg, session_params);
    match session.run() {
        Ok(outcome) => {
            println!(
                "[{}] Locked. {} temperature ramp changes, {} wiggle steps",
                Local::now(),
                outcome.temp_changes,
                outcome.wiggle_count
            );
        }
        Err(e) => {
            eprintln!("[{}] Lock search failed: {e}", Local::now());
            std::process::exit(1);
        }
    }
}
