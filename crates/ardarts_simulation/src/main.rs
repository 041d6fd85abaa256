//! Headless демо-сессия ARDarts
//!
//! Usage: ardarts_simulation [config.toml] [ticks]

use std::process::ExitCode;

use ardarts_simulation::demo::run_demo_session;
use ardarts_simulation::GameConfig;

const DEFAULT_TICKS: usize = 600;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);

    let config = match args.next() {
        Some(path) => match GameConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                return ExitCode::FAILURE;
            }
        },
        None => GameConfig::default(),
    };

    let ticks = match args.next().map(|raw| raw.parse::<usize>()) {
        Some(Ok(ticks)) => ticks,
        Some(Err(err)) => {
            eprintln!("ERROR: invalid tick count: {}", err);
            return ExitCode::FAILURE;
        }
        None => DEFAULT_TICKS,
    };

    println!(
        "Starting ARDarts headless session (seed: {}, ticks: {})",
        config.simulation.seed, ticks
    );

    let report = run_demo_session(config, ticks);

    println!("Target found at tick: {:?} (center {:?})", report.found_tick, report.center_pos);
    println!("Dart launched at tick: {:?}", report.launch_tick);
    println!(
        "Dart hit at tick: {:?} (tip {:?}, eulers {:?})",
        report.hit_tick, report.tip_at_hit, report.eulers_at_hit
    );
    println!("Dart despawned at tick: {:?}", report.despawn_tick);
    println!("Max attachment drift: {:.6} m", report.max_offset_drift);
    println!("Target hits: {}", report.target_hits);
    println!("Session complete!");

    ExitCode::SUCCESS
}
