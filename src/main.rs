use log::{debug, info};
use macabre::config::Config;
use macabre::disasm;
use macabre::interpreter::{ProcessorState, ScriptInterpreter};
use macabre::script::ScriptStore;
use macabre::world::{NullMixer, NullStage, NullWorld};
use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;
use std::process;

fn usage(program: &str) {
    println!("macabre - scene script interpreter for adventure engine data");
    println!();
    println!("Usage: {} <scripts.blob> [options]", program);
    println!();
    println!("Options:");
    println!("  --dump              list the scripts instead of running them");
    println!("  --script <index>    script to queue first (default 0)");
    println!("  --actor <index>     actor context for the first script (default 0)");
    println!("  --ticks <count>     maximum ticks to run (default 100)");
    println!("  --config <path>     TOML interpreter configuration");
}

fn parse_number(flag: &str, value: Option<&String>) -> i64 {
    match value.and_then(|v| v.parse::<i64>().ok()) {
        Some(n) => n,
        None => {
            eprintln!("Error: {} needs a numeric argument", flag);
            process::exit(2);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
        return Ok(());
    }

    let blob_path = &args[1];
    let mut dump = false;
    let mut first_script: usize = 0;
    let mut first_actor: i32 = 0;
    let mut max_ticks: u32 = 100;
    let mut config = Config::default();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--dump" => dump = true,
            "--script" => {
                first_script = parse_number("--script", args.get(i + 1)) as usize;
                i += 1;
            }
            "--actor" => {
                first_actor = parse_number("--actor", args.get(i + 1)) as i32;
                i += 1;
            }
            "--ticks" => {
                max_ticks = parse_number("--ticks", args.get(i + 1)) as u32;
                i += 1;
            }
            "--config" => {
                let path = match args.get(i + 1) {
                    Some(p) => p,
                    None => {
                        eprintln!("Error: --config needs a path");
                        process::exit(2);
                    }
                };
                config = Config::load(Path::new(path))?;
                i += 1;
            }
            other => {
                eprintln!("Error: unknown option {}", other);
                usage(&args[0]);
                process::exit(2);
            }
        }
        i += 1;
    }

    // Load the script blob with user-friendly error handling
    debug!("loading script blob: {}", blob_path);
    let mut file = match File::open(blob_path) {
        Ok(file) => file,
        Err(e) => {
            match e.kind() {
                std::io::ErrorKind::NotFound => {
                    eprintln!("Error: script blob not found: {}", blob_path);
                    eprintln!();
                    eprintln!("Please check:");
                    eprintln!("• File path is correct");
                    eprintln!("• You're running from the right directory");
                }
                _ => {
                    eprintln!("Error: cannot open script blob '{}': {}", blob_path, e);
                }
            }
            process::exit(1);
        }
    };
    let mut blob = Vec::new();
    if let Err(e) = file.read_to_end(&mut blob) {
        eprintln!("Error: cannot read script blob '{}': {}", blob_path, e);
        process::exit(1);
    }

    let store = ScriptStore::load(&blob)?;
    info!("loaded {} scripts from {}", store.len(), blob_path);

    if dump {
        println!("{}", disasm::dump_store(&store));
        return Ok(());
    }

    let trace_dispatch = config.trace_dispatch;
    let mut interp = ScriptInterpreter::new(
        store,
        Box::new(NullWorld::new()),
        Box::new(NullMixer::new()),
        Box::new(NullStage::new()),
        config,
    );

    interp.queue_script(first_script, first_actor);

    let mut ticks_run = 0;
    for _ in 0..max_ticks {
        ticks_run += 1;
        let exit = interp.tick();
        if exit {
            match interp.take_delayed_scene() {
                Some(scene) => info!("exit after {} ticks: scene change to {}", ticks_run, scene),
                None => info!("exit after {} ticks", ticks_run),
            }
            break;
        }
        if interp.state() == ProcessorState::Idle {
            info!("queue drained after {} ticks", ticks_run);
            break;
        }
    }

    if trace_dispatch {
        interp.stats().log_summary();
    }

    Ok(())
}
