mod script;

use ringfiles::logging::{self, debug, error, info};
use ringfiles::{Config, FileIndexRange, FileRegistry, FileUpdate, RegistryResult};
use script::{parse_script, Command, DemoFile, UpdateEntry};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
struct Args {
    script: PathBuf,
    config: Option<PathBuf>,
    json: bool,
}

impl Args {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let prog = args.first().map(String::as_str).unwrap_or("ringfiles");

        let mut script = None;
        let mut config = None;
        let mut json = false;

        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(Self::usage(prog)),
                "--json" => json = true,
                "--config" | "-c" => {
                    let path = iter.next().ok_or_else(|| "--config needs a path".to_string())?;
                    config = Some(PathBuf::from(path));
                }
                path if !path.starts_with('-') && script.is_none() => {
                    script = Some(PathBuf::from(path));
                }
                opt => return Err(format!("Unknown argument: {}\n\n{}", opt, Self::usage(prog))),
            }
        }

        let script = script.ok_or_else(|| Self::usage(prog))?;
        Ok(Self { script, config, json })
    }

    fn usage(prog: &str) -> String {
        format!(
            "ringfiles - replay fixed file table operations\n\n\
            USAGE:\n    {} [OPTIONS] <script>\n\n\
            OPTIONS:\n    \
            -h, --help           Print help information\n    \
            -c, --config <file>  Load settings from a TOML file\n    \
            --json               Print stats as JSON\n",
            prog
        )
    }
}

fn main() {
    let args = match Args::from_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => Config::load(path),
        None => std::env::current_dir()
            .map_err(|e| e.to_string())
            .and_then(|dir| Config::find_and_load(&dir)),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let _guard = logging::init_logging(config.log_config().with_env());
    info!(script = %args.script.display(), "ringfiles starting");

    let source = match fs::read_to_string(&args.script) {
        Ok(source) => source,
        Err(e) => {
            error!(error = %e, "Failed to read script");
            eprintln!("Error reading {}: {}", args.script.display(), e);
            std::process::exit(2);
        }
    };
    let commands = match parse_script(&source) {
        Ok(commands) => commands,
        Err(e) => {
            eprintln!("Parse error in {}: {}", args.script.display(), e);
            std::process::exit(2);
        }
    };

    let registry = match FileRegistry::<DemoFile>::from_config(config.table.clone()) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Cannot prepare table: {}", e);
            std::process::exit(2);
        }
    };

    let mut failures = 0;
    for (line, command) in commands {
        debug!(line, command = ?command, "Executing");
        match execute(&registry, command, args.json) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                failures += 1;
                println!("line {}: error: {}", line, e);
            }
        }
    }

    if failures > 0 {
        error!(failures, "Script finished with errors");
        std::process::exit(1);
    }
    info!("Script finished");
}

fn execute(registry: &FileRegistry<DemoFile>, command: Command, json: bool) -> RegistryResult<String> {
    let output = match command {
        Command::Register(nr) => {
            registry.register_sparse(nr)?;
            format!("registered {} slots", nr)
        }
        Command::Install { slot, file } => {
            let name = file.name.clone();
            let index = registry.install(Arc::new(file), slot)?;
            format!("installed {} at slot {}", name, index)
        }
        Command::Remove(index) => {
            let file = registry.remove(index)?;
            format!("removed {} from slot {}", file.name, index)
        }
        Command::Get(index) => registry.with_file(index, |file, flags| {
            format!("slot {}: {} {:?}", index, file.name, flags)
        })?,
        Command::Range { offset, len } => {
            registry.register_alloc_range(FileIndexRange { off: offset, len, resv: 0 })?;
            format!("alloc range [{}, {})", offset, offset as u64 + len as u64)
        }
        Command::Resize(nr) => {
            registry.resize(nr)?;
            format!("resized to {} slots", nr)
        }
        Command::Update { offset, entries } => {
            let updates = entries
                .into_iter()
                .map(|entry| match entry {
                    UpdateEntry::Skip => FileUpdate::Skip,
                    UpdateEntry::Clear => FileUpdate::Clear,
                    UpdateEntry::Set(name) => FileUpdate::Set(Arc::new(DemoFile {
                        name,
                        regular: true,
                        nowait: false,
                    })),
                })
                .collect();
            let done = registry.update_files(offset, updates)?;
            format!("updated {} slots from {}", done, offset)
        }
        Command::Stats => match registry.stats() {
            Some(stats) if json => serde_json::to_string(&stats).unwrap_or_default(),
            Some(stats) => format!(
                "capacity {} occupied {} range [{}, {}) hint {} free-in-range {}",
                stats.capacity,
                stats.occupied,
                stats.alloc_range.start,
                stats.alloc_range.end,
                stats.alloc_hint,
                stats.range_free
            ),
            None => "no table registered".to_string(),
        },
        Command::Unregister => {
            let released = registry.unregister_files()?;
            format!("unregistered, released {} files", released)
        }
    };
    Ok(output)
}
