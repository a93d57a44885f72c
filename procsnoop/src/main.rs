use clap::Parser;
use procsnoop::{config, config::AppConfig, core_logic, logger};
use std::path::PathBuf;

/// Command line options for procsnoop
#[derive(Debug, Parser)]
#[command(author, version, about = "Live feed of process exec/exit events", long_about = None)]
struct Cli {
    /// Minimum process duration (ms) for exit events to be reported. 0 reports all.
    #[arg(short = 'd', long = "min-duration", value_name = "MS")]
    min_duration: Option<u32>,

    /// Path to configuration file (YAML). If not provided, search order applies.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Compiled eBPF object providing handle_exec/handle_exit and the `rb` ring buffer
    #[arg(long, env = "PROCSNOOP_OBJECT")]
    object: Option<PathBuf>,

    /// Write logs to a daily rolling file in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print the path that was selected for configuration and exit
    #[arg(long)]
    print_config_path: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(min_duration) = self.min_duration {
            config.min_duration_ms = min_duration;
        }
        if let Some(object) = &self.object {
            config.object_path = object.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_directory = Some(log_dir.clone());
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config_path = config::resolve_config_path(cli.config.as_deref());
    if cli.print_config_path {
        match &config_path {
            Some(path) => println!("{}", path.display()),
            None => println!("(built-in defaults)"),
        }
        return;
    }

    let mut app_config = match &config_path {
        Some(path) => match AppConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        },
        None => AppConfig::default(),
    };
    cli.apply_to(&mut app_config);

    let log_guard = match logger::init_logging(
        app_config.log_directory.as_deref(),
        app_config.default_log_level(),
    ) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("Config resolution: using {:?}", config_path);

    let exit_code = match core_logic::async_runtime(app_config) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    // 退出前显式释放日志 guard，确保文件日志写完
    drop(log_guard);
    std::process::exit(exit_code);
}
