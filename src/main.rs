use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;
use std::process::exit;

use check_tls_cert::{run, CheckOutcome, Config, ConfigError};

#[derive(Parser, Debug)]
#[command(name = "check-tls-cert", version, about = "TLS expiry check", long_about = None)]
struct Args {
    /// Hostname to check (fully-qualified domain name)
    #[arg(long)]
    hostname: Option<String>,

    /// TCP port to connect to, default 443
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of days left before expiry that triggers a warning
    #[arg(short, long, allow_negative_numbers = true)]
    warning: Option<i64>,

    /// Number of days left before expiry that triggers a critical
    #[arg(short, long, allow_negative_numbers = true)]
    critical: Option<i64>,

    /// TLS CA certificate bundle in PEM format
    #[arg(short, long)]
    trusted_ca_file: Option<PathBuf>,

    /// Skip TLS certificate verification (not recommended!); `=false` overrides the config file
    #[arg(
        short,
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    insecure_skip_verify: Option<bool>,

    /// Connection timeout in seconds, default 30
    #[arg(long)]
    timeout: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    generate_config: bool,
}

impl Args {
    fn to_config(&self) -> Config {
        Config {
            hostname: self.hostname.clone(),
            port: self.port,
            warning: self.warning,
            critical: self.critical,
            trusted_ca_file: self.trusted_ca_file.clone(),
            insecure_skip_verify: self.insecure_skip_verify,
            timeout: self.timeout,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    if args.generate_config {
        println!("{}", Config::example_toml());
        exit(0);
    }

    let outcome = execute(&args);
    info!("check finished with {}", outcome.severity);

    if args.json {
        println!("{}", outcome.to_json());
    } else {
        println!("{}", outcome);
    }

    exit(outcome.exit_code());
}

fn execute(args: &Args) -> CheckOutcome {
    match load_config(args) {
        Ok(config) => run(&config.into_check_configuration()),
        Err(e) => CheckOutcome::misconfigured(e),
    }
}

/// Defaults, then the configuration file, then command-line flags.
fn load_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = Config::defaults();
    if let Some(path) = &args.config {
        let file_config = Config::from_file(path)?;
        debug!("loaded configuration from {}", path.display());
        config = config.merge_with(file_config);
    }
    Ok(config.merge_with(args.to_config()))
}
