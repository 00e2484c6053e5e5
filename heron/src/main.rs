mod api;
mod config;
mod inst;
mod peer;
mod rib;
mod task;
mod timer;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use config::Config;
use inst::Bgp;

#[derive(Parser)]
#[command(author, version, about = "BGP speaker driven by helper processes")]
struct Arg {
    /// Configuration file (searched under $ETC/heron and /etc/heron
    /// when relative).
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(short = 't', long)]
    test: bool,
}

fn tracing_set() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let arg = Arg::parse();
    tracing_set();

    let path = Config::search(&arg.config);
    let config = match Config::load(&path) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::from(2);
        }
    };
    if arg.test {
        println!("configuration {} is valid", path.display());
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("runtime: {}", err);
            return ExitCode::from(1);
        }
    };
    let code = runtime.block_on(async move {
        let mut bgp = Bgp::new(config, arg.config);
        bgp.event_loop().await
    });
    ExitCode::from(code as u8)
}
