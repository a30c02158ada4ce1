//! procflow binary: document checks and migration

use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let matches = procflow_cli::command().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let code = procflow_cli::run(&matches)?;
    std::process::exit(code);
}
