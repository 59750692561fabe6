use watchsort::cli::Cli;
use watchsort::cli::commands::watch;

#[tokio::main]
async fn main() {
    // Exits with usage on stderr for a missing or unknown -t value
    let cli = Cli::parse_normalized();

    if let Err(e) = watch::run(cli.operation).await {
        // No-op when the config already set logging up
        watchsort::logging::init();
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
