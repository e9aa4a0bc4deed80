use clap::Parser;
use summarize_cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.run_cli().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
