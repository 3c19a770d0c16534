use clap::Parser;
use lucid_cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(error) = lucid_cli::run(cli).await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
