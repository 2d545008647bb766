use agentation_update::cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() {
    // Enable ANSI colors on Windows terminals.
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    let code = cli.execute().await;
    std::process::exit(code);
}
