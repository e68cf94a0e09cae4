use bumpers::cli::{Cli, CliContext};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let exit_code = CliContext::new().execute(cli.command).await;
    std::process::exit(exit_code.as_i32());
}
