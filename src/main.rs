use clap::Parser;
use std::process::ExitCode;

mod app;
mod cli;
mod error;
mod logging;
mod manifest;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = cli::Args::parse();
    logging::init(args.verbose);
    match app::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}
