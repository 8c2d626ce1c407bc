use std::process::ExitCode;

mod commands;
mod error;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    commands::run_default().await
}
