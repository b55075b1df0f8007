use std::process::ExitCode;

fn main() -> ExitCode {
    carmarket_cli::run()
}
