use std::process::ExitCode;

fn main() -> ExitCode {
    quoteline_cli::run()
}
