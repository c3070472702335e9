use std::process::ExitCode;

fn main() -> ExitCode {
    fairquote_cli::run()
}
