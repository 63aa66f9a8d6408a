use std::process::ExitCode;

fn main() -> ExitCode {
    shelfsense_cli::run()
}
