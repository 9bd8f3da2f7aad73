use std::process::ExitCode;

fn main() -> ExitCode {
    offerdesk_cli::run()
}
