//! Binary entrypoint for the host bridge daemon.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match hostbridged::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(io::stderr().lock(), "hostbridged: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
