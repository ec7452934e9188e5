//! Binary entrypoint for the stdio MCP adapter.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match hostbridge_mcp::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(io::stderr().lock(), "hostbridge-mcp: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
