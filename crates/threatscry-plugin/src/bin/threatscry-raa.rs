//! Default attacker attractiveness calculator. Reads the parsed model as JSON
//! on stdin and writes the scores as JSON to stdout.

use std::process::ExitCode;

use threatscry_plugin::contract::{read_model, write_json};
use threatscry_plugin::raa::calculate;

fn main() -> ExitCode {
    let result = read_model().and_then(|model| write_json(&calculate(&model)));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("threatscry-raa: {err}");
            ExitCode::FAILURE
        }
    }
}
