/// wfexpr command line tool
///
/// Evaluates, renders and classifies workflow expressions against JSON files,
/// for debugging templates outside the editor.

use wfexpr_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
