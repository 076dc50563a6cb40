//! Provides the main entry point to the program.
use human_panic::setup_panic;
use npa_howtopay::cli::run_cli;
use npa_howtopay::log;

fn main() {
    setup_panic!();

    if let Err(err) = run_cli() {
        if log::is_logger_initialised() {
            ::log::error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        // Terminate program, signalling an error
        std::process::exit(1);
    }
}
