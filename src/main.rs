use ::log::error;
use empire::cli::run_cli;
use empire::log;
use human_panic::{metadata, setup_panic};

fn main() {
    setup_panic!(
        metadata!()
            .support("Open an issue describing how the crash occurred and attach the report file.")
    );

    if let Err(err) = run_cli() {
        if log::is_logger_initialised() {
            error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        // Terminate program, signalling an error
        std::process::exit(1);
    }
}
