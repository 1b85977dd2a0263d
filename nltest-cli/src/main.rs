//! Binary entrypoint for nltest

fn main() {
    if let Err(err) = nltest_cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
