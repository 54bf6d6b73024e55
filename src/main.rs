fn main() {
    if let Err(e) = matchbook::cli::run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
