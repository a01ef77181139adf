fn main() {
    if let Err(e) = loglens::cli::main() {
        eprintln!("❌ Error: {e}");
        std::process::exit(1);
    }
}
