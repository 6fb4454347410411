fn main() {
    if let Err(err) = metalisp_cli::run_cli() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
