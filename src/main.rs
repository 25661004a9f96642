fn main() {
    if let Err(err) = dataforge::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
