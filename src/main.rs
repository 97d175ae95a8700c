fn main() {
    if let Err(err) = fdlayout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
