fn main() {
    if let Err(err) = esxivault::cli::run() {
        println!("{:#}", err);
        std::process::exit(2);
    }
}
