pub fn print_banner() {
    eprintln!("ironbark {}", env!("CARGO_PKG_VERSION"));
}
