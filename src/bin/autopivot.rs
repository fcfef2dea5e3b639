fn main() {
    if let Err(err) = autopivot::pivot::run(std::env::args_os()) {
        eprintln!("Error while building the pivot workbook: {err:#}");
        std::process::exit(1);
    }
}
