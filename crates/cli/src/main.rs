pub fn main() {
    std::process::exit(sqldiff_cli_lib::run_with_args(std::env::args_os()));
}
