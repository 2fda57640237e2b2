use std::process::ExitCode;

fn main() -> ExitCode {
    pickaxe_lib::run()
}
