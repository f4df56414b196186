use std::io::{self, Write};
use std::process;

use safereplace::runner::run_cli;

fn main() {
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();

    let status = run_cli(std::env::args_os(), &mut out, &mut err);

    let _ = out.flush();
    let _ = err.flush();
    process::exit(status.code());
}
