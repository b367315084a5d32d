pub(crate) mod check;
pub(crate) mod compile;
pub(crate) mod markup;

use std::path::Path;
use std::process;

use tampio_core::{Compilation, CompileOptions};

use crate::{report_error, OutputFormat};

/// Run the compiler, exiting with status 1 when it cannot start.
pub(crate) fn compile_or_exit(
    file: &Path,
    options: &CompileOptions,
    output: OutputFormat,
    quiet: bool,
) -> Compilation {
    match tampio_core::compile_file(file, options) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn diagnostics_json(compilation: &Compilation) -> serde_json::Value {
    serde_json::Value::Array(
        compilation
            .diagnostics
            .iter()
            .map(|d| d.to_json_value())
            .collect(),
    )
}

/// Text rendering of every diagnostic to stderr. Quiet mode keeps errors
/// and drops warnings.
pub(crate) fn print_diagnostics(compilation: &Compilation, quiet: bool) {
    for d in &compilation.diagnostics {
        if quiet && !d.is_error() {
            continue;
        }
        eprintln!("{}", compilation.render(d));
    }
}
