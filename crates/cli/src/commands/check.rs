use std::path::Path;
use std::process;

use tampio_core::CompileOptions;

use super::{compile_or_exit, diagnostics_json, print_diagnostics};
use crate::OutputFormat;

pub(crate) fn cmd_check(file: &Path, options: &CompileOptions, output: OutputFormat, quiet: bool) {
    let compilation = compile_or_exit(file, options, output, quiet);
    let failed = compilation.has_errors();

    match output {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "status": if failed { "error" } else { "ok" },
                "errors": compilation.errors().count(),
                "diagnostics": diagnostics_json(&compilation),
            });
            let pretty = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            print_diagnostics(&compilation, quiet);
            println!("{}", if failed { "ERROR" } else { "OK" });
        }
    }

    if failed {
        process::exit(1);
    }
}
