use std::path::Path;
use std::process;

use tampio_core::CompileOptions;

use super::{compile_or_exit, diagnostics_json, print_diagnostics};
use crate::OutputFormat;

pub(crate) fn cmd_compile(
    file: &Path,
    options: &CompileOptions,
    html_page: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let compilation = compile_or_exit(file, options, output, quiet);
    let (key, text) = if html_page {
        ("page", tampio_core::html_page(&compilation.tokens, &compilation.code))
    } else {
        ("code", compilation.code.clone())
    };

    match output {
        OutputFormat::Json => {
            let value = serde_json::json!({
                key: text,
                "diagnostics": diagnostics_json(&compilation),
            });
            let pretty = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            print_diagnostics(&compilation, quiet);
            print!("{}", text);
        }
    }

    if compilation.has_errors() {
        process::exit(1);
    }
}
