use std::path::Path;

use tampio_core::CompileOptions;

use super::compile_or_exit;
use crate::{MarkupOutputFormat, OutputFormat};

/// Markup is produced even when the program has errors; the parser has
/// styled every token it reached.
pub(crate) fn cmd_markup(file: &Path, format: MarkupOutputFormat, output: OutputFormat, quiet: bool) {
    let options = CompileOptions {
        include_std: false,
        ..CompileOptions::default()
    };
    let compilation = compile_or_exit(file, &options, output, quiet);
    let rendered = tampio_core::render_markup(&compilation.tokens, format.into());

    match output {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "format": tampio_core::MarkupFormat::from(format).name(),
                "markup": rendered,
            });
            let pretty = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => println!("{}", rendered),
    }
}
