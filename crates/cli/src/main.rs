mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Format for the markup subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum MarkupOutputFormat {
    Html,
    Markdown,
    Latex,
}

impl From<MarkupOutputFormat> for tampio_core::MarkupFormat {
    fn from(f: MarkupOutputFormat) -> Self {
        match f {
            MarkupOutputFormat::Html => tampio_core::MarkupFormat::Html,
            MarkupOutputFormat::Markdown => tampio_core::MarkupFormat::Markdown,
            MarkupOutputFormat::Latex => tampio_core::MarkupFormat::Latex,
        }
    }
}

/// Tampio compiler: Finnish-language sources to JavaScript.
#[derive(Parser)]
#[command(
    name = "tampio",
    version = tampio_core::COMPILER_VERSION,
    about = "Tampio compiler: Finnish-language sources to JavaScript"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log compiler passes to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .itp file to JavaScript
    Compile {
        /// Path to the .itp source file
        file: PathBuf,
        /// Do not compile the standard unit ahead of the program
        #[arg(long)]
        no_std: bool,
        /// Extra lexicon file merged over the built-in one (repeatable)
        #[arg(long = "lexicon", value_name = "PATH")]
        lexicons: Vec<PathBuf>,
        /// Print an HTML page with the source markup and the compiled code
        #[arg(short = 'p', long)]
        html_page: bool,
    },

    /// Check a .itp file and print OK or ERROR
    Check {
        /// Path to the .itp source file
        file: PathBuf,
        /// Extra lexicon file merged over the built-in one (repeatable)
        #[arg(long = "lexicon", value_name = "PATH")]
        lexicons: Vec<PathBuf>,
    },

    /// Render a .itp file with syntax markup
    Markup {
        /// Path to the .itp source file
        file: PathBuf,
        /// Markup format
        #[arg(long, default_value = "html", value_enum)]
        format: MarkupOutputFormat,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    match cli.command {
        Commands::Compile {
            file,
            no_std,
            lexicons,
            html_page,
        } => {
            let options = tampio_core::CompileOptions {
                include_std: !no_std,
                lexicons,
            };
            commands::compile::cmd_compile(&file, &options, html_page, cli.output, cli.quiet);
        }
        Commands::Check { file, lexicons } => {
            let options = tampio_core::CompileOptions {
                lexicons,
                ..tampio_core::CompileOptions::default()
            };
            commands::check::cmd_check(&file, &options, cli.output, cli.quiet);
        }
        Commands::Markup { file, format } => {
            commands::markup::cmd_markup(&file, format, cli.output, cli.quiet);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
