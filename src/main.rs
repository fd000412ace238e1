use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use pdf_inspect::core::document::Document;
use pdf_inspect::core::page::PageTree;
use pdf_inspect::core::summary::DocumentSummary;
use pdf_inspect::PdfError;
use tracing_subscriber::EnvFilter;

/// A read-only structural inspector for PDF documents.
#[derive(Debug, ClapParser)]
#[command(name = "pdf-inspect", version, about)]
struct Cli {
    /// Path to the PDF file to inspect.
    pdf_file: PathBuf,

    /// Emit a structured JSON report instead of the plain-text one.
    #[arg(long)]
    json: bool,

    /// Additionally dump each page's raw merged content bytes.
    #[arg(short = 'i', long = "instructions")]
    instructions: bool,

    /// Raise the default tracing level from warn to info.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Raise the default tracing level to debug.
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable debug tracing for core::parser and core::lexer specifically.
    #[arg(long = "debug-parser")]
    debug_parser: bool,

    /// Enable trace tracing for core::lexer specifically.
    #[arg(long = "debug-tokenizer")]
    debug_tokenizer: bool,
}

impl Cli {
    fn env_filter(&self) -> EnvFilter {
        let mut directives = vec!["warn".to_string()];
        if self.verbose {
            directives.push("info".to_string());
        }
        if self.debug {
            directives.push("debug".to_string());
        }
        if self.debug_parser {
            directives.push("pdf_inspect::core::parser=debug".to_string());
            directives.push("pdf_inspect::core::lexer=debug".to_string());
        }
        if self.debug_tokenizer {
            directives.push("pdf_inspect::core::lexer=trace".to_string());
        }
        EnvFilter::new(directives.join(","))
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_env_filter(cli.env_filter()).init();

    let bytes = match std::fs::read(&cli.pdf_file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error reading {}: {}", cli.pdf_file.display(), e);
            process::exit(3);
        }
    };

    match run(&bytes, &cli) {
        Ok(()) => process::exit(0),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(err.exit_code());
        }
    }
}

fn run(bytes: &[u8], cli: &Cli) -> Result<(), PdfError> {
    let doc = Document::load(bytes)?;
    let tree = PageTree::walk(&doc)?;
    let summary = DocumentSummary::build(&doc, &tree);

    if cli.json {
        let json = summary
            .to_json()
            .map_err(|e| PdfError::bug(format!("failed to serialize report: {}", e)))?;
        println!("{}", json);
    } else {
        print!("{}", summary.to_text(&tree, cli.instructions));
    }

    Ok(())
}
