use anyhow::Result;
use clap::Parser;
use docflow_core::{DataOptions, HtmlOptions, RewriteOptions};
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::builder()
        .with_default_directive(cli.level_filter().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Html {
            file,
            part,
            url_base,
            numbered,
            lazy_images,
            noopener,
        } => {
            let doc = commands::load(&file, part.as_deref())?;
            let options = HtmlOptions { url_base, numbered };
            let rewrite = RewriteOptions {
                enforce_img_loading_lazy: lazy_images,
                external_links_noopener: noopener,
            };
            out = commands::html(&doc, out, &options, rewrite)?;
        }
        Commands::Data {
            file,
            part,
            text,
            no_tables,
        } => {
            let doc = commands::load(&file, part.as_deref())?;
            let options = DataOptions {
                text,
                tables: !no_tables,
            };
            writeln!(out, "{}", commands::data(&doc, &options)?)?;
        }
        Commands::Stream { file } => {
            let doc = commands::load(&file, None)?;
            write!(out, "{}", commands::stream(&doc))?;
        }
        Commands::Tree { file } => {
            let doc = commands::load(&file, None)?;
            writeln!(out, "{}", commands::tree(&doc)?)?;
        }
        Commands::Check { reference, target } => {
            let (ok, diagnostic) = commands::check(&reference, &target)?;
            if !ok {
                writeln!(out, "{diagnostic}")?;
                out.flush()?;
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Csv { instances, types } => {
            writeln!(out, "{}", commands::typed_csv(&instances, &types)?)?;
        }
    }

    out.flush()?;
    Ok(ExitCode::SUCCESS)
}
