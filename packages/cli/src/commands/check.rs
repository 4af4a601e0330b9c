use super::{profiles, SourceFile};
use anyhow::{bail, Result};
use clap::Args;
use codeweave_editor::Document;
use codeweave_lexer::{find_eol_type, format_error};
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Source file to check
    pub input: PathBuf,
}

/// Segment, build and flatten a file, and confirm the bytes survive
pub fn check(args: CheckArgs, cwd: &Path) -> Result<()> {
    let profiles = profiles(cwd)?;
    let file = SourceFile::load(&args.input, &profiles)?;
    let name = args.input.display().to_string();

    let document = match Document::open(&file.text, &file.profile) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("{}", format_error(&file.text, &name, &err));
            bail!("{}", err.user_message());
        }
    };

    let flattened = document.flatten();
    if flattened != file.text {
        let at = first_difference(&file.text, &flattened);
        bail!("{} does not round-trip (first difference at byte {})", name, at);
    }

    let docs = document.blocks().iter().filter(|b| b.is_doc()).count();
    println!("{} {}", "✓".green(), name);
    println!("   Language:    {}", document.profile().id.cyan());
    println!("   Line ending: {:?}", find_eol_type(&file.text));
    println!("   Blocks:      {} ({} doc, {} code)", document.len(), docs, document.len() - docs);
    println!("   Bytes:       {}", file.text.len());
    Ok(())
}

fn first_difference(a: &str, b: &str) -> usize {
    a.bytes()
        .zip(b.bytes())
        .position(|(x, y)| x != y)
        .unwrap_or_else(|| a.len().min(b.len()))
}
