use super::{preview, profiles, SourceFile};
use anyhow::Result;
use clap::Args;
use codeweave_lexer::{segment as split, SegmentKind};
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct SegmentArgs {
    /// Source file to segment
    pub input: PathBuf,

    /// Print segments as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn segment(args: SegmentArgs, cwd: &Path) -> Result<()> {
    let profiles = profiles(cwd)?;
    let file = SourceFile::load(&args.input, &profiles)?;
    let segments = split(&file.text, &file.profile)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&segments)?);
        return Ok(());
    }

    println!(
        "{} {} ({})",
        "Segments".green().bold(),
        args.input.display(),
        file.profile.id.cyan()
    );
    for (i, seg) in segments.iter().enumerate() {
        let kind = match seg.kind {
            SegmentKind::Doc => "doc ".blue().bold(),
            SegmentKind::Code => "code".normal(),
        };
        println!(
            "  {:>3} {} {:>6}..{:<6} {}",
            i + 1,
            kind,
            seg.range.start,
            seg.range.end,
            preview(&seg.text, 60).dimmed()
        );
    }
    Ok(())
}
