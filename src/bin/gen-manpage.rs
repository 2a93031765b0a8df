//! Man page generator for pageflash
//!
//! Writes `pageflash.1` plus one page per subcommand (`pageflash-write.1`, ...).
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;

fn render(cmd: clap::Command, output_dir: &Path, file_name: &str) -> std::io::Result<PathBuf> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;

    let output_path = output_dir.join(file_name);
    fs::write(&output_path, buffer)?;
    Ok(output_path)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    let mut pages = vec![render(cmd.clone(), &output_dir, &format!("{}.1", name))?];
    for sub in cmd.get_subcommands() {
        let sub_name = format!("{}-{}", name, sub.get_name());
        let sub = sub.clone().name(sub_name.clone());
        pages.push(render(sub, &output_dir, &format!("{}.1", sub_name))?);
    }

    for page in &pages {
        println!("Man page generated at: {}", page.display());
    }
    println!("\nTo view the main page:");
    println!("  man -l {}", pages[0].display());

    Ok(())
}
