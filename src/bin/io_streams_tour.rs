//! Directory listings, recursive walks and file lines as pipeline sources.
//!
//! Run with: cargo run --bin io_streams_tour

use lazy_pipeline::{logging, Sequence};
use std::error::Error;
use std::fs;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builds a small tree:
///
/// ```text
/// root/
///   notes.txt
///   src/
///     main.rs
///     lib.rs
///   docs/
///     guide.md
/// ```
fn build_tree() -> Result<TempDir, Box<dyn Error>> {
    let root = tempfile::tempdir()?;
    fs::create_dir(root.path().join("src"))?;
    fs::create_dir(root.path().join("docs"))?;
    fs::write(root.path().join("notes.txt"), "first line\nsecond line\n\nfourth line\n")?;
    fs::write(root.path().join("src/main.rs"), "fn main() {\n    println!(\"hi\");\n}\n")?;
    fs::write(root.path().join("src/lib.rs"), "pub mod tour;\n")?;
    fs::write(root.path().join("docs/guide.md"), "# Guide\n")?;
    Ok(root)
}

fn relative(root: &Path, paths: Vec<PathBuf>) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| p.strip_prefix(root).unwrap_or(&p).display().to_string())
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let tree = build_tree()?;
    let root = tree.path().to_path_buf();

    println!("=== list_dir ===\n");

    let entries = Sequence::list_dir(&root)?.pipeline().sorted()?.to_vec()?;
    for entry in relative(&root, entries) {
        println!("  {}", entry);
    }

    println!("\n=== walk + filter (find *.rs) ===\n");

    let rust_files = Sequence::walk(&root)?
        .pipeline()
        .filter(|p| p.extension().is_some_and(|ext| ext == "rs"))?
        .sorted()?
        .to_vec()?;
    for file in relative(&root, rust_files) {
        println!("  {}", file);
    }

    let dirs = Sequence::walk(&root)?.pipeline().filter(|p| p.is_dir())?.count()?;
    println!("\ndirectories (root included): {}", dirs);

    println!("\n=== file_lines ===\n");

    let non_blank = Sequence::file_lines(root.join("notes.txt"))?
        .pipeline()
        .filter(|line| !line.trim().is_empty())?
        .to_vec()?;
    println!("non-blank lines: {:?}", non_blank);

    // Every line of every Rust file, counted on the worker pool
    let total_lines: usize = Sequence::walk(&root)?
        .pipeline()
        .filter(|p| p.extension().is_some_and(|ext| ext == "rs"))?
        .map_into(|path| fs::read_to_string(path).map(|text| text.lines().count()).unwrap_or(0))?
        .parallel()?
        .fold(0, |a, b| a + b)?;
    println!("lines across *.rs files: {}", total_lines);

    println!("\n=== lines of a reader ===\n");

    let reader = BufReader::new(Cursor::new("alpha\nbeta\ngamma\n"));
    let joined = Sequence::lines(reader).pipeline().map(|l| l.to_uppercase())?.joining(" | ")?;
    println!("{}", joined);

    match Sequence::file_lines(root.join("missing.txt")) {
        Ok(_) => println!("unexpected: missing file opened"),
        Err(e) => println!("\nopening a missing file: {}", e),
    }

    Ok(())
}
