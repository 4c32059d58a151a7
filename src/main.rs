use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use e3fs::checksum::file_sha256;

#[derive(Parser)]
#[command(about = "single-file fixed-capacity filesystem emulator")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create and format a container file.
    Format {
        container: PathBuf,
        #[arg(long)]
        block_size: u32,
        #[arg(long)]
        num_blocks: u32,
        #[arg(long)]
        num_inodes: u32,
    },
    /// Copy a local file into the container.
    AddFile {
        container: PathBuf,
        /// Destination path inside the container.
        path: String,
        /// Local file whose content is stored.
        source: PathBuf,
    },
    /// Create a directory inside the container.
    AddDir { container: PathBuf, path: String },
    /// Remove a file or directory subtree from the container.
    Remove { container: PathBuf, path: String },
    /// Move or rename an entry inside the container.
    Move {
        container: PathBuf,
        old_path: String,
        new_path: String,
    },
    /// Copy a file out of the container and print its digest.
    Extract {
        container: PathBuf,
        /// Source path inside the container.
        path: String,
        /// Local destination file.
        dest: PathBuf,
    },
    /// Check the container for consistency.
    Check { container: PathBuf },
    /// Print the hex SHA-256 digest of a local file.
    Digest { file: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Command::Format {
            container,
            block_size,
            num_blocks,
            num_inodes,
        } => e3fs::format(&container, block_size, num_blocks, num_inodes)?,
        Command::AddFile {
            container,
            path,
            source,
        } => {
            let content = std::fs::read(&source)
                .with_context(|| format!("unable to read {}", source.display()))?;
            e3fs::add_file(&container, &path, &content)?;
        }
        Command::AddDir { container, path } => e3fs::add_dir(&container, &path)?,
        Command::Remove { container, path } => e3fs::remove(&container, &path)?,
        Command::Move {
            container,
            old_path,
            new_path,
        } => e3fs::rename(&container, &old_path, &new_path)?,
        Command::Extract {
            container,
            path,
            dest,
        } => {
            let content = e3fs::read_file(&container, &path)?;
            std::fs::write(&dest, content)
                .with_context(|| format!("unable to write {}", dest.display()))?;
            println!("{}", file_sha256(&dest)?);
        }
        Command::Check { container } => {
            e3fs::check(&container)?;
            println!("{}: consistent", container.display());
        }
        Command::Digest { file } => println!("{}", file_sha256(&file)?),
    }

    Ok(())
}
