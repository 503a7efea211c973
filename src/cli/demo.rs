//! Code related to the demo models and the CLI commands for interacting with them.
use super::{RunOpts, handle_run_command};
use crate::settings::Settings;
use anyhow::{Context, Result, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the demo models.
const DEMOS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// The available subcommands for managing demo models.
#[derive(Subcommand)]
pub enum DemoSubcommands {
    /// List available demos.
    List,
    /// Provide information about the specified demo.
    Info {
        /// The name of the demo.
        name: String,
    },
    /// Extract a demo model configuration to a new directory.
    Extract {
        /// The name of the demo to extract.
        name: String,
        /// The destination folder for the demo.
        new_path: Option<PathBuf>,
    },
    /// Run a demo.
    Run {
        /// The name of the demo to run.
        name: String,
        /// Directory for output files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Whether to write the per-record cost detail file
        #[arg(long)]
        detail: bool,
    },
}

impl DemoSubcommands {
    /// Execute the supplied demo subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_demo_list_command(),
            Self::Info { name } => handle_demo_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_demo_extract_command(&name, dest.as_deref())?,
            Self::Run {
                name,
                output_dir,
                detail,
            } => handle_demo_run_command(&name, output_dir.as_deref(), detail, None)?,
        }

        Ok(())
    }
}

/// Handle the `demo list` command.
fn handle_demo_list_command() {
    for entry in DEMOS_DIR.dirs() {
        println!("{}", entry.path().display());
    }
}

/// Handle the `demo info` command.
fn handle_demo_info_command(name: &str) -> Result<()> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    let readme = DEMOS_DIR
        .get_file(path)
        .context("Demo not found.")?
        .contents_utf8()
        .expect("README.txt is not UTF-8 encoded");
    println!("{readme}");

    Ok(())
}

/// Extract the files of the named demo model into the specified directory.
///
/// # Arguments
///
/// * `name` - The name of the demo model
/// * `dest` - The directory in which the files will be placed
pub fn extract_demo(name: &str, dest: &Path) -> Result<()> {
    let sub_dir = DEMOS_DIR.get_dir(name).context("Demo not found.")?;
    for entry in sub_dir.entries() {
        match entry {
            DirEntry::File(file) => {
                let file_name = file.path().file_name().unwrap(); // will never fail
                fs::write(dest.join(file_name), file.contents())?;
            }
            DirEntry::Dir(_) => {
                anyhow::bail!("Nested directories are not supported.");
            }
        }
    }

    Ok(())
}

/// Handle the `demo extract` command.
fn handle_demo_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let dest = dest.map_or_else(|| PathBuf::from(name), PathBuf::from);
    ensure!(
        !dest.exists(),
        "Destination {} already exists",
        dest.display()
    );
    fs::create_dir_all(&dest)?;
    extract_demo(name, &dest)
}

/// Handle the `demo run` command.
///
/// The demo model is extracted to a temporary directory and run from there.
pub fn handle_demo_run_command(
    name: &str,
    output_dir: Option<&Path>,
    detail: bool,
    settings: Option<Settings>,
) -> Result<()> {
    // Copy the demo model to a temporary directory
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    extract_demo(name, temp_dir.path())?;

    let opts = RunOpts {
        output_dir: output_dir.map(PathBuf::from),
        overwrite: false,
        detail,
    };
    handle_run_command(temp_dir.path(), &opts, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extract_demo() {
        let dir = tempdir().unwrap();
        extract_demo("simple", dir.path()).unwrap();
        assert!(dir.path().join("bca.toml").is_file());
        assert!(dir.path().join("fleet.csv").is_file());
    }

    #[test]
    fn test_extract_unknown_demo_is_error() {
        let dir = tempdir().unwrap();
        assert!(extract_demo("no-such-demo", dir.path()).is_err());
    }
}
