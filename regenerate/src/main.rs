use std::{io::Write as _, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version, about)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Replace the Secrets of a kustomization with `secretGenerator` entries.
    Secrets {
        /// A kustomization file or a directory containing one.
        dir: PathBuf,
        /// Rewrite the kustomization and its resource files in place, then print the remaining
        /// resources.
        #[clap(long)]
        write: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Secrets { dir, write } => {
            let regenerated = regenerate::regenerate_secrets(&dir)
                .with_context(|| format!("regenerating secrets in {}", dir.display()))?;

            let mut stdout = std::io::stdout().lock();
            if write {
                regenerated.save()?;
                tracing::info!(
                    path = %regenerated.kustomization.path.display(),
                    "updated kustomization"
                );
                regenerate::write_stream(&mut stdout, None, &regenerated.resources)?;
            } else {
                regenerate::write_stream(
                    &mut stdout,
                    Some(&regenerated.kustomization.value),
                    &regenerated.resources,
                )?;
            }
            stdout.flush()?;
        }
    }

    Ok(())
}
