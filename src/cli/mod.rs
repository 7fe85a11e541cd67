pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::database::DocumentStore;

#[derive(Parser)]
#[command(name = "seeder")]
#[command(about = "DevCamper seeder - load or remove fixture data")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Import users, bootcamps and courses from JSON fixtures")]
    Import {
        #[arg(long, help = "Fixtures directory", default_value = "fixtures")]
        dir: PathBuf,
    },

    #[command(about = "Delete every user, bootcamp and course")]
    Destroy,
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    let config = crate::config::config();
    let store = crate::database::connect(&config.database).await?;
    if let Err(e) = ensure_persistent(store.as_ref()) {
        store.close().await;
        return Err(e);
    }

    let result = match cli.command {
        Commands::Import { dir } => commands::seed::handle_import(store.clone(), &dir, output_format).await,
        Commands::Destroy => commands::seed::handle_destroy(store.clone(), output_format).await,
    };

    store.close().await;
    result
}

/// Seeding an in-process store would be lost when the seeder exits.
fn ensure_persistent(store: &dyn DocumentStore) -> anyhow::Result<()> {
    if store.backend() == "memory" {
        anyhow::bail!("seeder needs a persistent DATABASE_URL (got the in-memory store)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[test]
    fn refuses_the_in_memory_store() {
        let err = ensure_persistent(&MemoryStore::new()).unwrap_err();
        assert!(err.to_string().contains("persistent DATABASE_URL"));
    }

    #[test]
    fn parses_import_with_a_custom_dir() {
        let cli = Cli::parse_from(["seeder", "--json", "import", "--dir", "data"]);
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Import { dir } if dir == PathBuf::from("data")));
    }
}
