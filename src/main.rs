mod cache;
mod cli;
mod config;
mod crosswalk;
mod error;
mod extractor;
mod locale;
mod remote;
mod resolver;
mod types;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::crosswalk::CrosswalkResolver;
use crate::extractor::Extractor;
use crate::remote::HttpSchemaService;
use crate::resolver::SchemaResolver;
use crate::types::CrosswalkEntry;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.cache_root, cli.install_dir);

    match cli.command {
        Command::Schema { appid, lang, json } => {
            let service = HttpSchemaService::new(&config.schema_api_base);
            let extractor = Extractor::new(config.install_dir.clone(), config.cache_root.clone());
            let resolver = SchemaResolver::new(config.cache_root.clone(), service, extractor);
            let resolved = resolver.resolve(&appid, &lang)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                println!(
                    "{} ({}) [{}] {} achievements",
                    resolved.schema.name,
                    resolved.schema.appid,
                    resolved.language,
                    resolved.schema.achievement.total
                );
                for achievement in &resolved.list {
                    println!("  {}: {}", achievement.display_name, achievement.description);
                }
            }
            Ok(())
        }

        Command::Resolve {
            foreign_id,
            platform,
            json,
        } => {
            let mut resolver = CrosswalkResolver::new(
                &platform,
                config.crosswalk_cache_path(&platform),
                &config.gamesdb_base,
            );
            let canonical = resolver.resolve(&foreign_id)?;
            if json {
                let entry = CrosswalkEntry {
                    foreign_id,
                    canonical_id: canonical,
                };
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                println!("{foreign_id} -> {canonical}");
            }
            Ok(())
        }

        Command::Scan {
            root,
            platform,
            json,
        } => {
            let mut resolver = CrosswalkResolver::new(
                &platform,
                config.crosswalk_cache_path(&platform),
                &config.gamesdb_base,
            );
            let hits = resolver.scan(&root)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                for hit in &hits {
                    println!("{}\t{}", hit.canonical_id, hit.source_path.display());
                }
                eprintln!("{} title(s) resolved", hits.len());
            }
            Ok(())
        }

        Command::Index { json } => {
            let extractor = Extractor::new(config.install_dir.clone(), config.cache_root.clone());
            let index = extractor.configuration_index()?;
            if json {
                println!("{}", serde_json::to_string_pretty(index)?);
            } else {
                for entry in index {
                    println!("{}\t{}", entry.index, entry.name);
                }
            }
            Ok(())
        }
    }
}
