use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use relgraph::entity_catalog::{Cardinality, EntityRegistry, Indirection};
use relgraph::{ActiveFinder, FindQuery, FinderConfig};
use serde_json::json;

/// RelGraph - eager-loading join planner for entity relation graphs
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the single SQL statement (and its parameters) for a find
    Explain {
        /// YAML mapping with tables and entities
        #[arg(long)]
        mapping: PathBuf,

        /// Root entity name
        #[arg(long)]
        root: String,

        /// Relation path to eager-load, repeatable (`items.product`)
        #[arg(long = "with")]
        with: Vec<String>,

        /// Root condition, written against `self.`
        #[arg(long = "where")]
        where_clause: Option<String>,

        /// Root ordering
        #[arg(long)]
        order: Option<String>,

        /// Finder configuration YAML; environment variables otherwise
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the resolved descriptor of an entity
    Describe {
        #[arg(long)]
        mapping: PathBuf,

        #[arg(long)]
        entity: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Explain {
            mapping,
            root,
            with,
            where_clause,
            order,
            config,
        } => {
            let config = match config {
                Some(path) => FinderConfig::from_yaml_file(&path)
                    .with_context(|| format!("loading finder config {}", path.display()))?,
                None => FinderConfig::from_env().context("reading finder config from env")?,
            };
            let registry = EntityRegistry::from_yaml_file(&mapping)
                .with_context(|| format!("loading mapping {}", mapping.display()))?;
            let finder = ActiveFinder::new(Arc::new(registry)).with_config(config);

            let mut query = FindQuery::new(root).with_all(with);
            if let Some(condition) = where_clause {
                query = query.filter(condition);
            }
            if let Some(order) = order {
                query = query.order(order);
            }

            let plan = finder.plan(&query)?;
            println!("{}", plan.sql());
            if !plan.params().is_empty() {
                println!("{}", serde_json::to_string_pretty(plan.params())?);
            }
        }
        Command::Describe { mapping, entity } => {
            let registry = EntityRegistry::from_yaml_file(&mapping)
                .with_context(|| format!("loading mapping {}", mapping.display()))?;
            let descriptor = registry.resolve(&entity)?;

            let relations: Vec<_> = descriptor
                .relations()
                .iter()
                .map(|relation| {
                    let through = match &relation.indirection {
                        Indirection::None => json!(null),
                        Indirection::ViaRelation(via) => json!({ "via": via }),
                        Indirection::ViaTable(table) => json!({
                            "via_table": table.table,
                            "owner_columns": table.owner_columns,
                            "target_columns": table.target_columns,
                        }),
                    };
                    json!({
                        "name": relation.name,
                        "target": relation.target,
                        "many": relation.cardinality == Cardinality::Multiple,
                        "on": relation.condition.as_ref().map(|c| c.raw().to_string()),
                        "through": through,
                    })
                })
                .collect();

            let described = json!({
                "entity": descriptor.name,
                "table": descriptor.table_name(),
                "primary_key": descriptor.primary_key,
                "columns": descriptor.columns(),
                "relations": relations,
            });
            println!("{}", serde_json::to_string_pretty(&described)?);
        }
    }
    Ok(())
}
