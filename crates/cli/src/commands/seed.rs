//! Seed the catalog from a YAML file.
//!
//! The file lists tag names and coffees that reference tags by name:
//!
//! ```yaml
//! tags: [sweet, bitter]
//! coffees:
//!   - name: Latte
//!     description: Smooth espresso with steamed milk
//!     price: "3.50"
//!     imageUrl: https://example.com/latte.png
//!     tags: [sweet]
//! ```
//!
//! The whole file is validated before connecting to the database. Tags are
//! upserted by name; coffees whose name already exists are skipped, so the
//! command can be re-run against a populated catalog.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use coffee_catalog_api::config::{ApiConfig, ConfigError};
use coffee_catalog_api::db::{self, PgCatalogStore};
use coffee_catalog_api::services::{CatalogError, CatalogService};
use coffee_catalog_core::{CoffeeError, NewCoffee, TagId, TagSet};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Raw seed file contents.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    /// Tags to create even when no coffee references them.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Coffees to create.
    #[serde(default)]
    pub coffees: Vec<SeedCoffee>,
}

/// One coffee entry of a seed file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedCoffee {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A validated coffee, with tags still referenced by name.
#[derive(Debug)]
pub struct PlannedCoffee {
    pub coffee: NewCoffee,
    pub tags: Vec<String>,
}

/// A seed file that passed validation.
#[derive(Debug)]
pub struct SeedPlan {
    /// Every distinct tag name, in first-seen order.
    pub tags: Vec<String>,
    pub coffees: Vec<PlannedCoffee>,
}

/// Outcome of a seeding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub tags: usize,
    pub created: usize,
    pub skipped: usize,
}

impl SeedFile {
    /// Validate every entry, collecting all problems instead of stopping at
    /// the first.
    ///
    /// # Errors
    ///
    /// Returns one message per invalid coffee.
    pub fn plan(self) -> Result<SeedPlan, Vec<String>> {
        let mut errors = Vec::new();
        let mut tags = Vec::new();
        let mut seen = HashSet::new();
        let mut names = HashSet::new();

        let mut remember = |name: &str, tags: &mut Vec<String>| {
            let name = name.trim();
            if !name.is_empty() && seen.insert(name.to_lowercase()) {
                tags.push(name.to_owned());
            }
        };

        for name in &self.tags {
            remember(name, &mut tags);
        }

        let mut coffees = Vec::with_capacity(self.coffees.len());
        for (index, entry) in self.coffees.into_iter().enumerate() {
            let label = format!("coffees[{index}] ({})", entry.name);

            if entry.tags.iter().all(|tag| tag.trim().is_empty()) {
                errors.push(format!("{label}: {}", CoffeeError::NoTags));
                continue;
            }
            let coffee = match NewCoffee::new(
                &entry.name,
                &entry.description,
                entry.price,
                &entry.image_url,
            ) {
                Ok(coffee) => coffee,
                Err(err) => {
                    errors.push(format!("{label}: {err}"));
                    continue;
                }
            };
            if !names.insert(coffee.name.clone()) {
                errors.push(format!("{label}: duplicate coffee name"));
                continue;
            }

            for tag in &entry.tags {
                remember(tag, &mut tags);
            }
            coffees.push(PlannedCoffee {
                coffee,
                tags: entry.tags,
            });
        }

        if errors.is_empty() {
            Ok(SeedPlan { tags, coffees })
        } else {
            Err(errors)
        }
    }
}

/// Parse and validate a seed document.
///
/// # Errors
///
/// Returns `SeedError::Parse` for malformed YAML and `SeedError::Invalid`
/// (after logging each problem) when entries break the coffee rules.
pub fn parse(content: &str) -> Result<SeedPlan, SeedError> {
    let file: SeedFile = serde_yaml::from_str(content)?;
    file.plan().map_err(|errors| {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        SeedError::Invalid(errors.len())
    })
}

/// Seed the catalog from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, the database is
/// unreachable, or a catalog operation fails.
pub async fn run(path: &Path) -> Result<SeedSummary, SeedError> {
    info!(path = %path.display(), "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let plan = parse(&content)?;
    info!(
        tags = plan.tags.len(),
        coffees = plan.coffees.len(),
        "Seed file validated"
    );

    let config = ApiConfig::from_env()?;
    let pool = db::create_pool(&config.database_url, &config.database).await?;
    info!("Connected to database");

    let catalog = CatalogService::new(PgCatalogStore::new(pool));
    apply(&catalog, plan).await
}

/// Write a validated plan through the catalog service.
async fn apply(
    catalog: &CatalogService<PgCatalogStore>,
    plan: SeedPlan,
) -> Result<SeedSummary, SeedError> {
    let tags = catalog.ensure_tags(&plan.tags).await?;
    let ids: HashMap<String, TagId> = tags
        .iter()
        .map(|tag| (tag.name.to_lowercase(), tag.id))
        .collect();

    let existing: HashSet<String> = catalog
        .find_all()
        .await?
        .into_iter()
        .map(|coffee| coffee.name)
        .collect();

    let mut summary = SeedSummary {
        tags: tags.len(),
        created: 0,
        skipped: 0,
    };

    for planned in plan.coffees {
        if existing.contains(&planned.coffee.name) {
            warn!(name = %planned.coffee.name, "Coffee already exists, skipping");
            summary.skipped += 1;
            continue;
        }

        let tag_ids: TagSet = planned
            .tags
            .iter()
            .filter_map(|name| ids.get(&name.trim().to_lowercase()).copied())
            .collect();
        let created = catalog.create(&planned.coffee, &tag_ids).await?;
        info!(coffee_id = %created.id, name = %created.name, "Created coffee");
        summary.created += 1;
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const VALID: &str = r#"
tags: [sweet, Bitter]
coffees:
  - name: Latte
    description: Smooth espresso with steamed milk
    price: "3.50"
    imageUrl: https://example.com/latte.png
    tags: [Sweet, milky]
  - name: Espresso
    description: Short and intense shot of coffee
    price: 2
    imageUrl: https://example.com/espresso.png
    tags: [bitter]
"#;

    #[test]
    fn test_valid_file_collects_distinct_tags() {
        let plan = parse(VALID).unwrap();

        assert_eq!(plan.tags, vec!["sweet", "Bitter", "milky"]);
        assert_eq!(plan.coffees.len(), 2);
        assert_eq!(plan.coffees[0].coffee.name, "Latte");
        assert_eq!(plan.coffees[1].coffee.price.to_string(), "2.00");
    }

    #[test]
    fn test_every_invalid_entry_is_reported() {
        let file: SeedFile = serde_yaml::from_str(
            r#"
coffees:
  - name: ""
    description: Smooth espresso with steamed milk
    price: "3.50"
    imageUrl: https://example.com/latte.png
    tags: [sweet]
  - name: Mocha
    description: Chocolate and espresso
    price: "3.999"
    imageUrl: https://example.com/mocha.png
    tags: [sweet]
  - name: Cortado
    description: Equal parts espresso and milk
    price: "3.00"
    imageUrl: https://example.com/cortado.png
"#,
        )
        .unwrap();

        let errors = file.plan().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("name cannot be empty"));
        assert!(errors[1].contains("invalid price"));
        assert!(errors[2].contains("at least one tag"));
    }

    #[test]
    fn test_duplicate_coffee_names_rejected() {
        let file: SeedFile = serde_yaml::from_str(
            r#"
coffees:
  - name: Latte
    description: Smooth espresso with steamed milk
    price: "3.50"
    imageUrl: https://example.com/latte.png
    tags: [sweet]
  - name: " Latte "
    description: Smooth espresso with steamed milk
    price: "3.50"
    imageUrl: https://example.com/latte.png
    tags: [sweet]
"#,
        )
        .unwrap();

        let errors = file.plan().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate coffee name"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(matches!(
            parse("coffees: []\nroasters: []\n"),
            Err(SeedError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_document_is_empty_plan() {
        let plan = parse("{}").unwrap();
        assert!(plan.tags.is_empty());
        assert!(plan.coffees.is_empty());
    }
}
