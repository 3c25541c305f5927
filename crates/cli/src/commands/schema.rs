//! Catalog schema inspection.
//!
//! # Usage
//!
//! ```bash
//! # Every relation added by the `catalog relations` migration
//! bazaar-cli schema relations
//!
//! # Relations declared on or pointing at one table
//! bazaar-cli schema relations --model product
//! ```

use bazaar_core::schema::{CATALOG_RELATIONS_STEP, Relation, relations_from, relations_to};
use thiserror::Error;

/// Errors from schema commands.
#[derive(Debug, Error)]
pub enum SchemaCommandError {
    /// No relation mentions the requested table.
    #[error("No catalog relations involve '{0}'")]
    UnknownModel(String),
}

/// The lines printed for `model`, or for every relation when `None`.
fn relation_lines(model: Option<&str>) -> Result<Vec<String>, SchemaCommandError> {
    let relations: Vec<&Relation> = match model {
        None => CATALOG_RELATIONS_STEP.relations.iter().collect(),
        Some(table) => {
            let mut found: Vec<&Relation> = relations_from(table).collect();
            found.extend(relations_to(table).filter(|r| r.model.table != table));
            if found.is_empty() {
                return Err(SchemaCommandError::UnknownModel(table.to_owned()));
            }
            found
        }
    };

    Ok(relations.iter().map(ToString::to_string).collect())
}

/// Print the catalog relationship table.
///
/// # Errors
///
/// Returns `SchemaCommandError::UnknownModel` if `model` matches nothing.
pub fn relations(model: Option<&str>) -> Result<(), SchemaCommandError> {
    let lines = relation_lines(model)?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{} (after: {})",
            CATALOG_RELATIONS_STEP.name,
            CATALOG_RELATIONS_STEP.dependencies.join(", ")
        );
        for line in lines {
            println!("  {line}");
        }
    }
    Ok(())
}
