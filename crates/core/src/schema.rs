//! Declarative catalog relationships.
//!
//! The catalog tables are created bare by the `catalog initial` migration; the
//! `catalog relations` migration then adds every relationship between them.
//! [`CATALOG_RELATIONS_STEP`] describes that second step as data so it can be
//! printed by the CLI, checked against the migration sequence, and compared
//! with the SQL that actually runs.

use core::fmt;

use thiserror::Error;

/// Errors raised when a migration step is placed in a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The step itself is not part of the sequence.
    #[error("migration step '{0}' is not in the migration sequence")]
    UnknownStep(&'static str),

    /// A dependency is missing or ordered after the step.
    #[error("migration step '{step}' depends on '{dependency}', which must run first")]
    MissingDependency {
        /// The dependent step.
        step: &'static str,
        /// The dependency that did not run before it.
        dependency: &'static str,
    },
}

/// What happens to dependents when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnDelete {
    /// Dependents are deleted with the referenced row.
    Cascade,
    /// Deletion is refused while dependents exist.
    Protect,
    /// Database default: deletion fails on a dangling reference.
    Restrict,
}

impl OnDelete {
    /// The SQL referential action.
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Protect | Self::Restrict => "RESTRICT",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Cascade => "cascade",
            Self::Protect => "protect",
            Self::Restrict => "restrict",
        }
    }
}

/// Shape of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// A unique foreign key.
    OneToOne,
    /// A plain foreign key.
    ForeignKey,
    /// A join table between both ends.
    ManyToMany,
}

impl RelationKind {
    const fn label(self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::ForeignKey => "foreign key",
            Self::ManyToMany => "many-to-many",
        }
    }
}

/// A table, addressed by `PostgreSQL` schema and table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Model {
    /// `PostgreSQL` schema.
    pub schema: &'static str,
    /// Table name inside the schema.
    pub table: &'static str,
}

impl Model {
    pub const AUTH_USER: Self = Self::new("auth", "user");
    pub const CART: Self = Self::catalog("cart");
    pub const PRODUCT: Self = Self::catalog("product");
    pub const BRAND: Self = Self::catalog("brand");
    pub const CATEGORY: Self = Self::catalog("category");
    pub const TAG: Self = Self::catalog("tag");
    pub const ATTRIBUTE: Self = Self::catalog("attribute");

    const fn new(schema: &'static str, table: &'static str) -> Self {
        Self { schema, table }
    }

    const fn catalog(table: &'static str) -> Self {
        Self::new("catalog", table)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// One relationship added to an existing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Relation {
    /// Model that gains the field.
    pub model: Model,
    /// Field name on that model.
    pub field: &'static str,
    /// Referenced model.
    pub target: Model,
    /// Relationship shape.
    pub kind: RelationKind,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether an empty value is accepted on input.
    pub blank: bool,
    /// Delete propagation from `target` to `model`.
    pub on_delete: OnDelete,
    /// Human-readable field label.
    pub verbose_name: &'static str,
}

impl Relation {
    /// Column holding the reference (`<field>_id`).
    #[must_use]
    pub fn column(&self) -> String {
        format!("{}_id", self.field)
    }

    /// Join table for many-to-many relations (`<model>_<field>`).
    #[must_use]
    pub fn join_table(&self) -> String {
        format!("{}.{}_{}", self.model.schema, self.model.table, self.field)
    }

    /// Render the DDL statement that adds this relation (without the
    /// trailing semicolon).
    #[must_use]
    pub fn column_sql(&self) -> String {
        match self.kind {
            RelationKind::OneToOne | RelationKind::ForeignKey => {
                let mut constraints = String::new();
                if !self.nullable {
                    constraints.push_str(" NOT NULL");
                }
                if self.kind == RelationKind::OneToOne {
                    constraints.push_str(" UNIQUE");
                }
                format!(
                    "ALTER TABLE {} ADD COLUMN {} INTEGER{} REFERENCES {} (id) ON DELETE {}",
                    self.model,
                    self.column(),
                    constraints,
                    self.target,
                    self.on_delete.sql()
                )
            }
            RelationKind::ManyToMany => {
                let owner = format!("{}_id", self.model.table);
                let other = format!("{}_id", self.target.table);
                format!(
                    "CREATE TABLE {} ( id SERIAL PRIMARY KEY, \
                     {owner} INTEGER NOT NULL REFERENCES {} (id) ON DELETE CASCADE, \
                     {other} INTEGER NOT NULL REFERENCES {} (id) ON DELETE CASCADE, \
                     UNIQUE ({owner}, {other}) )",
                    self.join_table(),
                    self.model,
                    self.target
                )
            }
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let presence = if self.kind == RelationKind::ManyToMany {
            if self.blank { "optional" } else { "required" }
        } else if self.nullable {
            "optional"
        } else {
            "required"
        };
        write!(
            f,
            "{}.{} -> {} ({}, {}, on delete {}) \"{}\"",
            self.model,
            self.field,
            self.target,
            self.kind.label(),
            presence,
            self.on_delete.label(),
            self.verbose_name
        )
    }
}

/// An ordered schema change that assumes its dependencies already ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStep {
    /// Step name, matching the migration file description.
    pub name: &'static str,
    /// Steps that must be applied first.
    pub dependencies: &'static [&'static str],
    /// Relationship additions, in application order.
    pub relations: &'static [Relation],
}

impl MigrationStep {
    /// Check that this step and all of its dependencies appear in `sequence`
    /// with every dependency ahead of the step.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnknownStep` if the step is absent and
    /// `SchemaError::MissingDependency` for the first dependency that is
    /// absent or ordered after it.
    pub fn check_order(&self, sequence: &[&str]) -> Result<(), SchemaError> {
        let position = sequence
            .iter()
            .position(|name| *name == self.name)
            .ok_or(SchemaError::UnknownStep(self.name))?;

        let before = sequence.get(..position).unwrap_or_default();
        for dependency in self.dependencies {
            if !before.contains(dependency) {
                return Err(SchemaError::MissingDependency {
                    step: self.name,
                    dependency,
                });
            }
        }
        Ok(())
    }
}

/// Relationship additions applied on top of the bare catalog tables.
pub const CATALOG_RELATIONS: [Relation; 5] = [
    Relation {
        model: Model::CART,
        field: "user",
        target: Model::AUTH_USER,
        kind: RelationKind::OneToOne,
        nullable: false,
        blank: false,
        on_delete: OnDelete::Cascade,
        verbose_name: "User",
    },
    Relation {
        model: Model::PRODUCT,
        field: "brand",
        target: Model::BRAND,
        kind: RelationKind::ForeignKey,
        nullable: true,
        blank: false,
        on_delete: OnDelete::Protect,
        verbose_name: "Brand",
    },
    Relation {
        model: Model::PRODUCT,
        field: "categories",
        target: Model::CATEGORY,
        kind: RelationKind::ManyToMany,
        nullable: false,
        blank: true,
        on_delete: OnDelete::Cascade,
        verbose_name: "Categories",
    },
    Relation {
        model: Model::ATTRIBUTE,
        field: "product",
        target: Model::PRODUCT,
        kind: RelationKind::ForeignKey,
        nullable: false,
        blank: false,
        on_delete: OnDelete::Cascade,
        verbose_name: "Product",
    },
    Relation {
        model: Model::PRODUCT,
        field: "tags",
        target: Model::TAG,
        kind: RelationKind::ManyToMany,
        nullable: false,
        blank: true,
        on_delete: OnDelete::Cascade,
        verbose_name: "Tags",
    },
];

/// The `catalog relations` migration.
pub const CATALOG_RELATIONS_STEP: MigrationStep = MigrationStep {
    name: "catalog relations",
    dependencies: &["create auth user", "catalog initial"],
    relations: &CATALOG_RELATIONS,
};

/// Relations declared on `table` (e.g. `"product"`).
pub fn relations_from(table: &str) -> impl Iterator<Item = &'static Relation> + '_ {
    CATALOG_RELATIONS
        .iter()
        .filter(move |r| r.model.table == table)
}

/// Relations that reference `table`.
pub fn relations_to(table: &str) -> impl Iterator<Item = &'static Relation> + '_ {
    CATALOG_RELATIONS
        .iter()
        .filter(move |r| r.target.table == table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_user_is_unique_mandatory_cascade() {
        let sql = CATALOG_RELATIONS[0].column_sql();
        assert_eq!(
            sql,
            "ALTER TABLE catalog.cart ADD COLUMN user_id INTEGER NOT NULL UNIQUE \
             REFERENCES auth.user (id) ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_product_brand_is_nullable_protect() {
        let sql = CATALOG_RELATIONS[1].column_sql();
        assert_eq!(
            sql,
            "ALTER TABLE catalog.product ADD COLUMN brand_id INTEGER \
             REFERENCES catalog.brand (id) ON DELETE RESTRICT"
        );
    }

    #[test]
    fn test_many_to_many_renders_join_table() {
        let sql = CATALOG_RELATIONS[2].column_sql();
        assert!(sql.starts_with("CREATE TABLE catalog.product_categories ("));
        assert!(sql.contains("product_id INTEGER NOT NULL REFERENCES catalog.product (id)"));
        assert!(sql.contains("category_id INTEGER NOT NULL REFERENCES catalog.category (id)"));
        assert!(sql.contains("UNIQUE (product_id, category_id)"));
    }

    #[test]
    fn test_step_declares_five_additions_in_order() {
        let fields: Vec<_> = CATALOG_RELATIONS_STEP
            .relations
            .iter()
            .map(|r| format!("{}.{}", r.model.table, r.field))
            .collect();
        assert_eq!(
            fields,
            [
                "cart.user",
                "product.brand",
                "product.categories",
                "attribute.product",
                "product.tags"
            ]
        );
    }

    #[test]
    fn test_check_order_accepts_dependencies_first() {
        let sequence = [
            "create auth user",
            "create blog post",
            "catalog initial",
            "catalog relations",
        ];
        assert!(CATALOG_RELATIONS_STEP.check_order(&sequence).is_ok());
    }

    #[test]
    fn test_check_order_rejects_dependency_after_step() {
        let sequence = ["create auth user", "catalog relations", "catalog initial"];
        assert_eq!(
            CATALOG_RELATIONS_STEP.check_order(&sequence),
            Err(SchemaError::MissingDependency {
                step: "catalog relations",
                dependency: "catalog initial",
            })
        );
    }

    #[test]
    fn test_check_order_rejects_unknown_step() {
        assert_eq!(
            CATALOG_RELATIONS_STEP.check_order(&["catalog initial"]),
            Err(SchemaError::UnknownStep("catalog relations"))
        );
    }

    #[test]
    fn test_relation_lookup() {
        assert_eq!(relations_from("product").count(), 3);
        let to_product: Vec<_> = relations_to("product").map(|r| r.field).collect();
        assert_eq!(to_product, ["product"]);
        assert_eq!(relations_to("user").count(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CATALOG_RELATIONS[1].to_string(),
            "catalog.product.brand -> catalog.brand (foreign key, optional, on delete protect) \"Brand\""
        );
    }
}
