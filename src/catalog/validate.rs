//! Ordered constraint checks run before any table mutation commits.
//!
//! Rules are evaluated in a fixed order and the first failure wins, so a
//! rejected insert always carries one specific diagnosis:
//!
//! 1. `NOT NULL` on the name column
//! 2. `NOT NULL` on `energy_type` (models only)
//! 3. primary key not already present
//! 4. name not already present
//! 5. foreign key `series_id` (models only)
//! 6. `CHECK (price > 0)` (models only)
//! 7. at least one technology (strict model path only)
//! 8. every referenced technology exists (strict models and associations)
//!
//! Validation only reads the tables; nothing here mutates state.

use crate::catalog::rows::{Model, Series, Tech};
use crate::catalog::tables::Tables;
use crate::types::{ConstraintError, Result, TableKind, TechId};

/// Which model insertion entry point is being validated.
#[derive(Clone, Copy, Debug)]
pub enum ModelPath<'a> {
    /// Model plus its technologies in one step; at least one is required.
    Strict(&'a [TechId]),
    /// Model alone; associations are bound later.
    Deferred,
}

/// Checks a series insert.
pub fn check_series(tables: &Tables, series: &Series) -> Result<()> {
    check_leaf(
        tables,
        TableKind::Series,
        "series_name",
        series.id,
        &series.name,
    )
}

/// Checks a tech insert.
pub fn check_tech(tables: &Tables, tech: &Tech) -> Result<()> {
    check_leaf(tables, TableKind::Tech, "tech_name", tech.id, &tech.name)
}

fn check_leaf(
    tables: &Tables,
    table: TableKind,
    name_column: &'static str,
    id: i64,
    name: &str,
) -> Result<()> {
    if name.is_empty() {
        return Err(ConstraintError::NotNull {
            table,
            column: name_column,
        });
    }
    if tables.contains_id(table, id) {
        return Err(ConstraintError::PrimaryKeyExists { table, id });
    }
    if tables.exists_name(table, name) {
        return Err(ConstraintError::UniqueViolation {
            table,
            column: name_column,
            value: name.to_string(),
        });
    }
    Ok(())
}

/// Checks a model insert along the given path.
pub fn check_model(tables: &Tables, model: &Model, path: ModelPath<'_>) -> Result<()> {
    let table = TableKind::Model;
    if model.name.is_empty() {
        return Err(ConstraintError::NotNull {
            table,
            column: "model_name",
        });
    }
    if model.energy_type.is_empty() {
        return Err(ConstraintError::NotNull {
            table,
            column: "energy_type",
        });
    }
    if tables.contains_id(table, model.id) {
        return Err(ConstraintError::PrimaryKeyExists {
            table,
            id: model.id,
        });
    }
    if tables.exists_name(table, &model.name) {
        return Err(ConstraintError::UniqueViolation {
            table,
            column: "model_name",
            value: model.name.clone(),
        });
    }
    if tables.series(model.series_id).is_none() {
        return Err(ConstraintError::ForeignKeyMissing {
            table,
            column: "series_id",
            target: TableKind::Series,
            id: model.series_id,
        });
    }
    if model.price.is_nan() || model.price <= 0.0 {
        return Err(ConstraintError::CheckFailed {
            table,
            constraint: "price > 0",
        });
    }
    if let ModelPath::Strict(tech_ids) = path {
        if tech_ids.is_empty() {
            return Err(ConstraintError::BusinessRuleViolation(format!(
                "model '{}' must reference at least one technology",
                model.name
            )));
        }
        check_tech_refs(tables, TableKind::Model, tech_ids)?;
    }
    Ok(())
}

/// Checks both ends of an association.
pub fn check_association(tables: &Tables, model_id: i64, tech_id: TechId) -> Result<()> {
    if tables.model(model_id).is_none() {
        return Err(ConstraintError::ForeignKeyMissing {
            table: TableKind::ModelTech,
            column: "model_id",
            target: TableKind::Model,
            id: model_id,
        });
    }
    check_tech_refs(tables, TableKind::ModelTech, &[tech_id])
}

fn check_tech_refs(tables: &Tables, table: TableKind, tech_ids: &[TechId]) -> Result<()> {
    match tech_ids.iter().find(|id| tables.tech(**id).is_none()) {
        Some(missing) => Err(ConstraintError::ForeignKeyMissing {
            table,
            column: "tech_id",
            target: TableKind::Tech,
            id: *missing,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstraintKind;

    fn seeded() -> Tables {
        let mut tables = Tables::default();
        tables.insert_series(Series::new(1, "王朝", "")).unwrap();
        tables.insert_tech(Tech::new(100, "刀片电池", "")).unwrap();
        tables
    }

    fn kind_of(result: Result<()>) -> ConstraintKind {
        result.expect_err("expected a violation").kind()
    }

    #[test]
    fn empty_name_wins_over_every_other_rule() {
        let tables = seeded();
        // Also a duplicate id, missing series and a bad price.
        let model = Model::new(1, "", 42, -1.0, "");
        assert_eq!(
            check_model(&tables, &model, ModelPath::Strict(&[])),
            Err(ConstraintError::NotNull {
                table: TableKind::Model,
                column: "model_name"
            })
        );
    }

    #[test]
    fn energy_type_checked_before_primary_key() {
        let mut tables = seeded();
        tables
            .insert_model(Model::new(9001, "汉", 1, 20.0, "EV"), &[100])
            .unwrap();
        let model = Model::new(9001, "唐", 1, 20.0, "");
        let err = check_model(&tables, &model, ModelPath::Deferred).unwrap_err();
        assert_eq!(
            err,
            ConstraintError::NotNull {
                table: TableKind::Model,
                column: "energy_type"
            }
        );
    }

    #[test]
    fn rule_order_for_models() {
        let mut tables = seeded();
        tables
            .insert_model(Model::new(9001, "汉", 1, 20.0, "EV"), &[100])
            .unwrap();

        let dup_id = Model::new(9001, "唐", 7, 0.0, "EV");
        assert_eq!(
            kind_of(check_model(&tables, &dup_id, ModelPath::Strict(&[]))),
            ConstraintKind::PrimaryKeyExists
        );

        let dup_name = Model::new(9002, "汉", 7, 0.0, "EV");
        assert_eq!(
            kind_of(check_model(&tables, &dup_name, ModelPath::Strict(&[]))),
            ConstraintKind::UniqueViolation
        );

        let bad_series = Model::new(9002, "唐", 7, 0.0, "EV");
        assert_eq!(
            kind_of(check_model(&tables, &bad_series, ModelPath::Strict(&[]))),
            ConstraintKind::ForeignKeyMissing
        );

        let bad_price = Model::new(9002, "唐", 1, 0.0, "EV");
        assert_eq!(
            kind_of(check_model(&tables, &bad_price, ModelPath::Strict(&[]))),
            ConstraintKind::CheckFailed
        );

        let no_techs = Model::new(9002, "唐", 1, 18.0, "DM-i");
        assert_eq!(
            kind_of(check_model(&tables, &no_techs, ModelPath::Strict(&[]))),
            ConstraintKind::BusinessRuleViolation
        );
        assert!(check_model(&tables, &no_techs, ModelPath::Deferred).is_ok());

        let err = check_model(&tables, &no_techs, ModelPath::Strict(&[100, 555, 556])).unwrap_err();
        assert_eq!(
            err,
            ConstraintError::ForeignKeyMissing {
                table: TableKind::Model,
                column: "tech_id",
                target: TableKind::Tech,
                id: 555
            }
        );
    }

    #[test]
    fn nan_price_fails_check() {
        let tables = seeded();
        let model = Model::new(9001, "汉", 1, f64::NAN, "EV");
        assert_eq!(
            kind_of(check_model(&tables, &model, ModelPath::Deferred)),
            ConstraintKind::CheckFailed
        );
    }

    #[test]
    fn leaf_rules_apply_to_series_and_techs() {
        let tables = seeded();
        assert_eq!(
            kind_of(check_series(&tables, &Series::new(2, "", ""))),
            ConstraintKind::NotNull
        );
        assert_eq!(
            kind_of(check_series(&tables, &Series::new(1, "海洋", ""))),
            ConstraintKind::PrimaryKeyExists
        );
        assert_eq!(
            kind_of(check_tech(&tables, &Tech::new(101, "刀片电池", ""))),
            ConstraintKind::UniqueViolation
        );
        assert!(check_tech(&tables, &Tech::new(101, "DM-i 超级混动", "")).is_ok());
    }

    #[test]
    fn association_requires_both_ends() {
        let tables = seeded();
        let err = check_association(&tables, 9001, 100).unwrap_err();
        assert!(matches!(
            err,
            ConstraintError::ForeignKeyMissing {
                column: "model_id",
                ..
            }
        ));
    }
}
