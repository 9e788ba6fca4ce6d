//! Database functions (BD*): aggregates over one field of the rows matching criteria

use super::{req, round, FormulaDef};
use crate::context::FormulaContext;
use crate::criteria::matches_all;
use crate::numeric;
use crate::schema::{Category, VariableKind as Kind, VariableSpec};
use crate::variables::{ResultMap, Variables};
use lexee_core::{FormulaError, FormulaResult};

const DATABASE_VARIABLES: &[VariableSpec] = &[
    req(
        "donnees",
        "Base de données (table JSON)",
        Kind::Table,
        r#"[{"nom":"Alice","departement":"IT","salaire":50000}]"#,
    ),
    req("champ", "Champ", Kind::Text, "salaire"),
    req(
        "criteres",
        "Critères (JSON)",
        Kind::List,
        r#"[{"colonne":"departement","valeur":"IT"}]"#,
    ),
];

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "bdsomme",
        name: "BDSOMME",
        description: "Somme d'un champ pour les enregistrements correspondants",
        category: Category::GestionDonnees,
        variables: DATABASE_VARIABLES,
        implementation: fn_bdsomme,
        random: false,
    },
    FormulaDef {
        id: "bdnb",
        name: "BDNB",
        description: "Nombre de valeurs numériques d'un champ pour les enregistrements correspondants",
        category: Category::GestionDonnees,
        variables: DATABASE_VARIABLES,
        implementation: fn_bdnb,
        random: false,
    },
    FormulaDef {
        id: "bdmax",
        name: "BDMAX",
        description: "Maximum d'un champ pour les enregistrements correspondants",
        category: Category::GestionDonnees,
        variables: DATABASE_VARIABLES,
        implementation: fn_bdmax,
        random: false,
    },
    FormulaDef {
        id: "bdmin",
        name: "BDMIN",
        description: "Minimum d'un champ pour les enregistrements correspondants",
        category: Category::GestionDonnees,
        variables: DATABASE_VARIABLES,
        implementation: fn_bdmin,
        random: false,
    },
    FormulaDef {
        id: "bdmoyenne",
        name: "BDMOYENNE",
        description: "Moyenne d'un champ pour les enregistrements correspondants",
        category: Category::GestionDonnees,
        variables: DATABASE_VARIABLES,
        implementation: fn_bdmoyenne,
        random: false,
    },
];

/// Records matching the criteria, and the numeric values of the field among them
struct Selection {
    rows: usize,
    values: Vec<f64>,
}

impl Selection {
    fn read(v: &Variables) -> FormulaResult<Self> {
        let table = v.table("donnees")?;
        let field = v.text("champ")?;
        let criteria = v.criteria("criteres")?;

        let matched: Vec<_> = table
            .into_iter()
            .filter(|row| matches_all(row, &criteria))
            .collect();
        let values = matched
            .iter()
            .filter_map(|row| row.get(&field))
            .filter_map(|cell| cell.as_number())
            .collect();

        Ok(Self {
            rows: matched.len(),
            values,
        })
    }

    fn require_values(&self) -> FormulaResult<&[f64]> {
        if self.values.is_empty() {
            Err(FormulaError::domain("no record matches the criteria"))
        } else {
            Ok(&self.values)
        }
    }
}

/// BDSOMME
fn fn_bdsomme(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let selection = Selection::read(v)?;
    Ok(ResultMap::new()
        .with("somme", round(selection.values.iter().sum(), 6))
        .with("lignes", selection.rows))
}

/// BDNB
fn fn_bdnb(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let selection = Selection::read(v)?;
    Ok(ResultMap::new().with("count", selection.values.len()))
}

/// BDMAX
fn fn_bdmax(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let selection = Selection::read(v)?;
    let max = selection
        .require_values()?
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    Ok(ResultMap::new().with("max", max).with("lignes", selection.rows))
}

/// BDMIN
fn fn_bdmin(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let selection = Selection::read(v)?;
    let min = selection
        .require_values()?
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    Ok(ResultMap::new().with("min", min).with("lignes", selection.rows))
}

/// BDMOYENNE
fn fn_bdmoyenne(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let selection = Selection::read(v)?;
    let mean = numeric::mean(selection.require_values()?)?;
    Ok(ResultMap::new()
        .with("moyenne", round(mean, 6))
        .with("lignes", selection.rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::{num, run};
    use lexee_core::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn query(department: &str) -> serde_json::Value {
        json!({
            "donnees": [
                {"nom": "Alice", "departement": "IT", "salaire": 50000},
                {"nom": "Bob", "departement": "IT", "salaire": 60000},
                {"nom": "Carol", "departement": "RH", "salaire": 45000},
                {"nom": "David", "departement": "IT", "salaire": 55000},
                {"nom": "Eve", "departement": "RH", "salaire": 48000},
            ],
            "champ": "salaire",
            "criteres": [{"colonne": "departement", "valeur": department}],
        })
    }

    #[test]
    fn test_bdsomme() {
        let r = run(fn_bdsomme, query("IT")).unwrap();
        assert_eq!(num(&r, "somme"), 165000.0);
        assert_eq!(r.get("lignes"), Some(&Value::Integer(3)));

        let r = run(fn_bdsomme, query("Finance")).unwrap();
        assert_eq!(num(&r, "somme"), 0.0);
        assert_eq!(r.get("lignes"), Some(&Value::Integer(0)));
    }

    #[test]
    fn test_bdnb() {
        let r = run(fn_bdnb, query("RH")).unwrap();
        assert_eq!(r.get("count"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_bdmax_bdmin() {
        assert_eq!(num(&run(fn_bdmax, query("IT")).unwrap(), "max"), 60000.0);
        assert_eq!(num(&run(fn_bdmin, query("IT")).unwrap(), "min"), 50000.0);
        let err = run(fn_bdmax, query("X")).unwrap_err();
        assert!(matches!(err, FormulaError::Domain(_)));
    }

    #[test]
    fn test_bdmoyenne() {
        let r = run(fn_bdmoyenne, query("RH")).unwrap();
        assert_eq!(num(&r, "moyenne"), 46500.0);
        assert_eq!(r.get("lignes"), Some(&Value::Integer(2)));
        assert!(run(fn_bdmoyenne, query("X")).is_err());
    }
}
