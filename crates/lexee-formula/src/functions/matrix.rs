//! Matrix formulas (Ingénierie)

use super::{req, round, FormulaDef};
use crate::context::FormulaContext;
use crate::expr;
use crate::numeric;
use crate::schema::{Category, VariableKind as Kind, VariableSpec};
use crate::solvers::linalg::Matrix;
use crate::variables::{ResultMap, Variables};
use lexee_core::{FormulaError, FormulaResult, Value};

const REDUCE_VARIABLES: &[VariableSpec] = &[
    req("matrice", "Matrice", Kind::Matrix, "[[1, 2, 3], [4, 5, 6]]"),
    req(
        "operation",
        "Opération (somme, moyenne, max, min, produit, count)",
        Kind::Text,
        "somme",
    ),
];

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "transpose",
        name: "TRANSPOSE",
        description: "Transposer une matrice",
        category: Category::Ingenierie,
        variables: &[req("matrice", "Matrice", Kind::Matrix, "[[1, 2, 3], [4, 5, 6]]")],
        implementation: fn_transpose,
        random: false,
    },
    FormulaDef {
        id: "produitmat",
        name: "PRODUITMAT",
        description: "Produit de deux matrices",
        category: Category::Ingenierie,
        variables: &[
            req("matrice_a", "Matrice A", Kind::Matrix, "[[1, 2], [3, 4]]"),
            req("matrice_b", "Matrice B", Kind::Matrix, "[[5, 6], [7, 8]]"),
        ],
        implementation: fn_produitmat,
        random: false,
    },
    FormulaDef {
        id: "matrice_inverse",
        name: "INVERSEMAT",
        description: "Inverse d'une matrice carrée",
        category: Category::Ingenierie,
        variables: &[req("matrice", "Matrice carrée", Kind::Matrix, "[[1, 2], [3, 4]]")],
        implementation: fn_matrice_inverse,
        random: false,
    },
    FormulaDef {
        id: "determinant",
        name: "DETERMAT",
        description: "Déterminant d'une matrice carrée",
        category: Category::Ingenierie,
        variables: &[req("matrice", "Matrice carrée", Kind::Matrix, "[[1, 2], [3, 4]]")],
        implementation: fn_determinant,
        random: false,
    },
    FormulaDef {
        id: "byrow",
        name: "BYROW",
        description: "Réduire chaque ligne d'une matrice",
        category: Category::Ingenierie,
        variables: REDUCE_VARIABLES,
        implementation: fn_byrow,
        random: false,
    },
    FormulaDef {
        id: "bycol",
        name: "BYCOL",
        description: "Réduire chaque colonne d'une matrice",
        category: Category::Ingenierie,
        variables: REDUCE_VARIABLES,
        implementation: fn_bycol,
        random: false,
    },
    FormulaDef {
        id: "makearray",
        name: "MAKEARRAY",
        description: "Générer une matrice à partir d'une expression en row et col",
        category: Category::Ingenierie,
        variables: &[
            req("lignes", "Lignes", Kind::Number, "3"),
            req("colonnes", "Colonnes", Kind::Number, "3"),
            req("expression", "Expression", Kind::Text, "row * colonnes + col + 1"),
        ],
        implementation: fn_makearray,
        random: false,
    },
];

fn matrix_arg(v: &Variables, name: &str) -> FormulaResult<Matrix> {
    Matrix::from_rows(&v.matrix(name)?)
}

/// TRANSPOSE
fn fn_transpose(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let t = matrix_arg(v, "matrice")?.transpose();
    Ok(ResultMap::new()
        .with("dimensions", t.dimensions())
        .with("resultat", t.to_rows()))
}

/// PRODUITMAT (MMULT)
fn fn_produitmat(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let product = matrix_arg(v, "matrice_a")?.mul(&matrix_arg(v, "matrice_b")?)?;
    Ok(ResultMap::new()
        .with("dimensions", product.dimensions())
        .with("resultat", product.to_rows()))
}

/// INVERSEMAT (MINVERSE)
fn fn_matrice_inverse(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let m = matrix_arg(v, "matrice")?;
    let inverse = m.inverse()?;
    let cells: Vec<Vec<f64>> = inverse
        .to_rows()
        .into_iter()
        .map(|row| row.into_iter().map(|x| round(x, 10)).collect())
        .collect();
    Ok(ResultMap::new()
        .with("resultat", cells)
        .with("determinant", round(m.determinant()?, 10)))
}

/// DETERMAT (MDETERM); singular input yields 0.0
fn fn_determinant(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let m = matrix_arg(v, "matrice")?;
    Ok(ResultMap::new()
        .with("determinant", round(m.determinant()?, 10))
        .with("dimensions", m.dimensions()))
}

/// Reductions available to BYROW and BYCOL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reduction {
    Sum,
    Mean,
    Max,
    Min,
    Product,
    Count,
}

impl Reduction {
    fn parse(name: &str) -> FormulaResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "somme" | "sum" => Ok(Self::Sum),
            "moyenne" | "average" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "produit" | "product" => Ok(Self::Product),
            "count" | "nb" => Ok(Self::Count),
            other => Err(FormulaError::domain(format!(
                "unknown operation '{}' (somme, moyenne, max, min, produit, count)",
                other
            ))),
        }
    }

    fn apply(self, values: &[f64]) -> FormulaResult<f64> {
        let value = match self {
            Self::Sum => values.iter().sum(),
            Self::Mean => numeric::mean(values)?,
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Product => values.iter().product(),
            Self::Count => values.len() as f64,
        };
        Ok(round(value, 10))
    }
}

fn reduce_rows(rows: &[Vec<f64>], op: Reduction) -> FormulaResult<Vec<f64>> {
    rows.iter().map(|row| op.apply(row)).collect()
}

/// BYROW
fn fn_byrow(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let op = Reduction::parse(&v.text("operation")?)?;
    let m = matrix_arg(v, "matrice")?;
    Ok(ResultMap::new().with("resultat", reduce_rows(&m.to_rows(), op)?))
}

/// BYCOL
fn fn_bycol(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let op = Reduction::parse(&v.text("operation")?)?;
    let m = matrix_arg(v, "matrice")?;
    Ok(ResultMap::new().with("resultat", reduce_rows(&m.transpose().to_rows(), op)?))
}

/// MAKEARRAY; `row` and `col` are 0-based
fn fn_makearray(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let dimension = |name: &str| -> FormulaResult<usize> {
        usize::try_from(v.integer(name)?)
            .map_err(|_| FormulaError::domain(format!("'{}' must not be negative", name)))
    };
    let rows = dimension("lignes")?;
    let cols = dimension("colonnes")?;
    let grid = expr::generate_grid(rows, cols, &v.text("expression")?)?;

    let cells: Vec<Value> = grid
        .into_iter()
        .map(|line| {
            Value::List(
                line.into_iter()
                    .map(|x| Value::compact(round(x, 10)))
                    .collect(),
            )
        })
        .collect();
    Ok(ResultMap::new()
        .with("resultat", cells)
        .with("dimensions", format!("{}x{}", rows, cols)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::{num, run};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn grid(r: &ResultMap) -> Value {
        r.get("resultat").cloned().unwrap_or(Value::Null)
    }

    #[test]
    fn test_transpose() {
        let r = run(fn_transpose, json!({"matrice": [[1, 2, 3], [4, 5, 6]]})).unwrap();
        assert_eq!(grid(&r), Value::from(vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]));
        assert_eq!(r.get("dimensions"), Some(&Value::from("3x2")));

        let r = run(fn_transpose, json!({"matrice": [1, 2, 3]})).unwrap();
        assert_eq!(grid(&r), Value::from(vec![vec![1.0], vec![2.0], vec![3.0]]));
    }

    #[test]
    fn test_produitmat() {
        let r = run(
            fn_produitmat,
            json!({"matrice_a": [[1, 2], [3, 4]], "matrice_b": [[5, 6], [7, 8]]}),
        )
        .unwrap();
        assert_eq!(grid(&r), Value::from(vec![vec![19.0, 22.0], vec![43.0, 50.0]]));

        let err = run(fn_produitmat, json!({"matrice_a": [[1, 2]], "matrice_b": [[1, 2]]})).unwrap_err();
        assert!(matches!(err, FormulaError::Shape(_)));
    }

    #[test]
    fn test_matrice_inverse() {
        let r = run(fn_matrice_inverse, json!({"matrice": [[1, 2], [3, 4]]})).unwrap();
        assert_eq!(grid(&r), Value::from(vec![vec![-2.0, 1.0], vec![1.5, -0.5]]));
        assert_eq!(num(&r, "determinant"), -2.0);

        let err = run(fn_matrice_inverse, json!({"matrice": [[1, 2], [2, 4]]})).unwrap_err();
        assert!(matches!(err, FormulaError::SingularMatrix));
        assert!(run(fn_matrice_inverse, json!({"matrice": [[1, 2, 3], [4, 5, 6]]})).is_err());
    }

    #[test]
    fn test_determinant() {
        let det = |m: serde_json::Value| num(&run(fn_determinant, json!({ "matrice": m })).unwrap(), "determinant");
        assert_eq!(det(json!([[1, 2], [3, 4]])), -2.0);
        assert_eq!(det(json!([[1, 2, 3], [4, 5, 6], [7, 8, 0]])), 27.0);
        assert_eq!(det(json!([[1, 2], [2, 4]])), 0.0);
    }

    #[test]
    fn test_byrow_bycol() {
        let r = run(fn_byrow, json!({"matrice": [[1, 2, 3], [4, 5, 6]], "operation": "somme"})).unwrap();
        assert_eq!(grid(&r), Value::from(vec![6.0, 15.0]));
        let r = run(fn_byrow, json!({"matrice": [[10, 20], [5, 30]], "operation": "max"})).unwrap();
        assert_eq!(grid(&r), Value::from(vec![20.0, 30.0]));
        let r = run(fn_bycol, json!({"matrice": [[1, 2], [3, 4], [5, 6]], "operation": "somme"})).unwrap();
        assert_eq!(grid(&r), Value::from(vec![9.0, 12.0]));
        let r = run(fn_bycol, json!({"matrice": [[10, 20], [30, 40]], "operation": "moyenne"})).unwrap();
        assert_eq!(grid(&r), Value::from(vec![20.0, 30.0]));
        assert!(run(fn_byrow, json!({"matrice": [[1, 2]], "operation": "invalid"})).is_err());
    }

    #[test]
    fn test_makearray() {
        let r = run(
            fn_makearray,
            json!({"lignes": 2, "colonnes": 3, "expression": "row * 3 + col + 1"}),
        )
        .unwrap();
        assert_eq!(grid(&r), Value::from(vec![vec![1, 2, 3], vec![4, 5, 6]]));
        assert_eq!(r.get("dimensions"), Some(&Value::from("2x3")));

        let err = run(fn_makearray, json!({"lignes": 1000, "colonnes": 101, "expression": "1"})).unwrap_err();
        assert!(matches!(err, FormulaError::Domain(_)));
        let err = run(
            fn_makearray,
            json!({"lignes": 2, "colonnes": 2, "expression": "__import__('os')"}),
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::UnsafeToken { .. }));
    }
}
