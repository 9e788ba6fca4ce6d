//! Property tests run through `dispatch`

use lexee_formula::{dispatch, FormulaError, ResultMap, Value, VariableMap};
use proptest::prelude::*;
use serde_json::json;

fn vars(input: serde_json::Value) -> VariableMap {
    match Value::from(input) {
        Value::Map(map) => map,
        _ => VariableMap::new(),
    }
}

fn number(r: &ResultMap, key: &str) -> f64 {
    r.get(key).and_then(Value::as_number).unwrap_or(f64::NAN)
}

fn grid(r: &ResultMap, key: &str) -> Vec<Vec<f64>> {
    r.get(key)
        .and_then(Value::as_list)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_list()
                        .map(|cells| cells.iter().filter_map(Value::as_number).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Strictly diagonally dominant, hence invertible
fn invertible_matrix() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1usize..7).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(-10.0f64..10.0, n), n).prop_map(
            move |mut rows| {
                for (i, row) in rows.iter_mut().enumerate() {
                    let off_diagonal: f64 = row.iter().map(|x| x.abs()).sum();
                    row[i] = off_diagonal + 1.0;
                }
                rows
            },
        )
    })
}

proptest! {
    #[test]
    fn prop_inverse_times_matrix_is_identity(m in invertible_matrix()) {
        let inverse = dispatch("matrice_inverse", &vars(json!({ "matrice": m.clone() }))).unwrap();
        let product = dispatch(
            "produitmat",
            &vars(json!({ "matrice_a": grid(&inverse, "resultat"), "matrice_b": m.clone() })),
        )
        .unwrap();
        let cells = grid(&product, "resultat");
        for (i, row) in cells.iter().enumerate() {
            for (j, x) in row.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                prop_assert!((x - expected).abs() < 1e-6, "cell ({}, {}) = {}", i, j, x);
            }
        }

        let det = dispatch("determinant", &vars(json!({ "matrice": m }))).unwrap();
        prop_assert!(number(&det, "determinant") != 0.0);
    }

    #[test]
    fn prop_schedule_parts_add_up_to_payments(
        rate_pct in 0.05f64..2.0,
        nper in 1i64..60,
        pv in 1_000.0f64..500_000.0,
    ) {
        let mut interest = 0.0;
        let mut principal = 0.0;
        for period in 1..=nper {
            let input = json!({
                "taux_periodique": rate_pct, "periode": period,
                "nb_periodes": nper, "valeur_actuelle": pv,
            });
            interest += number(&dispatch("intper", &vars(input.clone())).unwrap(), "interets");
            principal += number(&dispatch("princper", &vars(input)).unwrap(), "principal");
        }
        let range = json!({
            "taux_periodique": rate_pct, "nb_periodes": nper, "valeur_actuelle": pv,
            "periode_debut": 1, "periode_fin": nper,
        });
        let total_interest = number(&dispatch("cumul_inter", &vars(range.clone())).unwrap(), "cumul_interets");
        let total_principal = number(&dispatch("cumul_princ", &vars(range)).unwrap(), "cumul_principal");

        // Each reported part is rounded to the cent
        let tolerance = 0.01 * nper as f64 + 0.01;
        prop_assert!((interest - total_interest).abs() <= tolerance);
        prop_assert!((principal - total_principal).abs() <= tolerance);
        prop_assert!((total_principal + pv).abs() <= 0.01);
    }

    #[test]
    fn prop_irr_zeroes_the_npv(
        inflows in proptest::collection::vec(100.0f64..50_000.0, 1..8),
        recovered in 0.05f64..1.0,
    ) {
        // Inflows repay the outlay, so a non-negative rate exists
        let outlay = recovered * inflows.iter().sum::<f64>();
        let mut flows = vec![-outlay];
        flows.extend(inflows);

        let result = dispatch("tri", &vars(json!({ "flux": flows.clone() })));
        prop_assert!(result.is_ok(), "tri failed for {:?}: {:?}", flows, result);
        let r = result.unwrap();
        let irr = number(&r, "tri_decimal");
        let residual: f64 = flows
            .iter()
            .enumerate()
            .map(|(i, cf)| cf / (1.0 + irr).powi(i as i32))
            .sum();
        let scale: f64 = flows.iter().map(|cf| cf.abs()).sum();
        // tri_decimal is rounded to 8 decimals
        prop_assert!(residual.abs() < 1e-5 * scale, "residual {}", residual);
    }

    #[test]
    fn prop_unbound_identifier_is_rejected(name in "[a-z_][a-z0-9_]{0,12}") {
        let reserved = ["abs", "round", "min", "max", "sum", "pow", "sqrt", "log", "log10", "ceil", "floor", "pi", "e", "x"];
        prop_assume!(!reserved.contains(&name.as_str()));

        let expression = format!("x + {}", name);
        let err = dispatch(
            "let_lambda",
            &vars(json!({"variables": {"x": 1}, "expression": expression.clone()})),
        )
        .unwrap_err();
        prop_assert_eq!(err, FormulaError::UnsafeToken { token: name.clone() });

        // Binding the name makes the same text valid
        let mut bindings = serde_json::Map::new();
        bindings.insert("x".to_string(), json!(1));
        bindings.insert(name.clone(), json!(2));
        let r = dispatch(
            "let_lambda",
            &vars(json!({"variables": bindings, "expression": expression})),
        )
        .unwrap();
        prop_assert_eq!(number(&r, "resultat"), 3.0);
    }

    #[test]
    fn prop_statistics_are_idempotent(values in proptest::collection::vec(-1e6f64..1e6, 1..40)) {
        let input = vars(json!({ "valeurs": values }));
        let first = dispatch("somme_moyenne", &input).unwrap();
        let second = dispatch("somme_moyenne", &input).unwrap();
        prop_assert_eq!(first, second);
    }
}
