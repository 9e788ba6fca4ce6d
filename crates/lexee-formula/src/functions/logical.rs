//! Logical formulas: conditionals, switches and sandboxed expressions

use super::{opt, req, round, FormulaDef};
use crate::context::FormulaContext;
use crate::expr::{self, Sandbox};
use crate::schema::{Category, VariableKind as Kind};
use crate::variables::{ResultMap, Variables};
use lexee_core::{FormulaError, FormulaResult, Value};
use std::collections::BTreeMap;

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "si",
        name: "SI (multi-conditions)",
        description: "Premier résultat dont la condition est vraie",
        category: Category::Logique,
        variables: &[
            req("valeur", "Valeur testée", Kind::Number, "85"),
            req(
                "conditions",
                "Conditions (JSON)",
                Kind::List,
                r#"[{"operateur":">=","seuil":90,"resultat":"A"}]"#,
            ),
            opt("defaut", "Valeur par défaut", Kind::Any, "Néant"),
        ],
        implementation: fn_si,
        random: false,
    },
    FormulaDef {
        id: "si_erreur",
        name: "SIERREUR",
        description: "Valeur de repli si le calcul échoue",
        category: Category::Logique,
        variables: &[
            req("expression", "Expression numérique", Kind::Text, "100 / 0"),
            opt("valeur_si_erreur", "Valeur si erreur", Kind::Any, "#ERREUR"),
        ],
        implementation: fn_si_erreur,
        random: false,
    },
    FormulaDef {
        id: "et_ou",
        name: "ET / OU / OUX",
        description: "Combinaisons logiques d'une liste de conditions",
        category: Category::Logique,
        variables: &[req("conditions", "Conditions", Kind::List, "[true, false, true]")],
        implementation: fn_et_ou,
        random: false,
    },
    FormulaDef {
        id: "changer",
        name: "SI.MULTIPLE",
        description: "Résultat associé à la première valeur égale",
        category: Category::Logique,
        variables: &[
            req("expression", "Valeur testée", Kind::Any, "B"),
            req("cas", "Cas (JSON)", Kind::List, r#"[{"valeur":"A","resultat":"Alpha"}]"#),
            opt("defaut", "Valeur par défaut", Kind::Any, ""),
        ],
        implementation: fn_changer,
        random: false,
    },
    FormulaDef {
        id: "exact",
        name: "EXACT",
        description: "Comparer deux textes",
        category: Category::Logique,
        variables: &[
            req("texte1", "Texte 1", Kind::Text, "Excel"),
            req("texte2", "Texte 2", Kind::Text, "excel"),
        ],
        implementation: fn_exact,
        random: false,
    },
    FormulaDef {
        id: "let_lambda",
        name: "LET / LAMBDA",
        description: "Évaluer une expression avec des variables nommées",
        category: Category::Logique,
        variables: &[
            req("variables", "Variables (JSON)", Kind::Map, r#"{"prix":100,"taxe":0.2}"#),
            req("expression", "Expression", Kind::Text, "prix * (1 + taxe)"),
        ],
        implementation: fn_let_lambda,
        random: false,
    },
    FormulaDef {
        id: "let_advanced",
        name: "LET (étapes)",
        description: "Calcul en étapes nommées puis expression finale",
        category: Category::Logique,
        variables: &[
            req("variables", "Variables (JSON)", Kind::Map, r#"{"a":10,"b":20}"#),
            req("etapes", "Étapes (JSON)", Kind::List, r#"[{"nom":"c","expression":"a + b"}]"#),
            req("expression_finale", "Expression finale", Kind::Text, "c * 2"),
        ],
        implementation: fn_let_advanced,
        random: false,
    },
    FormulaDef {
        id: "lambda_recursive",
        name: "LAMBDA récursive",
        description: "Appliquer une expression en x de façon répétée",
        category: Category::Logique,
        variables: &[
            req("expression", "Expression en x", Kind::Text, "x * 2"),
            req("valeur_initiale", "Valeur initiale", Kind::Number, "1"),
            req("iterations", "Itérations (1-1000)", Kind::Number, "5"),
        ],
        implementation: fn_lambda_recursive,
        random: false,
    },
    FormulaDef {
        id: "choose",
        name: "CHOISIR",
        description: "Valeur à une position donnée (base 1)",
        category: Category::Logique,
        variables: &[
            req("index", "Index", Kind::Number, "2"),
            req("valeurs", "Valeurs", Kind::List, r#"["a", "b", "c"]"#),
        ],
        implementation: fn_choose,
        random: false,
    },
];

/// Comparison operator of a `si` condition
fn compare(op: &str, value: f64, threshold: f64) -> FormulaResult<bool> {
    Ok(match op {
        "==" => value == threshold,
        "!=" => value != threshold,
        ">" => value > threshold,
        ">=" => value >= threshold,
        "<" => value < threshold,
        "<=" => value <= threshold,
        other => return Err(FormulaError::domain(format!("unknown operator '{}'", other))),
    })
}

/// SI
fn fn_si(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let value = v.number("valeur")?;
    let conditions = v.list("conditions")?;

    for (i, item) in conditions.iter().enumerate() {
        let name = format!("conditions[{}]", i);
        let condition = item
            .as_map()
            .ok_or_else(|| FormulaError::invalid_type(&name, "a condition map", item.type_name()))?;
        let op = field(condition, &name, "operateur")?
            .as_text()
            .unwrap_or_default();
        let threshold_value = field(condition, &name, "seuil")?;
        let threshold = threshold_value.as_number().ok_or_else(|| {
            FormulaError::invalid_type(format!("{}.seuil", name), "a number", threshold_value.type_name())
        })?;

        if compare(op.trim(), value, threshold)? {
            let result = condition.get("resultat").cloned().unwrap_or_default();
            return Ok(ResultMap::new()
                .with("resultat", result)
                .with("condition_matchee", item.clone()));
        }
    }

    let fallback = v.get("defaut").cloned().unwrap_or_else(|| Value::from("Néant"));
    Ok(ResultMap::new()
        .with("resultat", fallback)
        .with("condition_matchee", Value::Null))
}

fn field<'a>(map: &'a BTreeMap<String, Value>, name: &str, key: &str) -> FormulaResult<&'a Value> {
    map.get(key)
        .ok_or_else(|| FormulaError::missing(format!("{}.{}", name, key)))
}

/// SIERREUR
///
/// Only numbers, operators and parentheses are evaluated. Any failure,
/// rejected tokens included, yields the fallback value.
fn fn_si_erreur(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let text = v.text("expression")?;
    match expr::evaluate_literal(&text) {
        Ok(value) => Ok(ResultMap::new()
            .with("resultat", Value::compact(round(value, 10)))
            .with("erreur", false)),
        Err(err) => {
            log::debug!("si_erreur fallback: {}", err);
            let fallback = v
                .get("valeur_si_erreur")
                .cloned()
                .unwrap_or_else(|| Value::from("#ERREUR"));
            Ok(ResultMap::new().with("resultat", fallback).with("erreur", true))
        }
    }
}

/// ET / OU / OUX
fn fn_et_ou(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let flags = v
        .list("conditions")?
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_bool().ok_or_else(|| {
                FormulaError::invalid_type(format!("conditions[{}]", i), "a boolean", item.type_name())
            })
        })
        .collect::<FormulaResult<Vec<bool>>>()?;
    if flags.is_empty() {
        return Err(FormulaError::domain("at least one condition is required"));
    }

    let trues = flags.iter().filter(|&&b| b).count();
    Ok(ResultMap::new()
        .with("et", trues == flags.len())
        .with("ou", trues > 0)
        .with("ou_exclusif", trues % 2 == 1)
        .with("nb_vrais", trues))
}

/// SI.MULTIPLE (SWITCH)
fn fn_changer(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let needle = v.value("expression")?.render();
    let cases = v.list("cas")?;

    for (i, item) in cases.iter().enumerate() {
        let name = format!("cas[{}]", i);
        let case = item
            .as_map()
            .ok_or_else(|| FormulaError::invalid_type(&name, "a case map", item.type_name()))?;
        let candidate = field(case, &name, "valeur")?;
        if candidate.render() == needle {
            return Ok(ResultMap::new()
                .with("resultat", case.get("resultat").cloned().unwrap_or_default())
                .with("cas_matche", candidate.clone()));
        }
    }

    Ok(ResultMap::new()
        .with("resultat", v.get("defaut").cloned().unwrap_or_default())
        .with("cas_matche", Value::Null))
}

/// EXACT
fn fn_exact(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let a = v.text("texte1")?;
    let b = v.text("texte2")?;
    Ok(ResultMap::new()
        .with("identique", a == b)
        .with("identique_sans_casse", a.to_lowercase() == b.to_lowercase()))
}

/// Sandbox with every entry of the `variables` map bound
fn sandbox_from(v: &Variables) -> FormulaResult<Sandbox> {
    let mut sandbox = Sandbox::new();
    for (name, value) in v.map("variables")? {
        let n = value.as_number().ok_or_else(|| {
            FormulaError::invalid_type(format!("variables.{}", name), "a number", value.type_name())
        })?;
        sandbox.bind(name, n)?;
    }
    Ok(sandbox)
}

/// LET / LAMBDA
fn fn_let_lambda(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let sandbox = sandbox_from(v)?;
    let result = sandbox.evaluate(&v.text("expression")?)?;
    let names: Vec<String> = sandbox.names().map(str::to_string).collect();
    Ok(ResultMap::new()
        .with("resultat", round(result, 10))
        .with("variables_utilisees", names))
}

/// LET with named steps
fn fn_let_advanced(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let sandbox = sandbox_from(v)?;

    let mut steps = Vec::new();
    for (i, item) in v.list("etapes")?.iter().enumerate() {
        let name = format!("etapes[{}]", i);
        let step = item
            .as_map()
            .ok_or_else(|| FormulaError::invalid_type(&name, "a step map", item.type_name()))?;
        let text_of = |key: &str| -> FormulaResult<String> {
            let value = field(step, &name, key)?;
            value.as_text().ok_or_else(|| {
                FormulaError::invalid_type(format!("{}.{}", name, key), "text", value.type_name())
            })
        };
        steps.push((text_of("nom")?, text_of("expression")?));
    }

    let (result, computed) = expr::evaluate_steps(sandbox, &steps, &v.text("expression_finale")?)?;
    let values: BTreeMap<String, Value> = computed
        .into_iter()
        .map(|(name, value)| (name, Value::from(round(value, 10))))
        .collect();

    Ok(ResultMap::new()
        .with("resultat", round(result, 10))
        .with("etapes", values))
}

/// Recursive LAMBDA
fn fn_lambda_recursive(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let text = v.text("expression")?;
    let initial = v.number("valeur_initiale")?;
    let iterations = usize::try_from(v.integer("iterations")?).unwrap_or(0);

    let outcome = expr::iterate(&text, initial, iterations)?;
    let history: Vec<f64> = outcome.history.iter().map(|x| round(*x, 10)).collect();
    Ok(ResultMap::new()
        .with("resultat_final", round(outcome.value, 10))
        .with("iterations", iterations)
        .with("historique", history))
}

/// CHOISIR
fn fn_choose(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let index = v.integer("index")?;
    let values = v.list("valeurs")?;
    let chosen = usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| values.get(i))
        .ok_or_else(|| {
            FormulaError::domain(format!(
                "index {} is out of range (1 to {})",
                index,
                values.len()
            ))
        })?;
    Ok(ResultMap::new()
        .with("resultat", chosen.clone())
        .with("index", index))
}
