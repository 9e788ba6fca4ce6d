//! Statistical formulas

use super::{opt, req, round, FormulaDef};
use crate::context::FormulaContext;
use crate::criteria::matches_all;
use crate::numeric;
use crate::schema::{Category, VariableKind as Kind};
use crate::solvers::LinearFit;
use crate::variables::{ResultMap, Variables};
use lexee_core::{FormulaError, FormulaResult, Value};

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "nb_si_ens",
        name: "NB.SI.ENS",
        description: "Compter les lignes répondant à plusieurs critères",
        category: Category::Statistiques,
        variables: &[
            req("donnees", "Données (table JSON)", Kind::Table, r#"[{"client":"A","achats":5}]"#),
            req("criteres", "Critères (JSON)", Kind::List, r#"[{"colonne":"achats","valeur":"5"}]"#),
        ],
        implementation: fn_nb_si_ens,
        random: false,
    },
    FormulaDef {
        id: "max_si_ens",
        name: "MAX.SI.ENS",
        description: "Maximum conditionnel sur plusieurs critères",
        category: Category::Statistiques,
        variables: CONDITIONAL_VARIABLES,
        implementation: fn_max_si_ens,
        random: false,
    },
    FormulaDef {
        id: "min_si_ens",
        name: "MIN.SI.ENS",
        description: "Minimum conditionnel sur plusieurs critères",
        category: Category::Statistiques,
        variables: CONDITIONAL_VARIABLES,
        implementation: fn_min_si_ens,
        random: false,
    },
    FormulaDef {
        id: "rang_egal",
        name: "RANG.EGAL",
        description: "Rang d'un nombre dans une liste",
        category: Category::Statistiques,
        variables: &[
            req("nombre", "Nombre", Kind::Number, "85"),
            req("valeurs", "Valeurs", Kind::NumberList, "95, 85, 70, 60, 90"),
            opt("ordre", "Ordre (desc/asc)", Kind::Text, "desc"),
        ],
        implementation: fn_rang_egal,
        random: false,
    },
    FormulaDef {
        id: "mediane",
        name: "MEDIANE",
        description: "Valeur médiane d'une série",
        category: Category::Statistiques,
        variables: &[req("valeurs", "Valeurs", Kind::NumberList, "3, 1, 5, 2, 4")],
        implementation: fn_mediane,
        random: false,
    },
    FormulaDef {
        id: "agregat",
        name: "AGREGAT",
        description: "Agrégation ignorant les valeurs en erreur",
        category: Category::Statistiques,
        variables: &[
            req("valeurs", "Valeurs", Kind::List, r##"[10, 20, "#N/A", 30]"##),
            req("fonction", "Fonction (1-12)", Kind::Number, "9"),
        ],
        implementation: fn_agregat,
        random: false,
    },
    FormulaDef {
        id: "frequence",
        name: "FREQUENCE",
        description: "Distribution des valeurs par intervalles",
        category: Category::Statistiques,
        variables: &[
            req("donnees", "Données", Kind::NumberList, "10, 25, 35, 45, 55"),
            req("bornes", "Bornes", Kind::NumberList, "30, 60, 90"),
        ],
        implementation: fn_frequence,
        random: false,
    },
    FormulaDef {
        id: "prevision",
        name: "PREVISION.LINEAIRE",
        description: "Prévision par régression linéaire",
        category: Category::Statistiques,
        variables: &[
            req("x_cible", "X cible", Kind::Number, "6"),
            req("x_connus", "X connus", Kind::NumberList, "1, 2, 3, 4, 5"),
            req("y_connus", "Y connus", Kind::NumberList, "3, 5, 7, 9, 11"),
        ],
        implementation: fn_prevision,
        random: false,
    },
    FormulaDef {
        id: "correlation",
        name: "COEFFICIENT.CORRELATION",
        description: "Corrélation de Pearson entre deux séries",
        category: Category::StatistiquesAvancees,
        variables: XY_VARIABLES,
        implementation: fn_correlation,
        random: false,
    },
    FormulaDef {
        id: "pente",
        name: "PENTE",
        description: "Pente de la droite de régression",
        category: Category::StatistiquesAvancees,
        variables: XY_VARIABLES,
        implementation: fn_pente,
        random: false,
    },
    FormulaDef {
        id: "ordonnee_origine",
        name: "ORDONNEE.ORIGINE",
        description: "Ordonnée à l'origine de la droite de régression",
        category: Category::StatistiquesAvancees,
        variables: XY_VARIABLES,
        implementation: fn_ordonnee_origine,
        random: false,
    },
    FormulaDef {
        id: "ecart_type_p",
        name: "ECARTYPE.PEARSON",
        description: "Écart type d'une population (diviseur n)",
        category: Category::StatistiquesAvancees,
        variables: &[req("valeurs", "Valeurs", Kind::NumberList, "2, 4, 4, 4, 5, 5, 7, 9")],
        implementation: fn_ecart_type_p,
        random: false,
    },
    FormulaDef {
        id: "ecart_type_s",
        name: "ECARTYPE.STANDARD",
        description: "Écart type d'un échantillon (diviseur n-1)",
        category: Category::StatistiquesAvancees,
        variables: &[req("valeurs", "Valeurs", Kind::NumberList, "2, 4, 4, 4, 5, 5, 7, 9")],
        implementation: fn_ecart_type_s,
        random: false,
    },
    FormulaDef {
        id: "quartile",
        name: "QUARTILE.INCLURE",
        description: "Quartile d'une série (0 à 4)",
        category: Category::StatistiquesAvancees,
        variables: &[
            req("valeurs", "Valeurs", Kind::NumberList, "1, 2, 3, 4, 5, 6, 7, 8"),
            req("quartile", "Quartile (0-4)", Kind::Number, "1"),
        ],
        implementation: fn_quartile,
        random: false,
    },
    FormulaDef {
        id: "percentile",
        name: "CENTILE.INCLURE",
        description: "k-ième centile d'une série, k entre 0 et 1",
        category: Category::StatistiquesAvancees,
        variables: &[
            req("valeurs", "Valeurs", Kind::NumberList, "1, 2, 3, 4, 5"),
            req("k", "k (0-1)", Kind::Number, "0.9"),
        ],
        implementation: fn_percentile,
        random: false,
    },
    FormulaDef {
        id: "moyenne_reduite",
        name: "MOYENNE.REDUITE",
        description: "Moyenne après élimination des valeurs extrêmes",
        category: Category::StatistiquesAvancees,
        variables: &[
            req("valeurs", "Valeurs", Kind::NumberList, "1, 2, 3, 4, 5, 6, 7, 8, 9, 100"),
            req("pourcentage", "Pourcentage éliminé", Kind::Number, "20"),
        ],
        implementation: fn_moyenne_reduite,
        random: false,
    },
];

const CONDITIONAL_VARIABLES: &[crate::schema::VariableSpec] = &[
    req("donnees", "Données (table JSON)", Kind::Table, r#"[{"dept":"Ventes","ca":250}]"#),
    req("colonne_valeur", "Colonne des valeurs", Kind::Text, "ca"),
    req("criteres", "Critères (JSON)", Kind::List, r#"[{"colonne":"dept","valeur":"Ventes"}]"#),
];

const XY_VARIABLES: &[crate::schema::VariableSpec] = &[
    req("x", "Série X", Kind::NumberList, "1, 2, 3, 4, 5"),
    req("y", "Série Y", Kind::NumberList, "2, 4, 6, 8, 10"),
];

/// NB.SI.ENS
fn fn_nb_si_ens(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let rows = v.table("donnees")?;
    let criteria = v.criteria("criteres")?;
    let count = rows.iter().filter(|row| matches_all(row, &criteria)).count();
    Ok(ResultMap::new()
        .with("count", count)
        .with("lignes_totales", rows.len()))
}

/// Numeric cells of `colonne_valeur` in the rows matching `criteres`
fn conditional_values(v: &Variables) -> FormulaResult<Vec<f64>> {
    let rows = v.table("donnees")?;
    let column = v.text("colonne_valeur")?;
    let criteria = v.criteria("criteres")?;

    let mut values = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if !matches_all(row, &criteria) {
            continue;
        }
        match row.get(&column) {
            None | Some(Value::Null) => {}
            Some(cell) => values.push(cell.as_number().ok_or_else(|| {
                FormulaError::invalid_type(
                    format!("donnees[{}].{}", i, column),
                    "a number",
                    cell.type_name(),
                )
            })?),
        }
    }
    if values.is_empty() {
        return Err(FormulaError::domain("no row matches the criteria"));
    }
    Ok(values)
}

/// MAX.SI.ENS
fn fn_max_si_ens(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let values = conditional_values(v)?;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(ResultMap::new()
        .with("max", max)
        .with("lignes_correspondantes", values.len()))
}

/// MIN.SI.ENS
fn fn_min_si_ens(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let values = conditional_values(v)?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    Ok(ResultMap::new()
        .with("min", min)
        .with("lignes_correspondantes", values.len()))
}

/// RANG.EGAL (RANK.EQ)
fn fn_rang_egal(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let n = v.number("nombre")?;
    let values = v.numbers("valeurs")?;
    let ascending = match v.text_or("ordre", "desc")?.to_lowercase().as_str() {
        "desc" => false,
        "asc" => true,
        other => return Err(FormulaError::domain(format!("unknown order '{}'", other))),
    };

    if !values.contains(&n) {
        return Err(FormulaError::domain(format!("{} is not in the list", n)));
    }
    let ahead = values
        .iter()
        .filter(|&&x| if ascending { x < n } else { x > n })
        .count();

    Ok(ResultMap::new()
        .with("rang", ahead + 1)
        .with("total", values.len()))
}

/// MEDIANE
fn fn_mediane(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let values = v.numbers("valeurs")?;
    Ok(ResultMap::new()
        .with("mediane", numeric::median(&values)?)
        .with("count", values.len()))
}

/// AGREGAT (AGGREGATE, ignoring errors)
fn fn_agregat(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let items = v.list("valeurs")?;
    let code = v.integer("fonction")?;

    let numbers: Vec<f64> = items
        .iter()
        .filter(|item| item.is_numeric())
        .filter_map(Value::as_number)
        .collect();
    let ignored = items.len() - numbers.len();

    let (name, result) = match code {
        1 => ("AVERAGE", numeric::mean(&numbers)?),
        2 => ("COUNT", numbers.len() as f64),
        3 => (
            "COUNTA",
            items
                .iter()
                .filter(|item| !item.is_null() && item.error_code().is_none())
                .count() as f64,
        ),
        4 => ("MAX", non_empty(&numbers)?.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        5 => ("MIN", non_empty(&numbers)?.iter().copied().fold(f64::INFINITY, f64::min)),
        6 => ("PRODUCT", non_empty(&numbers)?.iter().product()),
        7 => ("STDEV.S", numeric::variance(&numbers, true)?.sqrt()),
        8 => ("STDEV.P", numeric::variance(&numbers, false)?.sqrt()),
        9 => ("SUM", numbers.iter().sum()),
        10 => ("VAR.S", numeric::variance(&numbers, true)?),
        11 => ("VAR.P", numeric::variance(&numbers, false)?),
        12 => ("MEDIAN", numeric::median(&numbers)?),
        other => {
            return Err(FormulaError::domain(format!(
                "function {} is not supported (1 to 12)",
                other
            )))
        }
    };

    Ok(ResultMap::new()
        .with("resultat", round(result, 6))
        .with("fonction_nom", name)
        .with("valeurs_utilisees", numbers.len())
        .with("erreurs_ignorees", ignored))
}

fn non_empty(values: &[f64]) -> FormulaResult<&[f64]> {
    if values.is_empty() {
        Err(FormulaError::domain("the list of values is empty"))
    } else {
        Ok(values)
    }
}

/// FREQUENCE
fn fn_frequence(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let data = v.numbers("donnees")?;
    let bounds = numeric::sorted(&v.numbers("bornes")?);
    if bounds.is_empty() {
        return Err(FormulaError::domain("at least one bound is required"));
    }

    let mut counts = vec![0usize; bounds.len() + 1];
    for x in &data {
        let bin = bounds.iter().position(|b| x <= b).unwrap_or(bounds.len());
        counts[bin] += 1;
    }

    let fmt = |b: f64| lexee_core::value::format_number(b);
    let mut labels = Vec::with_capacity(counts.len());
    labels.push(format!("<= {}", fmt(bounds[0])));
    for pair in bounds.windows(2) {
        labels.push(format!("{} < x <= {}", fmt(pair[0]), fmt(pair[1])));
    }
    labels.push(format!("> {}", fmt(bounds[bounds.len() - 1])));

    Ok(ResultMap::new()
        .with("frequences", counts)
        .with("labels", labels)
        .with("total", data.len()))
}

/// PREVISION.LINEAIRE
fn fn_prevision(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let target = v.number("x_cible")?;
    let fit = LinearFit::fit(&v.numbers("x_connus")?, &v.numbers("y_connus")?)?;
    Ok(ResultMap::new()
        .with("prevision", round(fit.predict(target), 6))
        .with("pente", round(fit.slope, 6))
        .with("ordonnee_origine", round(fit.intercept, 6))
        .with("r_carre", fit.r_squared.map(|r| round(r, 6))))
}

fn xy_fit(v: &Variables) -> FormulaResult<LinearFit> {
    LinearFit::fit(&v.numbers("x")?, &v.numbers("y")?)
}

/// COEFFICIENT.CORRELATION
fn fn_correlation(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let fit = xy_fit(v)?;
    let r = fit
        .correlation
        .ok_or_else(|| FormulaError::domain("y values are all identical"))?;
    Ok(ResultMap::new()
        .with("correlation", round(r, 6))
        .with("r_carre", round(r * r, 6))
        .with("n", fit.n))
}

/// PENTE
fn fn_pente(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    Ok(ResultMap::new().with("pente", round(xy_fit(v)?.slope, 6)))
}

/// ORDONNEE.ORIGINE
fn fn_ordonnee_origine(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    Ok(ResultMap::new().with("ordonnee_origine", round(xy_fit(v)?.intercept, 6)))
}

fn standard_deviation(v: &Variables, sample: bool) -> FormulaResult<ResultMap> {
    let values = v.numbers("valeurs")?;
    let variance = numeric::variance(&values, sample)?;
    Ok(ResultMap::new()
        .with("ecart_type", round(variance.sqrt(), 6))
        .with("variance", round(variance, 6))
        .with("moyenne", round(numeric::mean(&values)?, 6))
        .with("n", values.len()))
}

/// ECARTYPE.PEARSON
fn fn_ecart_type_p(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    standard_deviation(v, false)
}

/// ECARTYPE.STANDARD
fn fn_ecart_type_s(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    standard_deviation(v, true)
}

/// QUARTILE.INCLURE
fn fn_quartile(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let values = v.numbers("valeurs")?;
    let q = v.integer("quartile")?;
    if !(0..=4).contains(&q) {
        return Err(FormulaError::domain("quartile must be between 0 and 4"));
    }
    let value = numeric::percentile_inc(&values, q as f64 / 4.0)?;
    Ok(ResultMap::new()
        .with("quartile", format!("Q{}", q))
        .with("valeur", round(value, 6)))
}

/// CENTILE.INCLURE
fn fn_percentile(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let values = v.numbers("valeurs")?;
    let k = v.number("k")?;
    let value = numeric::percentile_inc(&values, k)?;
    Ok(ResultMap::new()
        .with("valeur", round(value, 6))
        .with("percentile", round(k * 100.0, 6)))
}

/// MOYENNE.REDUITE (TRIMMEAN)
fn fn_moyenne_reduite(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let values = v.numbers("valeurs")?;
    let percent = v.number("pourcentage")?;
    if !(0.0..100.0).contains(&percent) {
        return Err(FormulaError::domain("percentage must be in [0, 100)"));
    }
    if values.is_empty() {
        return Err(FormulaError::domain("the list of values is empty"));
    }

    let trim = (values.len() as f64 * percent / 100.0 / 2.0).floor() as usize;
    let sorted = numeric::sorted(&values);
    let kept = &sorted[trim..sorted.len() - trim];

    Ok(ResultMap::new()
        .with("moyenne_reduite", round(numeric::mean(kept)?, 6))
        .with("valeurs_gardees", kept.len())
        .with("valeurs_eliminees", 2 * trim))
}
