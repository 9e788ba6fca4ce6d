//! Math formulas: aggregates, rounding, sequences and scalar arithmetic

use super::{opt, req, round, FormulaDef};
use crate::context::FormulaContext;
use crate::schema::{Category, VariableKind as Kind};
use crate::variables::{ResultMap, Variables};
use lexee_core::{FormulaError, FormulaResult, Value};
use rand::Rng;

/// Cell cap for `sequence`
const MAX_SEQUENCE_CELLS: i64 = 10_000;

/// Draw cap for `alea_entre_bornes`
const MAX_RANDOM_DRAWS: i64 = 10_000;

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "somme_moyenne",
        name: "SOMME & MOYENNE",
        description: "Somme, moyenne, min et max d'une série de valeurs",
        category: Category::Mathematiques,
        variables: &[req("valeurs", "Valeurs", Kind::NumberList, "10, 20, 30, 40, 50")],
        implementation: fn_somme_moyenne,
        random: false,
    },
    FormulaDef {
        id: "somme_si_ens",
        name: "SOMME.SI.ENS",
        description: "Somme conditionnelle sur plusieurs critères",
        category: Category::Mathematiques,
        variables: &[
            req("donnees", "Données (table JSON)", Kind::Table, r#"[{"canal":"Facebook","montant":150}]"#),
            req("colonne_somme", "Colonne à sommer", Kind::Text, "montant"),
            req("criteres", "Critères (JSON)", Kind::List, r#"[{"colonne":"canal","valeur":"Facebook"}]"#),
        ],
        implementation: fn_somme_si_ens,
        random: false,
    },
    FormulaDef {
        id: "arrondi",
        name: "ARRONDI / ARRONDI.SUP / ARRONDI.INF",
        description: "Arrondir un nombre au plus proche, vers le haut ou vers le bas",
        category: Category::Mathematiques,
        variables: &[
            req("nombre", "Nombre", Kind::Number, "3.14159"),
            opt("decimales", "Décimales", Kind::Number, "2"),
        ],
        implementation: fn_arrondi,
        random: false,
    },
    FormulaDef {
        id: "sequence",
        name: "SEQUENCE",
        description: "Générer une suite de nombres en ligne ou en grille",
        category: Category::Mathematiques,
        variables: &[
            req("lignes", "Lignes", Kind::Number, "5"),
            opt("colonnes", "Colonnes", Kind::Number, "1"),
            opt("debut", "Début", Kind::Number, "1"),
            opt("pas", "Pas", Kind::Number, "1"),
        ],
        implementation: fn_sequence,
        random: false,
    },
    FormulaDef {
        id: "alea_entre_bornes",
        name: "ALEA.ENTRE.BORNES",
        description: "Entiers aléatoires entre deux bornes incluses",
        category: Category::Mathematiques,
        variables: &[
            req("borne_inf", "Borne inférieure", Kind::Number, "1"),
            req("borne_sup", "Borne supérieure", Kind::Number, "100"),
            opt("nombre", "Nombre de tirages", Kind::Number, "1"),
        ],
        implementation: fn_alea_entre_bornes,
        random: true,
    },
    FormulaDef {
        id: "scan_map_reduce",
        name: "SCAN / MAP / REDUCE",
        description: "Cumuls, transformations et réductions d'une liste",
        category: Category::Mathematiques,
        variables: &[
            req("valeurs", "Valeurs", Kind::NumberList, "10, 20, 30"),
            req("operation", "Opération", Kind::Text, "somme_cumul"),
        ],
        implementation: fn_scan_map_reduce,
        random: false,
    },
    FormulaDef {
        id: "abs_val",
        name: "ABS",
        description: "Valeur absolue",
        category: Category::Mathematiques,
        variables: &[req("nombre", "Nombre", Kind::Number, "-7.3")],
        implementation: fn_abs_val,
        random: false,
    },
    FormulaDef {
        id: "mod_val",
        name: "MOD",
        description: "Reste d'une division (signe du diviseur)",
        category: Category::Mathematiques,
        variables: &[
            req("nombre", "Nombre", Kind::Number, "10"),
            req("diviseur", "Diviseur", Kind::Number, "3"),
        ],
        implementation: fn_mod_val,
        random: false,
    },
    FormulaDef {
        id: "puissance",
        name: "PUISSANCE",
        description: "Élever un nombre à une puissance",
        category: Category::Mathematiques,
        variables: &[
            req("base", "Base", Kind::Number, "2"),
            req("exposant", "Exposant", Kind::Number, "10"),
        ],
        implementation: fn_puissance,
        random: false,
    },
    FormulaDef {
        id: "plafond_plancher",
        name: "PLAFOND / PLANCHER",
        description: "Arrondir au multiple supérieur et inférieur d'un incrément",
        category: Category::Mathematiques,
        variables: &[
            req("nombre", "Nombre", Kind::Number, "4.3"),
            opt("increment", "Incrément", Kind::Number, "0.5"),
        ],
        implementation: fn_plafond_plancher,
        random: false,
    },
];

/// SOMME & MOYENNE
fn fn_somme_moyenne(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let values = v.numbers("valeurs")?;
    if values.is_empty() {
        return Err(FormulaError::domain("the list of values is empty"));
    }
    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(ResultMap::new()
        .with("somme", round(sum, 6))
        .with("moyenne", round(sum / values.len() as f64, 6))
        .with("count", values.len())
        .with("min", round(min, 6))
        .with("max", round(max, 6)))
}

/// SOMME.SI.ENS
fn fn_somme_si_ens(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let rows = v.table("donnees")?;
    let column = v.text("colonne_somme")?;
    let criteria = v.criteria("criteres")?;

    let mut total = 0.0;
    let mut matched = 0usize;
    for (i, row) in rows.iter().enumerate() {
        if !crate::criteria::matches_all(row, &criteria) {
            continue;
        }
        total += cell_number(row.get(&column), &format!("donnees[{}].{}", i, column))?;
        matched += 1;
    }

    Ok(ResultMap::new()
        .with("somme", round(total, 6))
        .with("lignes_correspondantes", matched)
        .with("lignes_totales", rows.len()))
}

/// Numeric cell; a missing or null cell counts as 0
pub(crate) fn cell_number(cell: Option<&Value>, name: &str) -> FormulaResult<f64> {
    match cell {
        None | Some(Value::Null) => Ok(0.0),
        Some(value) => value
            .as_number()
            .ok_or_else(|| FormulaError::invalid_type(name, "a number", value.type_name())),
    }
}

/// ARRONDI
fn fn_arrondi(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let n = v.number("nombre")?;
    let digits = decimals(v.integer_or("decimales", 0)?)?;

    Ok(ResultMap::new()
        .with("arrondi", crate::numeric::round(n, digits))
        .with("arrondi_sup", crate::numeric::round_up(n, digits))
        .with("arrondi_inf", crate::numeric::round_down(n, digits)))
}

pub(crate) fn decimals(digits: i64) -> FormulaResult<i32> {
    if (-15..=15).contains(&digits) {
        Ok(digits as i32)
    } else {
        Err(FormulaError::domain("decimals must be between -15 and 15"))
    }
}

/// SEQUENCE
fn fn_sequence(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let rows = v.integer("lignes")?;
    let cols = v.integer_or("colonnes", 1)?;
    let start = v.number_or("debut", 1.0)?;
    let step = v.number_or("pas", 1.0)?;

    if rows < 1 || cols < 1 {
        return Err(FormulaError::domain("rows and columns must be at least 1"));
    }
    let total = rows.saturating_mul(cols);
    if total > MAX_SEQUENCE_CELLS {
        return Err(FormulaError::domain(format!(
            "sequence is too large ({} cells, at most {})",
            total, MAX_SEQUENCE_CELLS
        )));
    }

    let cell = |i: i64| Value::compact(round(start + step * i as f64, 10));
    let sequence = if cols == 1 {
        Value::List((0..rows).map(cell).collect())
    } else {
        Value::List(
            (0..rows)
                .map(|r| Value::List((0..cols).map(|c| cell(r * cols + c)).collect()))
                .collect(),
        )
    };

    Ok(ResultMap::new()
        .with("sequence", sequence)
        .with("total", total))
}

/// ALEA.ENTRE.BORNES
fn fn_alea_entre_bornes(v: &Variables, ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let low = v.integer("borne_inf")?;
    let high = v.integer("borne_sup")?;
    let count = v.integer_or("nombre", 1)?;

    if low > high {
        return Err(FormulaError::domain(
            "the lower bound must not exceed the upper bound",
        ));
    }
    if !(1..=MAX_RANDOM_DRAWS).contains(&count) {
        return Err(FormulaError::domain(format!(
            "count must be between 1 and {}",
            MAX_RANDOM_DRAWS
        )));
    }

    let mut rng = ctx.rng();
    let mut draws: Vec<i64> = (0..count).map(|_| rng.gen_range(low..=high)).collect();
    let values = if count == 1 {
        Value::Integer(draws.pop().unwrap_or(low))
    } else {
        Value::from(draws)
    };

    Ok(ResultMap::new()
        .with("valeurs", values)
        .with("borne_inf", low)
        .with("borne_sup", high))
}

/// SCAN / MAP / REDUCE
fn fn_scan_map_reduce(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let values = v.numbers("valeurs")?;
    let operation = v.text("operation")?;

    let scan = |f: fn(f64, f64) -> f64| -> Vec<f64> {
        let mut acc: Option<f64> = None;
        values
            .iter()
            .map(|&x| {
                let next = acc.map_or(x, |a| f(a, x));
                acc = Some(next);
                round(next, 10)
            })
            .collect()
    };

    let (result, mode) = match operation.as_str() {
        "somme_cumul" => (Value::from(scan(|a, x| a + x)), "scan"),
        "produit_cumul" => (Value::from(scan(|a, x| a * x)), "scan"),
        "max_cumul" => (Value::from(scan(f64::max)), "scan"),
        "min_cumul" => (Value::from(scan(f64::min)), "scan"),
        "somme" => (Value::from(round(values.iter().sum(), 10)), "reduce"),
        "produit" => (Value::from(round(values.iter().product(), 10)), "reduce"),
        "max" | "min" | "moyenne" => {
            if values.is_empty() {
                return Err(FormulaError::domain("the list of values is empty"));
            }
            let r = match operation.as_str() {
                "max" => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                "min" => values.iter().copied().fold(f64::INFINITY, f64::min),
                _ => crate::numeric::mean(&values)?,
            };
            (Value::from(round(r, 10)), "reduce")
        }
        "carre" => (map_values(&values, |x| Ok(x * x))?, "map"),
        "racine" => (
            map_values(&values, |x| {
                if x < 0.0 {
                    Err(FormulaError::domain("square root of a negative number"))
                } else {
                    Ok(x.sqrt())
                }
            })?,
            "map",
        ),
        "double" => (map_values(&values, |x| Ok(x * 2.0))?, "map"),
        "inverse" => (
            map_values(&values, |x| {
                if x == 0.0 {
                    Err(FormulaError::domain("cannot invert 0"))
                } else {
                    Ok(1.0 / x)
                }
            })?,
            "map",
        ),
        "abs" => (map_values(&values, |x| Ok(x.abs()))?, "map"),
        other => {
            return Err(FormulaError::domain(format!("unknown operation '{}'", other)));
        }
    };

    Ok(ResultMap::new().with("resultat", result).with("mode", mode))
}

fn map_values(values: &[f64], f: impl Fn(f64) -> FormulaResult<f64>) -> FormulaResult<Value> {
    values
        .iter()
        .map(|&x| f(x).map(|y| Value::Number(round(y, 10))))
        .collect::<FormulaResult<Vec<Value>>>()
        .map(Value::List)
}

/// ABS
fn fn_abs_val(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    Ok(ResultMap::new().with("resultat", v.number("nombre")?.abs()))
}

/// MOD
fn fn_mod_val(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let n = v.number("nombre")?;
    let d = v.number("diviseur")?;
    if d == 0.0 {
        return Err(FormulaError::domain("division by zero"));
    }
    let r = n - d * (n / d).floor();
    Ok(ResultMap::new().with("resultat", round(r, 10)))
}

/// PUISSANCE
fn fn_puissance(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let base = v.number("base")?;
    let exponent = v.number("exposant")?;
    if base == 0.0 && exponent < 0.0 {
        return Err(FormulaError::domain("zero raised to a negative power"));
    }
    let r = base.powf(exponent);
    if !r.is_finite() {
        return Err(FormulaError::domain("result is not a finite number"));
    }
    Ok(ResultMap::new().with("resultat", r))
}

/// PLAFOND / PLANCHER
fn fn_plafond_plancher(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let n = v.number("nombre")?;
    let step = v.number_or("increment", 1.0)?.abs();
    if step == 0.0 {
        return Err(FormulaError::domain("increment cannot be 0"));
    }
    let steps = round(n / step, 10);
    Ok(ResultMap::new()
        .with("plafond", round(steps.ceil() * step, 10))
        .with("plancher", round(steps.floor() * step, 10)))
}
