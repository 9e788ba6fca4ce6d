//! Information formulas (EST*, TYPE, N)
//!
//! Error literals are recognised through [`ErrorCode`]. A `null` entry is an
//! unavailable value, so it counts as an error for `esterreur` and as `#N/A`
//! for `estna`.

use super::{req, FormulaDef};
use crate::context::FormulaContext;
use crate::schema::{Category, VariableKind as Kind, VariableSpec};
use crate::variables::{ResultMap, Variables};
use lexee_core::{ErrorCode, FormulaError, FormulaResult, Value};

const VALUES: &[VariableSpec] = &[req(
    "valeurs",
    "Valeurs",
    Kind::List,
    r##"[42, "texte", null, "#N/A"]"##,
)];

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "estvide",
        name: "ESTVIDE",
        description: "Tester si chaque valeur est vide",
        category: Category::Logique,
        variables: VALUES,
        implementation: fn_estvide,
        random: false,
    },
    FormulaDef {
        id: "estnum",
        name: "ESTNUM",
        description: "Tester si chaque valeur est numérique",
        category: Category::Logique,
        variables: VALUES,
        implementation: fn_estnum,
        random: false,
    },
    FormulaDef {
        id: "esttexte",
        name: "ESTTEXTE",
        description: "Tester si chaque valeur est du texte",
        category: Category::Logique,
        variables: VALUES,
        implementation: fn_esttexte,
        random: false,
    },
    FormulaDef {
        id: "esterreur",
        name: "ESTERREUR",
        description: "Tester si chaque valeur est une erreur",
        category: Category::Logique,
        variables: VALUES,
        implementation: fn_esterreur,
        random: false,
    },
    FormulaDef {
        id: "estna",
        name: "ESTNA",
        description: "Tester si chaque valeur est #N/A",
        category: Category::Logique,
        variables: VALUES,
        implementation: fn_estna,
        random: false,
    },
    FormulaDef {
        id: "type_val",
        name: "TYPE",
        description: "Code de type d'une valeur (1, 2, 4, 16, 64)",
        category: Category::Logique,
        variables: &[req("valeur", "Valeur", Kind::Any, "42")],
        implementation: fn_type_val,
        random: false,
    },
    FormulaDef {
        id: "cnum",
        name: "N",
        description: "Convertir une valeur en nombre (texte = 0)",
        category: Category::Logique,
        variables: &[req("valeur", "Valeur", Kind::Any, "true")],
        implementation: fn_cnum,
        random: false,
    },
];

/// Apply a test to every entry; report the flags and how many passed
fn classify(
    v: &Variables,
    count_key: &str,
    test: impl Fn(&Value) -> bool,
) -> FormulaResult<ResultMap> {
    let flags: Vec<bool> = v.list("valeurs")?.iter().map(test).collect();
    let hits = flags.iter().filter(|&&b| b).count();
    Ok(ResultMap::new()
        .with(count_key, hits)
        .with("resultats", flags))
}

/// ESTVIDE
fn fn_estvide(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let items = v.list("valeurs")?;
    let blanks = items.iter().filter(|item| item.is_blank()).count();
    let mut result = classify(v, "nb_vides", Value::is_blank)?;
    result.insert("nb_non_vides", items.len() - blanks);
    Ok(result)
}

/// ESTNUM: numbers and numeric text, not booleans
fn fn_estnum(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    classify(v, "nb_numeriques", |value| match value {
        Value::Integer(_) | Value::Number(_) => true,
        Value::Text(_) => value.as_number().is_some(),
        _ => false,
    })
}

/// ESTTEXTE
fn fn_esttexte(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    classify(v, "nb_textes", |value| {
        matches!(value, Value::Text(_)) && value.error_code().is_none()
    })
}

/// ESTERREUR
fn fn_esterreur(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    classify(v, "nb_erreurs", |value| {
        value.is_null() || value.error_code().is_some()
    })
}

/// ESTNA
fn fn_estna(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    classify(v, "nb_na", |value| {
        value.is_null() || value.error_code() == Some(ErrorCode::Na)
    })
}

/// TYPE
fn fn_type_val(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let value = v.raw("valeur")?;
    let (code, name) = match value {
        Value::Null | Value::Integer(_) | Value::Number(_) => (1, "Nombre"),
        Value::Text(_) if value.error_code().is_some() => (16, "Erreur"),
        Value::Text(_) => (2, "Texte"),
        Value::Bool(_) => (4, "Booléen"),
        Value::List(_) | Value::Map(_) => (64, "Tableau"),
    };
    Ok(ResultMap::new().with("type", code).with("type_nom", name))
}

/// N: numbers pass through, booleans are 1/0, text and null are 0
fn fn_cnum(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let value = v.raw("valeur")?;
    let n = match value {
        Value::Integer(_) | Value::Number(_) | Value::Bool(_) => value.as_number().unwrap_or(0.0),
        Value::Null | Value::Text(_) => 0.0,
        Value::List(_) | Value::Map(_) => {
            return Err(FormulaError::invalid_type("valeur", "a scalar", value.type_name()))
        }
    };
    Ok(ResultMap::new().with("nombre", Value::compact(n)))
}
