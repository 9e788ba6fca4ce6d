//! Lookup formulas
//!
//! Text matches are case-insensitive and compare the rendered form of each
//! value, so `2` finds `"2"` and `"mars"` finds `"Mars"`.

use super::{opt, req, FormulaDef};
use crate::context::FormulaContext;
use crate::schema::{Category, VariableKind as Kind};
use crate::variables::{ResultMap, Variables};
use lazy_regex::regex;
use lexee_core::{FormulaError, FormulaResult, Value};

/// Widest sheet column (XFD)
const MAX_COLUMN: i64 = 16_384;

/// Tallest sheet
const MAX_ROW: i64 = 1_048_576;

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "recherchex",
        name: "RECHERCHEX",
        description: "Recherche exacte dans un tableau, valeur du tableau de retour",
        category: Category::Recherche,
        variables: &[
            req("valeur_cherchee", "Valeur cherchée", Kind::Any, "Paris"),
            req("tableau_recherche", "Tableau de recherche", Kind::List, r#"["Lyon", "Paris"]"#),
            req("tableau_retour", "Tableau de retour", Kind::List, "[69, 75]"),
        ],
        implementation: fn_recherchex,
        random: false,
    },
    FormulaDef {
        id: "recherche_v",
        name: "RECHERCHE",
        description: "Correspondance exacte, sinon plus grande valeur inférieure ou égale",
        category: Category::Recherche,
        variables: &[
            req("valeur_cherchee", "Valeur cherchée", Kind::Any, "75"),
            req("vecteur_recherche", "Vecteur de recherche", Kind::List, "10, 20, 50, 80, 100"),
            req("vecteur_retour", "Vecteur de retour", Kind::List, r#"["F", "E", "D", "C", "B"]"#),
        ],
        implementation: fn_recherche_v,
        random: false,
    },
    FormulaDef {
        id: "rechercheh",
        name: "RECHERCHEH",
        description: "Recherche horizontale dans une ligne d'en-têtes",
        category: Category::Recherche,
        variables: &[
            req("valeur_cherchee", "Valeur cherchée", Kind::Any, "Mars"),
            req("en_tetes", "En-têtes", Kind::List, r#"["Janvier", "Février", "Mars"]"#),
            req("donnees", "Lignes de données", Kind::List, "[[100, 200, 350]]"),
            opt("ligne_retour", "Ligne de retour (base 1)", Kind::Number, "1"),
        ],
        implementation: fn_rechercheh,
        random: false,
    },
    FormulaDef {
        id: "index_equiv",
        name: "INDEX / EQUIV",
        description: "Valeur d'une colonne pour la ligne dont une autre colonne correspond",
        category: Category::Recherche,
        variables: &[
            req("donnees", "Données (table JSON)", Kind::Table, r#"[{"ref":"A1","prix":9.99}]"#),
            req("colonne_recherche", "Colonne de recherche", Kind::Text, "ref"),
            req("valeur_cherchee", "Valeur cherchée", Kind::Any, "A1"),
            req("colonne_retour", "Colonne de retour", Kind::Text, "prix"),
        ],
        implementation: fn_index_equiv,
        random: false,
    },
    FormulaDef {
        id: "indirect_ext",
        name: "INDIRECT (chemin)",
        description: "Valeur à un chemin de référence dans des données imbriquées",
        category: Category::Recherche,
        variables: &[
            req("reference", "Référence", Kind::Text, "users.admin.name"),
            req("donnees", "Données (JSON)", Kind::Map, r#"{"users":{"admin":{"name":"Alice"}}}"#),
        ],
        implementation: fn_indirect_ext,
        random: false,
    },
    FormulaDef {
        id: "coordonnees",
        name: "ADRESSE",
        description: "Adresse de cellule au format A1",
        category: Category::Recherche,
        variables: &[
            req("ligne", "Ligne", Kind::Number, "1"),
            req("colonne", "Colonne", Kind::Number, "1"),
            opt("type_reference", "Type (1-4)", Kind::Number, "1"),
            opt("feuille", "Feuille", Kind::Text, "Feuil1"),
        ],
        implementation: fn_coordonnees,
        random: false,
    },
];

fn key(value: &Value) -> String {
    value.render().to_lowercase()
}

fn same_length(a: (&str, usize), b: (&str, usize)) -> FormulaResult<()> {
    if a.1 == b.1 {
        Ok(())
    } else {
        Err(FormulaError::shape(format!(
            "'{}' has {} items but '{}' has {}",
            a.0, a.1, b.0, b.1
        )))
    }
}

/// RECHERCHEX (XLOOKUP, exact match)
fn fn_recherchex(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let needle = key(v.value("valeur_cherchee")?);
    let haystack = v.list("tableau_recherche")?;
    let returned = v.list("tableau_retour")?;
    same_length(("tableau_recherche", haystack.len()), ("tableau_retour", returned.len()))?;

    match haystack.iter().position(|item| key(item) == needle) {
        Some(i) => Ok(ResultMap::new()
            .with("resultat", returned[i].clone())
            .with("position", i + 1)
            .with("trouve", true)),
        None => Ok(ResultMap::new()
            .with("resultat", Value::Null)
            .with("position", -1)
            .with("trouve", false)),
    }
}

/// RECHERCHE (LOOKUP)
fn fn_recherche_v(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let target = v.value("valeur_cherchee")?;
    let haystack = v.list("vecteur_recherche")?;
    let returned = v.list("vecteur_retour")?;
    same_length(("vecteur_recherche", haystack.len()), ("vecteur_retour", returned.len()))?;

    let needle = key(target);
    let (index, kind) = match haystack.iter().position(|item| key(item) == needle) {
        Some(i) => (i, "exacte"),
        None => {
            let n = target.as_number().ok_or_else(|| {
                FormulaError::domain(format!("'{}' was not found", target.render()))
            })?;
            // Largest candidate <= target; the first one wins on ties
            let mut best: Option<(usize, f64)> = None;
            for (i, item) in haystack.iter().enumerate() {
                if let Some(x) = item.as_number() {
                    if x <= n && best.map_or(true, |(_, b)| x > b) {
                        best = Some((i, x));
                    }
                }
            }
            let (i, _) = best.ok_or_else(|| {
                FormulaError::domain(format!("no value is less than or equal to {}", target.render()))
            })?;
            (i, "approchee")
        }
    };

    Ok(ResultMap::new()
        .with("resultat", returned[index].clone())
        .with("position", index + 1)
        .with("correspondance", kind))
}

/// RECHERCHEH (HLOOKUP, exact match)
fn fn_rechercheh(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let needle = key(v.value("valeur_cherchee")?);
    let headers = v.list("en_tetes")?;
    let rows = v.list("donnees")?;
    let line = v.integer_or("ligne_retour", 1)?;

    let row = usize::try_from(line)
        .ok()
        .and_then(|l| l.checked_sub(1))
        .and_then(|l| rows.get(l))
        .ok_or_else(|| {
            FormulaError::domain(format!("row {} is out of range (1 to {})", line, rows.len()))
        })?;
    let cells = row.as_list().ok_or_else(|| {
        FormulaError::invalid_type(format!("donnees[{}]", line - 1), "a list", row.type_name())
    })?;

    match headers.iter().position(|h| key(h) == needle) {
        Some(col) => {
            let value = cells.get(col).ok_or_else(|| {
                FormulaError::shape(format!(
                    "row {} has {} cells, column {} requested",
                    line,
                    cells.len(),
                    col + 1
                ))
            })?;
            Ok(ResultMap::new()
                .with("resultat", value.clone())
                .with("trouve", true)
                .with("colonne", col + 1))
        }
        None => Ok(ResultMap::new()
            .with("resultat", Value::Null)
            .with("trouve", false)
            .with("colonne", -1)),
    }
}

/// INDEX / EQUIV
fn fn_index_equiv(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let rows = v.table("donnees")?;
    let search = v.text("colonne_recherche")?;
    let needle = key(v.value("valeur_cherchee")?);
    let column = v.text("colonne_retour")?;

    let found = rows
        .iter()
        .position(|row| row.get(&search).map(key).as_deref() == Some(needle.as_str()));

    match found {
        Some(i) => Ok(ResultMap::new()
            .with("resultat", rows[i].get(&column).cloned().unwrap_or_default())
            .with("trouve", true)
            .with("ligne", i + 1)),
        None => Ok(ResultMap::new()
            .with("resultat", Value::Null)
            .with("trouve", false)
            .with("ligne", -1)),
    }
}

/// One step of a reference path
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathStep {
    Key(String),
    Index(usize),
}

impl std::fmt::Display for PathStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathStep::Key(k) => write!(f, "{}", k),
            PathStep::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Parse `a.b[1].c` into steps
fn parse_reference(reference: &str) -> FormulaResult<Vec<PathStep>> {
    let segment = regex!(r"^([^\[\]]*)((?:\[\d+\])*)$");
    let index = regex!(r"\[(\d+)\]");

    let mut steps = Vec::new();
    for part in reference.trim().split('.') {
        let caps = segment.captures(part).ok_or_else(|| {
            FormulaError::domain(format!("invalid reference segment '{}'", part))
        })?;
        let name = caps.get(1).map_or("", |m| m.as_str());
        let indices = caps.get(2).map_or("", |m| m.as_str());
        if name.is_empty() && indices.is_empty() {
            return Err(FormulaError::domain(format!("empty segment in '{}'", reference)));
        }
        if !name.is_empty() {
            steps.push(PathStep::Key(name.to_string()));
        }
        for m in index.captures_iter(indices) {
            let i = m[1]
                .parse::<usize>()
                .map_err(|_| FormulaError::domain(format!("index '{}' is too large", &m[1])))?;
            steps.push(PathStep::Index(i));
        }
    }
    Ok(steps)
}

/// INDIRECT over nested data
fn fn_indirect_ext(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let reference = v.text("reference")?;
    let mut current = v.value("donnees")?;

    let steps = parse_reference(&reference)?;
    for step in &steps {
        let next = match (step, current) {
            (PathStep::Key(k), Value::Map(map)) => map.get(k),
            (PathStep::Index(i), Value::List(items)) => items.get(*i),
            _ => None,
        };
        current = next.ok_or_else(|| {
            FormulaError::domain(format!("reference '{}' not found at '{}'", reference, step))
        })?;
    }

    let path: Vec<String> = steps.iter().map(ToString::to_string).collect();
    Ok(ResultMap::new()
        .with("resultat", current.clone())
        .with("chemin", path))
}

/// Column letters for a 1-based column number (1 = A, 27 = AA)
pub(crate) fn column_letters(col: u32) -> String {
    let mut letters = String::new();
    let mut n = col;
    while n > 0 {
        n -= 1;
        letters.insert(0, char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters
}

/// ADRESSE
fn fn_coordonnees(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let row = v.integer("ligne")?;
    let col = v.integer("colonne")?;
    let kind = v.integer_or("type_reference", 1)?;
    let sheet = v.optional_text("feuille")?;

    if !(1..=MAX_ROW).contains(&row) {
        return Err(FormulaError::domain(format!("row must be between 1 and {}", MAX_ROW)));
    }
    if !(1..=MAX_COLUMN).contains(&col) {
        return Err(FormulaError::domain(format!(
            "column must be between 1 and {}",
            MAX_COLUMN
        )));
    }
    let (col_abs, row_abs) = match kind {
        1 => (true, true),
        2 => (false, true),
        3 => (true, false),
        4 => (false, false),
        other => {
            return Err(FormulaError::domain(format!(
                "reference type {} is not supported (1 to 4)",
                other
            )))
        }
    };

    let letters = column_letters(col as u32);
    let mut address = String::new();
    if let Some(sheet) = sheet.filter(|s| !s.is_empty()) {
        if sheet.chars().any(|c| !c.is_alphanumeric() && c != '_') {
            address.push_str(&format!("'{}'!", sheet.replace('\'', "''")));
        } else {
            address.push_str(&format!("{}!", sheet));
        }
    }
    if col_abs {
        address.push('$');
    }
    address.push_str(&letters);
    if row_abs {
        address.push('$');
    }
    address.push_str(&row.to_string());

    Ok(ResultMap::new()
        .with("adresse", address)
        .with("colonne_lettres", letters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::run;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_recherchex() {
        let input = json!({
            "valeur_cherchee": "paris",
            "tableau_recherche": ["Lyon", "Paris", "Nice"],
            "tableau_retour": [69, 75, 6],
        });
        let r = run(fn_recherchex, input).unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::Integer(75)));
        assert_eq!(r.get("position"), Some(&Value::Integer(2)));
        assert_eq!(r.get("trouve"), Some(&Value::Bool(true)));

        let r = run(
            fn_recherchex,
            json!({"valeur_cherchee": "Lille", "tableau_recherche": ["Lyon"], "tableau_retour": [69]}),
        )
        .unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::Null));
        assert_eq!(r.get("position"), Some(&Value::Integer(-1)));

        let err = run(
            fn_recherchex,
            json!({"valeur_cherchee": 1, "tableau_recherche": [1, 2], "tableau_retour": [1]}),
        )
        .unwrap_err();
        assert!(matches!(err, FormulaError::Shape(_)));
    }

    #[test]
    fn test_recherche_v() {
        let base = |target: i64| {
            json!({
                "valeur_cherchee": target,
                "vecteur_recherche": [10, 20, 50, 80, 100],
                "vecteur_retour": ["F", "E", "D", "C", "B"],
            })
        };
        let r = run(fn_recherche_v, base(50)).unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::from("D")));
        assert_eq!(r.get("position"), Some(&Value::Integer(3)));
        assert_eq!(r.get("correspondance"), Some(&Value::from("exacte")));

        let r = run(fn_recherche_v, base(75)).unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::from("D")));
        assert_eq!(r.get("correspondance"), Some(&Value::from("approchee")));

        let err = run(fn_recherche_v, base(5)).unwrap_err();
        assert!(matches!(err, FormulaError::Domain(_)));
    }

    #[test]
    fn test_rechercheh() {
        let r = run(
            fn_rechercheh,
            json!({
                "valeur_cherchee": "Mars",
                "en_tetes": ["Janvier", "Février", "Mars", "Avril"],
                "donnees": [[100, 200, 350, 400], [50, 80, 120, 150]],
                "ligne_retour": 1,
            }),
        )
        .unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::Integer(350)));
        assert_eq!(r.get("colonne"), Some(&Value::Integer(3)));

        let r = run(
            fn_rechercheh,
            json!({
                "valeur_cherchee": "Mars",
                "en_tetes": ["Janvier", "Février", "Mars"],
                "donnees": [[10, 20, 30], [40, 50, 60]],
                "ligne_retour": 2,
            }),
        )
        .unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::Integer(60)));

        let r = run(
            fn_rechercheh,
            json!({"valeur_cherchee": "Décembre", "en_tetes": ["Janvier", "Février"], "donnees": [[100, 200]]}),
        )
        .unwrap();
        assert_eq!(r.get("trouve"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_index_equiv() {
        let data = json!([
            {"ref": "A1", "nom": "Widget", "prix": 9.99},
            {"ref": "A2", "nom": "Gadget", "prix": 19.99},
        ]);
        let r = run(
            fn_index_equiv,
            json!({"donnees": data, "colonne_recherche": "ref", "valeur_cherchee": "A2", "colonne_retour": "prix"}),
        )
        .unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::Number(19.99)));
        assert_eq!(r.get("ligne"), Some(&Value::Integer(2)));

        let r = run(
            fn_index_equiv,
            json!({"donnees": [{"k": "x", "v": 1}], "colonne_recherche": "k", "valeur_cherchee": "z", "colonne_retour": "v"}),
        )
        .unwrap();
        assert_eq!(r.get("trouve"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_indirect_ext() {
        let r = run(
            fn_indirect_ext,
            json!({"reference": "users.admin.name", "donnees": {"users": {"admin": {"name": "Alice"}}}}),
        )
        .unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::from("Alice")));

        let r = run(fn_indirect_ext, json!({"reference": "items[1]", "donnees": {"items": [10, 20, 30]}})).unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::Integer(20)));
        assert_eq!(r.get("chemin"), Some(&Value::from(vec!["items", "[1]"])));

        let err = run(fn_indirect_ext, json!({"reference": "foo.bar", "donnees": {"foo": {"baz": 1}}})).unwrap_err();
        assert!(matches!(err, FormulaError::Domain(_)));
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse_reference("a.b[2][0].c").unwrap(),
            vec![
                PathStep::Key("a".into()),
                PathStep::Key("b".into()),
                PathStep::Index(2),
                PathStep::Index(0),
                PathStep::Key("c".into()),
            ]
        );
        assert!(parse_reference("a..b").is_err());
        assert!(parse_reference("a[x]").is_err());
    }

    #[test]
    fn test_coordonnees() {
        let address = |input: serde_json::Value| {
            run(fn_coordonnees, input)
                .unwrap()
                .get("adresse")
                .and_then(Value::as_text)
                .unwrap_or_default()
        };
        assert_eq!(address(json!({"ligne": 1, "colonne": 1})), "$A$1");
        assert_eq!(address(json!({"ligne": 5, "colonne": 26})), "$Z$5");
        assert_eq!(address(json!({"ligne": 1, "colonne": 27})), "$AA$1");
        assert_eq!(address(json!({"ligne": 3, "colonne": 2, "type_reference": 4})), "B3");
        assert_eq!(address(json!({"ligne": 3, "colonne": 2, "type_reference": 2})), "B$3");
        assert_eq!(address(json!({"ligne": 3, "colonne": 2, "type_reference": 3})), "$B3");
        assert_eq!(
            address(json!({"ligne": 1, "colonne": 1, "feuille": "Mon Budget"})),
            "'Mon Budget'!$A$1"
        );
        assert!(run(fn_coordonnees, json!({"ligne": 0, "colonne": 1})).is_err());
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_letters(16_384), "XFD");
    }
}
