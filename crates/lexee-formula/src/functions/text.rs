//! Text formulas
//!
//! Lengths and positions count Unicode scalar values (chars), 1-based like a
//! spreadsheet.

use super::math::decimals;
use super::{opt, req, round, FormulaDef};
use crate::context::FormulaContext;
use crate::schema::{Category, VariableKind as Kind};
use crate::variables::{ResultMap, Variables};
use lazy_regex::regex;
use lexee_core::{FormulaError, FormulaResult, Value};

/// Repetition cap for `rept`
const MAX_REPEAT: i64 = 10_000;

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "concat",
        name: "CONCAT",
        description: "Concaténer des textes avec un séparateur",
        category: Category::Texte,
        variables: &[
            req("textes", "Textes", Kind::TextList, r#"["Jean", "Dupont"]"#),
            opt("separateur", "Séparateur", Kind::Text, " "),
            opt("ignorer_vides", "Ignorer les vides", Kind::Boolean, "true"),
        ],
        implementation: fn_concat,
        random: false,
    },
    FormulaDef {
        id: "texte_join",
        name: "JOINDRE.TEXTE",
        description: "Joindre des textes avec un délimiteur",
        category: Category::Texte,
        variables: &[
            req("textes", "Textes", Kind::TextList, r#"["a", "", "b"]"#),
            opt("delimiteur", "Délimiteur", Kind::Text, ","),
            opt("ignorer_vides", "Ignorer les vides", Kind::Boolean, "true"),
        ],
        implementation: fn_texte_join,
        random: false,
    },
    FormulaDef {
        id: "extraction_texte",
        name: "GAUCHE / DROITE / STXT",
        description: "Extraire le début, la fin et le milieu d'un texte",
        category: Category::Texte,
        variables: &[
            req("texte", "Texte", Kind::Text, "Bonjour le monde"),
            opt("nb_gauche", "Caractères à gauche", Kind::Number, "3"),
            opt("nb_droite", "Caractères à droite", Kind::Number, "3"),
            opt("position_milieu", "Position du milieu", Kind::Number, "1"),
            opt("nb_milieu", "Caractères au milieu", Kind::Number, "3"),
        ],
        implementation: fn_extraction_texte,
        random: false,
    },
    FormulaDef {
        id: "supprespace",
        name: "SUPPRESPACE",
        description: "Supprimer les espaces superflus",
        category: Category::Texte,
        variables: &[req("texte", "Texte", Kind::Text, "  Jean   Dupont  ")],
        implementation: fn_supprespace,
        random: false,
    },
    FormulaDef {
        id: "substitue",
        name: "SUBSTITUE",
        description: "Remplacer un texte par un autre (toutes ou une occurrence)",
        category: Category::Texte,
        variables: &[
            req("texte", "Texte", Kind::Text, "a-b-c-d"),
            req("ancien", "Ancien texte", Kind::Text, "-"),
            req("nouveau", "Nouveau texte", Kind::Text, "/"),
            opt("occurrence", "Occurrence", Kind::Number, "2"),
        ],
        implementation: fn_substitue,
        random: false,
    },
    FormulaDef {
        id: "texte_avant_apres",
        name: "TEXTE.AVANT / TEXTE.APRES",
        description: "Texte avant et après un délimiteur",
        category: Category::Texte,
        variables: &[
            req("texte", "Texte", Kind::Text, "prenom.nom@company.com"),
            req("delimiteur", "Délimiteur", Kind::Text, "@"),
            opt("occurrence", "Occurrence", Kind::Number, "1"),
        ],
        implementation: fn_texte_avant_apres,
        random: false,
    },
    FormulaDef {
        id: "nompropre",
        name: "NOMPROPRE",
        description: "Majuscule au début de chaque mot",
        category: Category::Texte,
        variables: &[req("texte", "Texte", Kind::Text, "jean-pierre DUPONT")],
        implementation: fn_nompropre,
        random: false,
    },
    FormulaDef {
        id: "majuscule",
        name: "MAJUSCULE",
        description: "Convertir en majuscules",
        category: Category::Texte,
        variables: &[req("texte", "Texte", Kind::Text, "hello")],
        implementation: fn_majuscule,
        random: false,
    },
    FormulaDef {
        id: "minuscule",
        name: "MINUSCULE",
        description: "Convertir en minuscules",
        category: Category::Texte,
        variables: &[req("texte", "Texte", Kind::Text, "HELLO")],
        implementation: fn_minuscule,
        random: false,
    },
    FormulaDef {
        id: "nbcar",
        name: "NBCAR",
        description: "Nombre de caractères",
        category: Category::Texte,
        variables: &[req("texte", "Texte", Kind::Text, "café")],
        implementation: fn_nbcar,
        random: false,
    },
    FormulaDef {
        id: "fractionner_texte",
        name: "FRACTIONNER.TEXTE",
        description: "Découper un texte en colonnes (et lignes)",
        category: Category::Texte,
        variables: &[
            req("texte", "Texte", Kind::Text, "a,b;c,d"),
            opt("delimiteur_col", "Délimiteur de colonnes", Kind::Text, ","),
            opt("delimiteur_ligne", "Délimiteur de lignes", Kind::Text, ";"),
            opt("ignorer_vides", "Ignorer les vides", Kind::Boolean, "false"),
        ],
        implementation: fn_fractionner_texte,
        random: false,
    },
    FormulaDef {
        id: "unicode_car",
        name: "UNICODE / UNICAR",
        description: "Code Unicode d'un caractère et caractère d'un code",
        category: Category::Texte,
        variables: &[
            opt("caractere", "Caractère", Kind::Text, "A"),
            opt("code", "Code", Kind::Number, "8364"),
        ],
        implementation: fn_unicode_car,
        random: false,
    },
    FormulaDef {
        id: "rept",
        name: "REPT",
        description: "Répéter un texte",
        category: Category::Texte,
        variables: &[
            req("texte", "Texte", Kind::Text, "ab"),
            req("nombre", "Nombre de répétitions", Kind::Number, "3"),
        ],
        implementation: fn_rept,
        random: false,
    },
    FormulaDef {
        id: "cherche",
        name: "CHERCHE",
        description: "Position d'un texte dans un autre (insensible à la casse)",
        category: Category::Texte,
        variables: &[
            req("texte_cherche", "Texte cherché", Kind::Text, "world"),
            req("texte_source", "Texte source", Kind::Text, "Hello World"),
            opt("position_debut", "Position de départ", Kind::Number, "1"),
        ],
        implementation: fn_cherche,
        random: false,
    },
    FormulaDef {
        id: "remplacer_texte",
        name: "REMPLACER",
        description: "Remplacer des caractères à une position donnée",
        category: Category::Texte,
        variables: &[
            req("texte", "Texte", Kind::Text, "Hello World"),
            req("position_debut", "Position de départ", Kind::Number, "7"),
            req("nb_caracteres", "Nombre de caractères", Kind::Number, "5"),
            req("nouveau_texte", "Nouveau texte", Kind::Text, "Rust"),
        ],
        implementation: fn_remplacer_texte,
        random: false,
    },
    FormulaDef {
        id: "valeurnomb",
        name: "VALEURNOMBRE",
        description: "Convertir un texte en nombre avec séparateurs explicites",
        category: Category::Texte,
        variables: &[
            req("texte", "Texte", Kind::Text, "1 234,56"),
            opt("sep_decimal", "Séparateur décimal", Kind::Text, ","),
            opt("sep_milliers", "Séparateur de milliers", Kind::Text, " "),
        ],
        implementation: fn_valeurnomb,
        random: false,
    },
    FormulaDef {
        id: "valeur_texte",
        name: "VALEUR",
        description: "Convertir un texte en nombre (séparateurs, %, devises détectés)",
        category: Category::Texte,
        variables: &[req("texte", "Texte", Kind::Text, "1 250,50 €")],
        implementation: fn_valeur_texte,
        random: false,
    },
    FormulaDef {
        id: "ctxt",
        name: "CTXT",
        description: "Formater un nombre avec un nombre fixe de décimales",
        category: Category::Texte,
        variables: &[
            req("nombre", "Nombre", Kind::Number, "1234.5678"),
            opt("decimales", "Décimales", Kind::Number, "2"),
            opt("pas_separateur", "Sans séparateur de milliers", Kind::Boolean, "false"),
        ],
        implementation: fn_ctxt,
        random: false,
    },
];

/// Render every entry; drop whitespace-only ones when asked
fn collect_texts(v: &Variables, skip_blank: bool) -> FormulaResult<Vec<String>> {
    let texts = v
        .list("textes")?
        .iter()
        .map(Value::render)
        .filter(|t| !skip_blank || !t.trim().is_empty())
        .collect();
    Ok(texts)
}

/// Non-negative count argument
fn count(v: &Variables, name: &str, default: i64) -> FormulaResult<usize> {
    let n = v.integer_or(name, default)?;
    usize::try_from(n).map_err(|_| FormulaError::domain(format!("'{}' must not be negative", name)))
}

/// 1-based position argument
fn position(v: &Variables, name: &str, default: i64) -> FormulaResult<usize> {
    let n = v.integer_or(name, default)?;
    usize::try_from(n)
        .ok()
        .filter(|&p| p >= 1)
        .ok_or_else(|| FormulaError::domain(format!("'{}' must be at least 1", name)))
}

/// CONCAT
fn fn_concat(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let texts = collect_texts(v, v.flag_or("ignorer_vides", true)?)?;
    let separator = v.text_or("separateur", "")?;
    Ok(ResultMap::new().with("resultat", texts.join(&separator)))
}

/// JOINDRE.TEXTE
fn fn_texte_join(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let texts = collect_texts(v, v.flag_or("ignorer_vides", true)?)?;
    let delimiter = v.text_or("delimiteur", "")?;
    Ok(ResultMap::new()
        .with("resultat", texts.join(&delimiter))
        .with("nb_elements", texts.len()))
}

/// GAUCHE / DROITE / STXT
fn fn_extraction_texte(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let chars: Vec<char> = v.text("texte")?.chars().collect();
    let left = count(v, "nb_gauche", 3)?.min(chars.len());
    let right = count(v, "nb_droite", 3)?.min(chars.len());
    let start = position(v, "position_milieu", 1)? - 1;
    let middle = count(v, "nb_milieu", 3)?;

    Ok(ResultMap::new()
        .with("gauche", chars[..left].iter().collect::<String>())
        .with("droite", chars[chars.len() - right..].iter().collect::<String>())
        .with(
            "milieu",
            chars.iter().skip(start).take(middle).collect::<String>(),
        )
        .with("longueur_totale", chars.len()))
}

/// SUPPRESPACE
fn fn_supprespace(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let text = v.text("texte")?;
    let cleaned = regex!(r"\s+").replace_all(text.trim(), " ").into_owned();
    Ok(ResultMap::new()
        .with("espaces_supprimes", text.chars().count() - cleaned.chars().count())
        .with("resultat", cleaned))
}

/// SUBSTITUE
fn fn_substitue(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let text = v.text("texte")?;
    let old = v.text("ancien")?;
    let new = v.text("nouveau")?;
    if old.is_empty() {
        return Err(FormulaError::domain("the text to replace is empty"));
    }

    let (result, replaced) = match v.get("occurrence") {
        None => (text.replace(&old, &new), text.matches(old.as_str()).count()),
        Some(_) => {
            let nth = position(v, "occurrence", 1)?;
            match text.match_indices(old.as_str()).nth(nth - 1) {
                Some((at, _)) => {
                    let mut out = String::with_capacity(text.len());
                    out.push_str(&text[..at]);
                    out.push_str(&new);
                    out.push_str(&text[at + old.len()..]);
                    (out, 1)
                }
                None => (text.clone(), 0),
            }
        }
    };

    Ok(ResultMap::new()
        .with("resultat", result)
        .with("remplacements", replaced))
}

/// TEXTE.AVANT / TEXTE.APRES
fn fn_texte_avant_apres(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let text = v.text("texte")?;
    let delimiter = v.text("delimiteur")?;
    if delimiter.is_empty() {
        return Err(FormulaError::domain("the delimiter is empty"));
    }
    let nth = position(v, "occurrence", 1)?;

    match text.match_indices(delimiter.as_str()).nth(nth - 1) {
        Some((at, _)) => Ok(ResultMap::new()
            .with("avant", &text[..at])
            .with("apres", &text[at + delimiter.len()..])
            .with("trouve", true)),
        None => Ok(ResultMap::new()
            .with("avant", Value::Null)
            .with("apres", Value::Null)
            .with("trouve", false)),
    }
}

/// Capitalize the first letter of every run of letters
fn proper_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// NOMPROPRE
fn fn_nompropre(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    Ok(ResultMap::new().with("resultat", proper_case(&v.text("texte")?)))
}

/// MAJUSCULE
fn fn_majuscule(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    Ok(ResultMap::new().with("resultat", v.text("texte")?.to_uppercase()))
}

/// MINUSCULE
fn fn_minuscule(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    Ok(ResultMap::new().with("resultat", v.text("texte")?.to_lowercase()))
}

/// NBCAR
fn fn_nbcar(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    Ok(ResultMap::new().with("longueur", v.text("texte")?.chars().count()))
}

/// FRACTIONNER.TEXTE
fn fn_fractionner_texte(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let text = v.text("texte")?;
    let col_delimiter = v.text_or("delimiteur_col", ",")?;
    let row_delimiter = v.optional_text("delimiteur_ligne")?.filter(|d| !d.is_empty());
    let skip_blank = v.flag_or("ignorer_vides", false)?;
    if col_delimiter.is_empty() {
        return Err(FormulaError::domain("the column delimiter is empty"));
    }

    let split_cols = |line: &str| -> Vec<String> {
        line.split(col_delimiter.as_str())
            .filter(|cell| !skip_blank || !cell.is_empty())
            .map(str::to_string)
            .collect()
    };

    match row_delimiter {
        Some(row_delimiter) => {
            let rows: Vec<Vec<String>> = text
                .split(row_delimiter.as_str())
                .filter(|line| !skip_blank || !line.is_empty())
                .map(split_cols)
                .collect();
            let cells = rows.iter().map(Vec::len).sum::<usize>();
            Ok(ResultMap::new()
                .with("resultat", rows)
                .with("nb_elements", cells))
        }
        None => {
            let cells = split_cols(&text);
            Ok(ResultMap::new()
                .with("nb_elements", cells.len())
                .with("resultat", cells))
        }
    }
}

/// UNICODE / UNICAR
fn fn_unicode_car(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let from_char = match v.optional_text("caractere")? {
        Some(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => {
                    return Err(FormulaError::domain(
                        "'caractere' must be exactly one character",
                    ))
                }
            }
        }
        None => None,
    };
    let from_code = match v.get("code") {
        Some(_) => {
            let code = v.integer("code")?;
            let c = u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| FormulaError::domain(format!("{} is not a valid code point", code)))?;
            Some(c)
        }
        None => None,
    };

    let (code_char, shown_char) = match (from_char, from_code) {
        (Some(c), Some(d)) => (c, d),
        (Some(c), None) => (c, c),
        (None, Some(d)) => (d, d),
        (None, None) => return Err(FormulaError::missing("caractere")),
    };
    Ok(ResultMap::new()
        .with("code_unicode", u32::from(code_char))
        .with("caractere", shown_char))
}

/// REPT
fn fn_rept(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let text = v.text("texte")?;
    let n = v.integer("nombre")?;
    if !(0..=MAX_REPEAT).contains(&n) {
        return Err(FormulaError::domain(format!(
            "repetitions must be between 0 and {}",
            MAX_REPEAT
        )));
    }
    let repeated = text.repeat(n as usize);
    Ok(ResultMap::new()
        .with("longueur", repeated.chars().count())
        .with("resultat", repeated))
}

/// CHERCHE (SEARCH)
fn fn_cherche(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let needle: Vec<char> = v.text("texte_cherche")?.chars().collect();
    let source: Vec<char> = v.text("texte_source")?.chars().collect();
    let start = position(v, "position_debut", 1)? - 1;
    if start > source.len() {
        return Err(FormulaError::domain("start position is past the end of the text"));
    }

    let same = |a: char, b: char| a == b || a.to_lowercase().eq(b.to_lowercase());
    let found = (start..=source.len().saturating_sub(needle.len()))
        .filter(|&i| i + needle.len() <= source.len())
        .find(|&i| needle.iter().enumerate().all(|(j, &c)| same(source[i + j], c)));

    match found {
        Some(i) => Ok(ResultMap::new()
            .with("position", i + 1)
            .with("trouve", true)),
        None => Err(FormulaError::domain("text not found")),
    }
}

/// REMPLACER
fn fn_remplacer_texte(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let chars: Vec<char> = v.text("texte")?.chars().collect();
    let start = (position(v, "position_debut", 1)? - 1).min(chars.len());
    let len = count(v, "nb_caracteres", 0)?;
    let end = start.saturating_add(len).min(chars.len());
    let replacement = v.text("nouveau_texte")?;

    let mut out: String = chars[..start].iter().collect();
    out.push_str(&replacement);
    out.extend(&chars[end..]);
    Ok(ResultMap::new().with("resultat", out))
}

/// Parse cleaned numeric text: optional parentheses for negatives, trailing `%`
fn parse_clean(original: &str, cleaned: &str) -> FormulaResult<f64> {
    let invalid = || FormulaError::domain(format!("'{}' is not a number", original));

    let mut body = cleaned;
    let mut negate = false;
    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        body = inner;
        negate = true;
    }
    let percents = body.len() - body.trim_end_matches('%').len();
    body = body.trim_end_matches('%');

    let mut n: f64 = body.parse().map_err(|_| invalid())?;
    if !n.is_finite() {
        return Err(invalid());
    }
    for _ in 0..percents {
        n /= 100.0;
    }
    Ok(if negate { -n } else { n })
}

/// Drop whitespace (including no-break spaces) and currency marks
fn strip_decorations(text: &str) -> String {
    let no_space = regex!(r"[\s\u{a0}\u{202f}]+").replace_all(text, "");
    regex!(r"(?i)[€$£¥₣]|\b(?:eur|usd|gbp|chf)\b")
        .replace_all(&no_space, "")
        .into_owned()
}

/// VALEURNOMBRE (NUMBERVALUE)
fn fn_valeurnomb(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let text = v.text("texte")?;
    let decimal = v.text_or("sep_decimal", ".")?;
    let thousands = v.text_or("sep_milliers", ",")?;
    if decimal.is_empty() || decimal == thousands {
        return Err(FormulaError::domain(
            "decimal separator must be set and differ from the thousands separator",
        ));
    }

    let mut cleaned = text.clone();
    if !thousands.trim().is_empty() {
        cleaned = cleaned.replace(&thousands, "");
    }
    cleaned = strip_decorations(&cleaned).replace(&decimal, ".");

    let n = parse_clean(&text, &cleaned)?;
    Ok(ResultMap::new().with("nombre", round(n, 10)))
}

/// Guess the decimal separator of text holding only digits, `,` and `.`
fn normalize_separators(digits: &str) -> String {
    let last_comma = digits.rfind(',');
    let last_dot = digits.rfind('.');
    match (last_comma, last_dot) {
        // Both present: the later one is the decimal separator
        (Some(c), Some(d)) if c > d => digits.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => digits.replace(',', ""),
        (Some(c), None) => {
            let single = digits.matches(',').count() == 1;
            let tail = digits[c + 1..].chars().take_while(char::is_ascii_digit).count();
            if single && tail != 3 {
                digits.replace(',', ".")
            } else {
                digits.replace(',', "")
            }
        }
        (None, Some(_)) if digits.matches('.').count() > 1 => digits.replace('.', ""),
        _ => digits.to_string(),
    }
}

/// VALEUR
fn fn_valeur_texte(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let text = v.text("texte")?;
    let cleaned = normalize_separators(&strip_decorations(&text));
    let n = parse_clean(&text, &cleaned)?;
    Ok(ResultMap::new().with("nombre", round(n, 10)))
}

/// Insert `,` between thousands groups of an unsigned digit string
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// CTXT (FIXED)
fn fn_ctxt(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let n = v.number("nombre")?;
    let digits = decimals(v.integer_or("decimales", 2)?)?;
    let plain = v.flag_or("pas_separateur", false)?;

    let rounded = round(n, digits);
    let formatted = format!("{:.*}", digits.max(0) as usize, rounded.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };

    let mut out = String::new();
    if rounded < 0.0 {
        out.push('-');
    }
    if plain {
        out.push_str(&int_part);
    } else {
        out.push_str(&group_thousands(&int_part));
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(&frac);
    }
    Ok(ResultMap::new().with("resultat", out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::{num, run};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn text(r: &ResultMap, key: &str) -> String {
        r.get(key).and_then(Value::as_text).unwrap_or_default()
    }

    #[test]
    fn test_concat_and_join() {
        let r = run(fn_concat, json!({"textes": ["Jean", " ", "Dupont"], "separateur": " "})).unwrap();
        assert_eq!(text(&r, "resultat"), "Jean Dupont");

        let r = run(fn_texte_join, json!({"textes": ["Hello", "World"], "delimiteur": " "})).unwrap();
        assert_eq!(text(&r, "resultat"), "Hello World");
        let r = run(
            fn_texte_join,
            json!({"textes": ["a", "", "b", null, "c"], "delimiteur": ",", "ignorer_vides": true}),
        )
        .unwrap();
        assert_eq!(text(&r, "resultat"), "a,b,c");
        assert_eq!(r.get("nb_elements"), Some(&Value::Integer(3)));
        let r = run(
            fn_texte_join,
            json!({"textes": ["a", "", "b"], "delimiteur": "-", "ignorer_vides": false}),
        )
        .unwrap();
        assert_eq!(text(&r, "resultat"), "a--b");
    }

    #[test]
    fn test_extraction_texte() {
        let r = run(
            fn_extraction_texte,
            json!({"texte": "Été indien", "nb_gauche": 3, "nb_droite": 6, "position_milieu": 5, "nb_milieu": 2}),
        )
        .unwrap();
        assert_eq!(text(&r, "gauche"), "Été");
        assert_eq!(text(&r, "droite"), "indien");
        assert_eq!(text(&r, "milieu"), "in");
        assert_eq!(r.get("longueur_totale"), Some(&Value::Integer(10)));

        let r = run(fn_extraction_texte, json!({"texte": "ab", "nb_droite": 0})).unwrap();
        assert_eq!(text(&r, "gauche"), "ab");
        assert_eq!(text(&r, "droite"), "");
    }

    #[test]
    fn test_supprespace() {
        let r = run(fn_supprespace, json!({"texte": "  Jean   Dupont  "})).unwrap();
        assert_eq!(text(&r, "resultat"), "Jean Dupont");
        assert_eq!(r.get("espaces_supprimes"), Some(&Value::Integer(6)));
        let r = run(fn_supprespace, json!({"texte": "a\t\tb\n\nc"})).unwrap();
        assert_eq!(text(&r, "resultat"), "a b c");
    }

    #[test]
    fn test_substitue() {
        let r = run(fn_substitue, json!({"texte": "aaa", "ancien": "a", "nouveau": "b"})).unwrap();
        assert_eq!(text(&r, "resultat"), "bbb");
        assert_eq!(r.get("remplacements"), Some(&Value::Integer(3)));

        let r = run(
            fn_substitue,
            json!({"texte": "a-b-c-d", "ancien": "-", "nouveau": "/", "occurrence": 2}),
        )
        .unwrap();
        assert_eq!(text(&r, "resultat"), "a-b/c-d");
        assert_eq!(r.get("remplacements"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_texte_avant_apres() {
        let r = run(
            fn_texte_avant_apres,
            json!({"texte": "prenom.nom@company.com", "delimiteur": "@"}),
        )
        .unwrap();
        assert_eq!(text(&r, "avant"), "prenom.nom");
        assert_eq!(text(&r, "apres"), "company.com");

        let r = run(
            fn_texte_avant_apres,
            json!({"texte": "a.b.c", "delimiteur": ".", "occurrence": 2}),
        )
        .unwrap();
        assert_eq!(text(&r, "avant"), "a.b");
        let r = run(fn_texte_avant_apres, json!({"texte": "abc", "delimiteur": "@"})).unwrap();
        assert_eq!(r.get("trouve"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_case_functions() {
        let r = run(fn_nompropre, json!({"texte": "jean DUPONT"})).unwrap();
        assert_eq!(text(&r, "resultat"), "Jean Dupont");
        let r = run(fn_nompropre, json!({"texte": "jean-pierre"})).unwrap();
        assert_eq!(text(&r, "resultat"), "Jean-Pierre");
        let r = run(fn_majuscule, json!({"texte": "hello"})).unwrap();
        assert_eq!(text(&r, "resultat"), "HELLO");
        let r = run(fn_minuscule, json!({"texte": "HELLO"})).unwrap();
        assert_eq!(text(&r, "resultat"), "hello");
    }

    #[test]
    fn test_nbcar() {
        assert_eq!(num(&run(fn_nbcar, json!({"texte": "Hello"})).unwrap(), "longueur"), 5.0);
        assert_eq!(num(&run(fn_nbcar, json!({"texte": ""})).unwrap(), "longueur"), 0.0);
        assert_eq!(num(&run(fn_nbcar, json!({"texte": "café"})).unwrap(), "longueur"), 4.0);
    }

    #[test]
    fn test_fractionner_texte() {
        let r = run(fn_fractionner_texte, json!({"texte": "a,b,c", "delimiteur_col": ","})).unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::from(vec!["a", "b", "c"])));
        let r = run(
            fn_fractionner_texte,
            json!({"texte": "a,b;c,d", "delimiteur_col": ",", "delimiteur_ligne": ";"}),
        )
        .unwrap();
        assert_eq!(
            r.get("resultat"),
            Some(&Value::from(vec![vec!["a", "b"], vec!["c", "d"]]))
        );
        assert_eq!(r.get("nb_elements"), Some(&Value::Integer(4)));
        let r = run(fn_fractionner_texte, json!({"texte": "a,,b", "ignorer_vides": true})).unwrap();
        assert_eq!(r.get("resultat"), Some(&Value::from(vec!["a", "b"])));
    }

    #[test]
    fn test_unicode_car() {
        let r = run(fn_unicode_car, json!({"caractere": "A"})).unwrap();
        assert_eq!(r.get("code_unicode"), Some(&Value::Integer(65)));
        let r = run(fn_unicode_car, json!({"code": 8364})).unwrap();
        assert_eq!(text(&r, "caractere"), "€");
        let r = run(fn_unicode_car, json!({"caractere": "Z", "code": 90})).unwrap();
        assert_eq!(r.get("code_unicode"), Some(&Value::Integer(90)));
        assert_eq!(text(&r, "caractere"), "Z");
        assert!(run(fn_unicode_car, json!({"caractere": "AB"})).is_err());
        assert!(run(fn_unicode_car, json!({"code": 55296})).is_err());
    }

    #[test]
    fn test_rept() {
        let r = run(fn_rept, json!({"texte": "abc", "nombre": 3})).unwrap();
        assert_eq!(text(&r, "resultat"), "abcabcabc");
        let r = run(fn_rept, json!({"texte": "x", "nombre": 0})).unwrap();
        assert_eq!(text(&r, "resultat"), "");
        assert!(run(fn_rept, json!({"texte": "x", "nombre": 10001})).is_err());
    }

    #[test]
    fn test_cherche() {
        let r = run(fn_cherche, json!({"texte_cherche": "world", "texte_source": "Hello World"})).unwrap();
        assert_eq!(r.get("position"), Some(&Value::Integer(7)));
        let r = run(fn_cherche, json!({"texte_cherche": "HELLO", "texte_source": "hello world"})).unwrap();
        assert_eq!(r.get("position"), Some(&Value::Integer(1)));
        let r = run(
            fn_cherche,
            json!({"texte_cherche": "o", "texte_source": "hello world", "position_debut": 6}),
        )
        .unwrap();
        assert_eq!(r.get("position"), Some(&Value::Integer(8)));
        assert!(run(fn_cherche, json!({"texte_cherche": "xyz", "texte_source": "hello"})).is_err());
    }

    #[test]
    fn test_remplacer_texte() {
        let r = run(
            fn_remplacer_texte,
            json!({"texte": "Hello World", "position_debut": 7, "nb_caracteres": 5, "nouveau_texte": "Rust"}),
        )
        .unwrap();
        assert_eq!(text(&r, "resultat"), "Hello Rust");
        let r = run(
            fn_remplacer_texte,
            json!({"texte": "AC", "position_debut": 2, "nb_caracteres": 0, "nouveau_texte": "B"}),
        )
        .unwrap();
        assert_eq!(text(&r, "resultat"), "ABC");
    }

    #[test]
    fn test_valeurnomb() {
        let r = run(
            fn_valeurnomb,
            json!({"texte": "1 234,56", "sep_decimal": ",", "sep_milliers": " "}),
        )
        .unwrap();
        assert_eq!(num(&r, "nombre"), 1234.56);
        assert_eq!(num(&run(fn_valeurnomb, json!({"texte": "$42.99"})).unwrap(), "nombre"), 42.99);
        assert_eq!(num(&run(fn_valeurnomb, json!({"texte": "3.14"})).unwrap(), "nombre"), 3.14);
        assert!(run(fn_valeurnomb, json!({"texte": "abc"})).is_err());
    }

    #[test]
    fn test_valeur_texte() {
        let n = |t: &str| num(&run(fn_valeur_texte, json!({ "texte": t })).unwrap(), "nombre");
        assert_eq!(n("42.5"), 42.5);
        assert_eq!(n("1 250,50 €"), 1250.5);
        assert_eq!(n("25%"), 0.25);
        assert_eq!(n("1,250"), 1250.0);
        assert_eq!(n("1.234.567,8"), 1234567.8);
        assert_eq!(n("(100)"), -100.0);
        assert!(run(fn_valeur_texte, json!({"texte": "n/a"})).is_err());
    }

    #[test]
    fn test_ctxt() {
        let r = run(fn_ctxt, json!({"nombre": 1234.5678, "decimales": 2})).unwrap();
        assert_eq!(text(&r, "resultat"), "1,234.57");
        let r = run(fn_ctxt, json!({"nombre": 1234.5678, "decimales": 2, "pas_separateur": true})).unwrap();
        assert_eq!(text(&r, "resultat"), "1234.57");
        let r = run(fn_ctxt, json!({"nombre": 42.99, "decimales": 0})).unwrap();
        assert_eq!(text(&r, "resultat"), "43");
        let r = run(fn_ctxt, json!({"nombre": -1234567.891, "decimales": 1})).unwrap();
        assert_eq!(text(&r, "resultat"), "-1,234,567.9");
    }
}
