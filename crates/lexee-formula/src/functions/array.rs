//! Dynamic-array formulas: deduplication, filtering, sorting and reshaping
//!
//! Most of these are thin wrappers over [`crate::tabular`]. "Rows" may be
//! scalars or maps; only `trierpar`, `choisircols` and `filtre` require maps.

use super::{opt, req, FormulaDef};
use crate::context::FormulaContext;
use crate::criteria::matches_all;
use crate::schema::{Category, VariableKind as Kind};
use crate::tabular::{self, Grid};
use crate::variables::{ResultMap, Row, Variables};
use ahash::AHashSet;
use lexee_core::{FormulaError, FormulaResult, Value};
use std::cmp::Ordering;

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "unique",
        name: "UNIQUE",
        description: "Supprimer les doublons (insensible à la casse)",
        category: Category::Donnees,
        variables: &[req("valeurs", "Valeurs", Kind::List, r#"["Paris", "paris ", "Lyon"]"#)],
        implementation: fn_unique,
        random: false,
    },
    FormulaDef {
        id: "filtre",
        name: "FILTRE",
        description: "Lignes répondant à tous les critères",
        category: Category::Donnees,
        variables: &[
            req("donnees", "Données (table JSON)", Kind::Table, r#"[{"statut":"actif"}]"#),
            req("criteres", "Critères (JSON)", Kind::List, r#"[{"colonne":"statut","valeur":"actif"}]"#),
        ],
        implementation: fn_filtre,
        random: false,
    },
    FormulaDef {
        id: "trier",
        name: "TRIER",
        description: "Trier une liste de valeurs",
        category: Category::Donnees,
        variables: &[
            req("valeurs", "Valeurs", Kind::List, "5, 3, 1, 4, 2"),
            opt("ordre", "Ordre (asc/desc)", Kind::Text, "asc"),
        ],
        implementation: fn_trier,
        random: false,
    },
    FormulaDef {
        id: "trierpar",
        name: "TRIERPAR",
        description: "Trier des lignes selon une colonne",
        category: Category::Donnees,
        variables: &[
            req("donnees", "Données (table JSON)", Kind::Table, r#"[{"nom":"Bob","score":70}]"#),
            req("colonne_tri", "Colonne de tri", Kind::Text, "score"),
            opt("ordre", "Ordre (asc/desc)", Kind::Text, "asc"),
        ],
        implementation: fn_trierpar,
        random: false,
    },
    FormulaDef {
        id: "choisircols",
        name: "CHOISIRCOLS",
        description: "Garder certaines colonnes d'une table",
        category: Category::Donnees,
        variables: &[
            req("donnees", "Données (table JSON)", Kind::Table, r#"[{"a":1,"b":2,"c":3}]"#),
            req("colonnes", "Colonnes", Kind::TextList, r#"["a", "c"]"#),
        ],
        implementation: fn_choisircols,
        random: false,
    },
    FormulaDef {
        id: "vstack",
        name: "ASSEMB.V",
        description: "Empiler des tableaux verticalement",
        category: Category::Donnees,
        variables: &[req("tableaux", "Tableaux", Kind::List, "[[1, 2], [3, 4]]")],
        implementation: fn_vstack,
        random: false,
    },
    FormulaDef {
        id: "choisir_lignes",
        name: "CHOISIRLIGNES",
        description: "Lignes aux positions données (négatif = depuis la fin)",
        category: Category::GestionDonnees,
        variables: &[
            req("donnees", "Données", Kind::List, r#"["A", "B", "C", "D"]"#),
            req("indices", "Indices", Kind::NumberList, "1, -1"),
        ],
        implementation: fn_choisir_lignes,
        random: false,
    },
    FormulaDef {
        id: "prendre",
        name: "PRENDRE",
        description: "Premières (ou dernières si négatif) lignes",
        category: Category::GestionDonnees,
        variables: &[
            req("donnees", "Données", Kind::List, "10, 20, 30, 40, 50"),
            req("nb_lignes", "Nombre de lignes", Kind::Number, "3"),
        ],
        implementation: fn_prendre,
        random: false,
    },
    FormulaDef {
        id: "exclure",
        name: "EXCLURE",
        description: "Retirer les premières (ou dernières si négatif) lignes",
        category: Category::GestionDonnees,
        variables: &[
            req("donnees", "Données", Kind::List, "10, 20, 30, 40, 50"),
            req("nb_lignes", "Nombre de lignes", Kind::Number, "2"),
        ],
        implementation: fn_exclure,
        random: false,
    },
    FormulaDef {
        id: "developper",
        name: "DEVELOPPER",
        description: "Compléter (ou tronquer) une liste à une taille donnée",
        category: Category::GestionDonnees,
        variables: &[
            req("donnees", "Données", Kind::List, r#"["A", "B"]"#),
            req("nb_lignes", "Nombre de lignes", Kind::Number, "5"),
            opt("valeur_defaut", "Valeur de remplissage", Kind::Any, "N/A"),
        ],
        implementation: fn_developper,
        random: false,
    },
    FormulaDef {
        id: "danscol",
        name: "DANSCOL",
        description: "Aplatir un tableau 2D en une colonne",
        category: Category::GestionDonnees,
        variables: &[req("donnees", "Données", Kind::List, "[[1, 2], [3, 4]]")],
        implementation: fn_danscol,
        random: false,
    },
    FormulaDef {
        id: "dansligne",
        name: "DANSLIGNE",
        description: "Aplatir un tableau 2D en une ligne",
        category: Category::GestionDonnees,
        variables: &[req("donnees", "Données", Kind::List, "[[1, 2, 3], [4, 5, 6]]")],
        implementation: fn_dansligne,
        random: false,
    },
    FormulaDef {
        id: "wraprows_wrapcols",
        name: "ORGA.LIGNES / ORGA.COLS",
        description: "Réorganiser une liste en lignes ou colonnes de taille fixe",
        category: Category::GestionDonnees,
        variables: &[
            req("valeurs", "Valeurs", Kind::List, "1, 2, 3, 4, 5, 6"),
            req("taille", "Taille", Kind::Number, "3"),
            opt("mode", "Mode (rows/cols)", Kind::Text, "rows"),
            opt("valeur_pad", "Valeur de remplissage", Kind::Any, "0"),
        ],
        implementation: fn_wraprows_wrapcols,
        random: false,
    },
    FormulaDef {
        id: "assemb_h",
        name: "ASSEMB.H",
        description: "Assembler des tableaux côte à côte en colonnes",
        category: Category::GestionDonnees,
        variables: &[
            req("tableaux", "Tableaux", Kind::List, "[[1, 2, 3], [4, 5, 6]]"),
            opt("valeur_pad", "Valeur de remplissage", Kind::Any, ""),
        ],
        implementation: fn_assemb_h,
        random: false,
    },
    FormulaDef {
        id: "flatten",
        name: "APLATIR",
        description: "Aplatir récursivement des listes imbriquées",
        category: Category::Ingenierie,
        variables: &[req("donnees", "Données", Kind::List, "[[1, 2], [3, [4, 5]]]")],
        implementation: fn_flatten,
        random: false,
    },
];

/// Sort direction from `ordre`
fn descending(v: &Variables) -> FormulaResult<bool> {
    match v.text_or("ordre", "asc")?.trim().to_lowercase().as_str() {
        "asc" => Ok(false),
        "desc" => Ok(true),
        other => Err(FormulaError::domain(format!("unknown order '{}'", other))),
    }
}

/// Sort order for mixed values: numbers, then text (case-insensitive), then the rest
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Integer(_) | Value::Number(_) => 0,
            Value::Text(_) => 1,
            Value::Bool(_) => 2,
            Value::List(_) | Value::Map(_) => 3,
            Value::Null => 4,
        }
    }

    match (a, b) {
        (Value::Text(x), Value::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => match (a.is_numeric(), b.is_numeric()) {
            (true, true) => {
                let x = a.as_number().unwrap_or(f64::NAN);
                let y = b.as_number().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

/// UNIQUE
fn fn_unique(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let items = v.list("valeurs")?;
    let mut seen = AHashSet::new();
    let uniques: Vec<Value> = items
        .iter()
        .filter(|item| seen.insert(item.render().trim().to_lowercase()))
        .cloned()
        .collect();

    Ok(ResultMap::new()
        .with("doublons_supprimes", items.len() - uniques.len())
        .with("total_initial", items.len())
        .with("valeurs_uniques", uniques))
}

fn rows_to_values(rows: Vec<&Row>) -> Vec<Value> {
    rows.into_iter().map(|row| Value::Map(row.clone())).collect()
}

/// FILTRE
fn fn_filtre(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let rows = v.table("donnees")?;
    let criteria = v.criteria("criteres")?;
    let total = rows.len();
    let kept: Vec<&Row> = rows.into_iter().filter(|row| matches_all(row, &criteria)).collect();

    Ok(ResultMap::new()
        .with("lignes_filtrees", kept.len())
        .with("lignes_totales", total)
        .with("resultats", rows_to_values(kept)))
}

/// TRIER
fn fn_trier(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let mut items = v.list("valeurs")?.to_vec();
    let desc = descending(v)?;
    items.sort_by(|a, b| {
        let order = compare_values(a, b);
        if desc {
            order.reverse()
        } else {
            order
        }
    });
    Ok(ResultMap::new().with("resultat", items))
}

/// TRIERPAR
fn fn_trierpar(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let mut rows = v.table("donnees")?;
    let column = v.text("colonne_tri")?;
    let desc = descending(v)?;

    // Rows without the column always go last
    rows.sort_by(|a, b| match (a.get(&column), b.get(&column)) {
        (Some(x), Some(y)) => {
            let order = compare_values(x, y);
            if desc {
                order.reverse()
            } else {
                order
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(ResultMap::new().with("resultat", rows_to_values(rows)))
}

/// CHOISIRCOLS
fn fn_choisircols(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let rows = v.table("donnees")?;
    let columns = v.texts("colonnes")?;
    if columns.is_empty() {
        return Err(FormulaError::domain("at least one column is required"));
    }
    if let Some(missing) = columns
        .iter()
        .find(|c| !rows.is_empty() && rows.iter().all(|row| !row.contains_key(c.as_str())))
    {
        return Err(FormulaError::domain(format!("unknown column '{}'", missing)));
    }

    let projected: Vec<Value> = rows
        .iter()
        .map(|row| {
            Value::Map(
                columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|cell| (c.clone(), cell.clone())))
                    .collect(),
            )
        })
        .collect();
    Ok(ResultMap::new().with("resultat", projected))
}

/// ASSEMB.V
fn fn_vstack(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let stacked = tabular::stack_vertical(v.list("tableaux")?)?;
    Ok(ResultMap::new()
        .with("total_lignes", stacked.len())
        .with("resultat", stacked))
}

/// CHOISIRLIGNES
fn fn_choisir_lignes(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let items = v.list("donnees")?;
    let indices = v
        .numbers("indices")?
        .into_iter()
        .map(|i| i.trunc() as i64)
        .collect::<Vec<_>>();
    let picked = tabular::select(items, &indices)?;
    Ok(ResultMap::new()
        .with("nb_lignes", picked.len())
        .with("resultat", picked))
}

/// PRENDRE
fn fn_prendre(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let taken = tabular::take(v.list("donnees")?, v.integer("nb_lignes")?);
    Ok(ResultMap::new().with("resultat", taken))
}

/// EXCLURE
fn fn_exclure(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let kept = tabular::skip(v.list("donnees")?, v.integer("nb_lignes")?);
    Ok(ResultMap::new().with("resultat", kept))
}

/// DEVELOPPER
fn fn_developper(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let items = v.list("donnees")?;
    let len = usize::try_from(v.integer("nb_lignes")?)
        .map_err(|_| FormulaError::domain("row count must not be negative"))?;
    let pad = v.get("valeur_defaut").cloned().unwrap_or_default();
    Ok(ResultMap::new().with("resultat", tabular::expand(items, len, &pad)?))
}

/// Flatten one level, row by row
fn flatten_grid(v: &Variables) -> FormulaResult<ResultMap> {
    let flat = tabular::stack_vertical(v.list("donnees")?)?;
    Ok(ResultMap::new().with("total", flat.len()).with("resultat", flat))
}

/// DANSCOL
fn fn_danscol(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    flatten_grid(v)
}

/// DANSLIGNE
fn fn_dansligne(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    flatten_grid(v)
}

fn grid_result(grid: Grid) -> ResultMap {
    let rows = grid.len();
    let cols = grid.first().map_or(0, Vec::len);
    ResultMap::new()
        .with("lignes", rows)
        .with("colonnes", cols)
        .with("resultat", grid)
}

/// ORGA.LIGNES / ORGA.COLS
fn fn_wraprows_wrapcols(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let items = v.list("valeurs")?;
    let size = usize::try_from(v.integer("taille")?)
        .map_err(|_| FormulaError::domain("wrap size must be at least 1"))?;
    let pad = v.get("valeur_pad").cloned().unwrap_or_default();

    let grid = match v.text_or("mode", "rows")?.trim().to_lowercase().as_str() {
        "rows" => tabular::wrap_rows(items, size, &pad)?,
        "cols" => tabular::wrap_cols(items, size, &pad)?,
        other => return Err(FormulaError::domain(format!("unknown mode '{}'", other))),
    };
    Ok(grid_result(grid))
}

/// ASSEMB.H
fn fn_assemb_h(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let columns: Vec<Vec<Value>> = v
        .list("tableaux")?
        .iter()
        .map(|array| match array {
            Value::List(items) => items.clone(),
            scalar => vec![scalar.clone()],
        })
        .collect();
    let pad = v.get("valeur_pad").cloned().unwrap_or_default();
    Ok(grid_result(tabular::stack_horizontal(&columns, &pad)?))
}

/// Recursive flatten
fn fn_flatten(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let flat = tabular::flatten(v.list("donnees")?);
    Ok(ResultMap::new().with("total", flat.len()).with("resultat", flat))
}
