//! Formula schemas
//!
//! A schema names a formula's inputs and their semantic types so a caller can
//! build a form for it. Schemas are introspection only: formulas validate
//! their own inputs at execution time.

use serde::Serialize;

/// Catalog category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    #[serde(rename = "Mathématiques")]
    Mathematiques,
    #[serde(rename = "Logique")]
    Logique,
    #[serde(rename = "Recherche")]
    Recherche,
    #[serde(rename = "Statistiques")]
    Statistiques,
    #[serde(rename = "Texte")]
    Texte,
    #[serde(rename = "Dates")]
    Dates,
    #[serde(rename = "Données")]
    Donnees,
    #[serde(rename = "Finance")]
    Finance,
    #[serde(rename = "Audit Financier")]
    AuditFinancier,
    #[serde(rename = "Ingénierie")]
    Ingenierie,
    #[serde(rename = "Statistiques Avancées")]
    StatistiquesAvancees,
    #[serde(rename = "Gestion de Données")]
    GestionDonnees,
}

impl Category {
    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Mathematiques => "Mathématiques",
            Category::Logique => "Logique",
            Category::Recherche => "Recherche",
            Category::Statistiques => "Statistiques",
            Category::Texte => "Texte",
            Category::Dates => "Dates",
            Category::Donnees => "Données",
            Category::Finance => "Finance",
            Category::AuditFinancier => "Audit Financier",
            Category::Ingenierie => "Ingénierie",
            Category::StatistiquesAvancees => "Statistiques Avancées",
            Category::GestionDonnees => "Gestion de Données",
        }
    }
}

/// Semantic type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VariableKind {
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "boolean")]
    Boolean,
    /// Any scalar
    #[serde(rename = "value")]
    Any,
    #[serde(rename = "number[]")]
    NumberList,
    #[serde(rename = "text[]")]
    TextList,
    /// List of arbitrary values
    #[serde(rename = "list")]
    List,
    /// List of rows (maps)
    #[serde(rename = "table")]
    Table,
    /// 2-D numeric grid
    #[serde(rename = "matrix")]
    Matrix,
    /// Name to value mapping
    #[serde(rename = "map")]
    Map,
}

/// Declared input of a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VariableSpec {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub required: bool,
    pub placeholder: &'static str,
}

impl VariableSpec {
    pub const fn required(
        name: &'static str,
        label: &'static str,
        kind: VariableKind,
        placeholder: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
            placeholder,
        }
    }

    pub const fn optional(
        name: &'static str,
        label: &'static str,
        kind: VariableKind,
        placeholder: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            placeholder,
        }
    }
}

/// Caller-facing description of one formula
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaSchema {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    /// Results differ between calls with identical input
    pub random: bool,
    pub variables: Vec<VariableSpec>,
}
