//! Date formulas
//!
//! Dates are read as `YYYY-MM-DD`, `DD/MM/YYYY` or `DD-MM-YYYY` and written
//! back in ISO form.

use super::{opt, req, round, FormulaDef};
use crate::context::FormulaContext;
use crate::schema::{Category, VariableKind as Kind};
use crate::variables::{ResultMap, Variables};
use chrono::{Datelike, Months, NaiveDate, Weekday};
use lexee_core::{FormulaError, FormulaResult};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "dates_ouvrees",
        name: "AUJOURDHUI / NB.JOURS.OUVRES",
        description: "Jours calendaires et jours ouvrés entre deux dates",
        category: Category::Dates,
        variables: &[
            req("date_debut", "Date de début", Kind::Text, "2025-01-01"),
            req("date_fin", "Date de fin", Kind::Text, "2025-01-31"),
        ],
        implementation: fn_dates_ouvrees,
        random: false,
    },
    FormulaDef {
        id: "mois_decaler",
        name: "MOIS.DECALER",
        description: "Décaler une date d'un nombre de mois",
        category: Category::Dates,
        variables: &[
            req("date_depart", "Date de départ", Kind::Text, "2025-01-31"),
            req("nb_mois", "Nombre de mois", Kind::Number, "1"),
        ],
        implementation: fn_mois_decaler,
        random: false,
    },
    FormulaDef {
        id: "fin_mois",
        name: "FIN.MOIS",
        description: "Dernier jour du mois, décalé d'un nombre de mois",
        category: Category::Dates,
        variables: &[
            req("date_depart", "Date de départ", Kind::Text, "2024-01-15"),
            opt("nb_mois", "Nombre de mois", Kind::Number, "1"),
        ],
        implementation: fn_fin_mois,
        random: false,
    },
    FormulaDef {
        id: "fraction_annee",
        name: "FRACTION.ANNEE",
        description: "Fraction d'année entre deux dates selon une base de décompte",
        category: Category::Dates,
        variables: &[
            req("date_debut", "Date de début", Kind::Text, "2025-01-15"),
            req("date_fin", "Date de fin", Kind::Text, "2025-07-15"),
            opt("base", "Base (0-4)", Kind::Number, "1"),
        ],
        implementation: fn_fraction_annee,
        random: false,
    },
];

/// Parse a date in one of the accepted formats
pub fn parse_date(text: &str) -> FormulaResult<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .ok_or_else(|| {
            FormulaError::domain(format!(
                "unrecognised date '{}', use YYYY-MM-DD or DD/MM/YYYY",
                text
            ))
        })
}

fn date_arg(v: &Variables, name: &str) -> FormulaResult<NaiveDate> {
    parse_date(&v.text(name)?)
}

/// Shift by whole months, clamping the day to the end of the target month
fn shift_months(date: NaiveDate, months: i64) -> FormulaResult<NaiveDate> {
    let out_of_range = || FormulaError::domain("shifted date is out of range");
    let magnitude = u32::try_from(months.unsigned_abs()).map_err(|_| out_of_range())?;
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(magnitude))
    } else {
        date.checked_sub_months(Months::new(magnitude))
    };
    shifted.ok_or_else(out_of_range)
}

fn last_day_of_month(date: NaiveDate) -> FormulaResult<NaiveDate> {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| FormulaError::domain("date is out of range"))
}

/// Monday to Friday, both ends included, in either order
fn working_days(a: NaiveDate, b: NaiveDate) -> i64 {
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    let total = (end - start).num_days() + 1;
    let mut count = total / 7 * 5;
    let mut day = start.weekday();
    for _ in 0..total % 7 {
        if !matches!(day, Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
        day = day.succ();
    }
    count
}

/// AUJOURDHUI / NB.JOURS.OUVRES
fn fn_dates_ouvrees(v: &Variables, ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let start = date_arg(v, "date_debut")?;
    let end = date_arg(v, "date_fin")?;

    Ok(ResultMap::new()
        .with("aujourdhui", ctx.today.to_string())
        .with("date_debut", start.to_string())
        .with("date_fin", end.to_string())
        .with("jours_calendaires", (end - start).num_days().abs())
        .with("jours_ouvres", working_days(start, end)))
}

/// MOIS.DECALER (EDATE)
fn fn_mois_decaler(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let start = date_arg(v, "date_depart")?;
    let shifted = shift_months(start, v.integer("nb_mois")?)?;
    Ok(ResultMap::new().with("date_resultat", shifted.to_string()))
}

/// FIN.MOIS (EOMONTH)
fn fn_fin_mois(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let start = date_arg(v, "date_depart")?;
    let shifted = shift_months(start, v.integer_or("nb_mois", 0)?)?;
    Ok(ResultMap::new().with("fin_de_mois", last_day_of_month(shifted)?.to_string()))
}

/// Day-count conventions of FRACTION.ANNEE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Basis {
    Us30360,
    ActualActual,
    Actual360,
    Actual365,
    European30360,
}

impl Basis {
    fn from_code(code: i64) -> FormulaResult<Self> {
        match code {
            0 => Ok(Self::Us30360),
            1 => Ok(Self::ActualActual),
            2 => Ok(Self::Actual360),
            3 => Ok(Self::Actual365),
            4 => Ok(Self::European30360),
            _ => Err(FormulaError::domain("base must be between 0 and 4")),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Us30360 => "US 30/360",
            Self::ActualActual => "Actual/Actual",
            Self::Actual360 => "Actual/360",
            Self::Actual365 => "Actual/365",
            Self::European30360 => "European 30/360",
        }
    }
}

fn is_last_of_february(date: NaiveDate) -> bool {
    date.month() == 2 && date.succ_opt().map_or(false, |next| next.month() == 3)
}

/// 30/360 day count; `us` applies the NASD end-of-month rules
fn days_30_360(start: NaiveDate, end: NaiveDate, us: bool) -> i64 {
    let mut d1 = start.day() as i64;
    let mut d2 = end.day() as i64;
    if us {
        if is_last_of_february(start) {
            if is_last_of_february(end) {
                d2 = 30;
            }
            d1 = 30;
        }
        if d1 == 31 {
            d1 = 30;
        }
        if d2 == 31 && d1 == 30 {
            d2 = 30;
        }
    } else {
        d1 = d1.min(30);
        d2 = d2.min(30);
    }
    let years = (end.year() - start.year()) as i64;
    let months = end.month() as i64 - start.month() as i64;
    years * 360 + months * 30 + (d2 - d1)
}

fn days_in_year(year: i32) -> i64 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Year length used by the Actual/Actual basis
fn actual_year_length(start: NaiveDate, end: NaiveDate) -> f64 {
    let within_a_year = start
        .checked_add_months(Months::new(12))
        .map_or(false, |limit| end <= limit);
    if within_a_year {
        let spans_leap_day = (start.year()..=end.year()).any(|year| {
            NaiveDate::from_ymd_opt(year, 2, 29).map_or(false, |leap| start <= leap && leap <= end)
        });
        if spans_leap_day || (start.year() == end.year() && days_in_year(start.year()) == 366) {
            366.0
        } else {
            365.0
        }
    } else {
        let years = start.year()..=end.year();
        let count = years.clone().count() as f64;
        years.map(days_in_year).sum::<i64>() as f64 / count
    }
}

/// FRACTION.ANNEE (YEARFRAC)
fn fn_fraction_annee(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let a = date_arg(v, "date_debut")?;
    let b = date_arg(v, "date_fin")?;
    let basis = Basis::from_code(v.integer_or("base", 1)?)?;
    let (start, end) = if a <= b { (a, b) } else { (b, a) };

    let actual = (end - start).num_days();
    let (days, fraction) = match basis {
        Basis::Us30360 => {
            let days = days_30_360(start, end, true);
            (days, days as f64 / 360.0)
        }
        Basis::European30360 => {
            let days = days_30_360(start, end, false);
            (days, days as f64 / 360.0)
        }
        Basis::ActualActual => (actual, actual as f64 / actual_year_length(start, end)),
        Basis::Actual360 => (actual, actual as f64 / 360.0),
        Basis::Actual365 => (actual, actual as f64 / 365.0),
    };

    Ok(ResultMap::new()
        .with("fraction", round(fraction, 6))
        .with("jours", days)
        .with("base", basis as i64)
        .with("convention", basis.label()))
}
