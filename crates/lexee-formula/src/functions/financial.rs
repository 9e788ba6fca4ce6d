//! Finance and depreciation formulas
//!
//! Rate inputs are percentages (0.5 = 0.5 % per period) and are converted to
//! decimal fractions before reaching [`crate::solvers::amortization`]. Money
//! amounts are reported with 2 decimals and follow the spreadsheet sign
//! convention: outgoing payments are negative.

use super::{opt, req, round, FormulaDef};
use crate::context::FormulaContext;
use crate::schema::{Category, VariableKind as Kind, VariableSpec};
use crate::solvers::amortization::{self, PaymentTiming};
use crate::variables::{ResultMap, Variables};
use lexee_core::{FormulaError, FormulaResult, Value};

/// Starting point of the IRR search
const IRR_GUESS: f64 = 0.1;

/// Starting point of the RATE search
const RATE_GUESS: f64 = 0.01;

pub const FORMULAS: &[FormulaDef] = &[
    FormulaDef {
        id: "vpm",
        name: "VPM",
        description: "Mensualité d'un emprunt à taux fixe",
        category: Category::Finance,
        variables: &[
            req("taux_annuel", "Taux annuel (%)", Kind::Number, "5"),
            req("nb_periodes", "Nombre de mensualités", Kind::Number, "240"),
            req("valeur_actuelle", "Montant emprunté", Kind::Number, "200000"),
            opt("valeur_future", "Valeur future", Kind::Number, "0"),
            opt("debut_periode", "Paiement en début de période (0/1)", Kind::Number, "0"),
        ],
        implementation: fn_vpm,
        random: false,
    },
    FormulaDef {
        id: "tri",
        name: "TRI",
        description: "Taux de rendement interne d'une série de flux",
        category: Category::Finance,
        variables: &[req("flux", "Flux de trésorerie", Kind::NumberList, "[-1000, 300, 400, 500]")],
        implementation: fn_tri,
        random: false,
    },
    FormulaDef {
        id: "van",
        name: "VAN",
        description: "Valeur actuelle nette (premier flux actualisé d'une période)",
        category: Category::Finance,
        variables: &[
            req("taux", "Taux d'actualisation (%)", Kind::Number, "10"),
            req("flux", "Flux de trésorerie", Kind::NumberList, "[30000, 35000, 40000]"),
        ],
        implementation: fn_van,
        random: false,
    },
    FormulaDef {
        id: "taux",
        name: "TAUX",
        description: "Taux périodique implicite d'un échéancier",
        category: Category::Finance,
        variables: &[
            req("nb_periodes", "Nombre de périodes", Kind::Number, "240"),
            req("mensualite", "Mensualité", Kind::Number, "-1319.91"),
            req("valeur_actuelle", "Valeur actuelle", Kind::Number, "200000"),
            opt("valeur_future", "Valeur future", Kind::Number, "0"),
            opt("debut_periode", "Paiement en début de période (0/1)", Kind::Number, "0"),
        ],
        implementation: fn_taux,
        random: false,
    },
    FormulaDef {
        id: "npm",
        name: "NPM",
        description: "Nombre de périodes nécessaires au remboursement",
        category: Category::Finance,
        variables: &[
            req("taux_periodique", "Taux périodique (%)", Kind::Number, "0.5"),
            req("mensualite", "Mensualité", Kind::Number, "-1500"),
            req("valeur_actuelle", "Valeur actuelle", Kind::Number, "200000"),
            opt("valeur_future", "Valeur future", Kind::Number, "0"),
            opt("debut_periode", "Paiement en début de période (0/1)", Kind::Number, "0"),
        ],
        implementation: fn_npm,
        random: false,
    },
    FormulaDef {
        id: "vc",
        name: "VC",
        description: "Valeur capitalisée d'une épargne",
        category: Category::Finance,
        variables: &[
            req("taux_periodique", "Taux périodique (%)", Kind::Number, "0.5"),
            req("nb_periodes", "Nombre de périodes", Kind::Number, "120"),
            opt("mensualite", "Versement périodique", Kind::Number, "-500"),
            opt("valeur_actuelle", "Valeur actuelle", Kind::Number, "0"),
            opt("debut_periode", "Paiement en début de période (0/1)", Kind::Number, "0"),
        ],
        implementation: fn_vc,
        random: false,
    },
    FormulaDef {
        id: "va",
        name: "VA",
        description: "Valeur actuelle d'une série de versements",
        category: Category::Finance,
        variables: &[
            req("taux_periodique", "Taux périodique (%)", Kind::Number, "0.41667"),
            req("nb_periodes", "Nombre de périodes", Kind::Number, "240"),
            opt("mensualite", "Versement périodique", Kind::Number, "-1319.91"),
            opt("valeur_future", "Valeur future", Kind::Number, "0"),
            opt("debut_periode", "Paiement en début de période (0/1)", Kind::Number, "0"),
        ],
        implementation: fn_va,
        random: false,
    },
    FormulaDef {
        id: "intper",
        name: "INTPER",
        description: "Part d'intérêts d'une échéance",
        category: Category::AuditFinancier,
        variables: SCHEDULE_PERIOD,
        implementation: fn_intper,
        random: false,
    },
    FormulaDef {
        id: "princper",
        name: "PRINCPER",
        description: "Part de capital d'une échéance",
        category: Category::AuditFinancier,
        variables: SCHEDULE_PERIOD,
        implementation: fn_princper,
        random: false,
    },
    FormulaDef {
        id: "cumul_inter",
        name: "CUMUL.INTER",
        description: "Intérêts cumulés entre deux échéances",
        category: Category::AuditFinancier,
        variables: SCHEDULE_RANGE,
        implementation: fn_cumul_inter,
        random: false,
    },
    FormulaDef {
        id: "cumul_princ",
        name: "CUMUL.PRINC",
        description: "Capital cumulé remboursé entre deux échéances",
        category: Category::AuditFinancier,
        variables: SCHEDULE_RANGE,
        implementation: fn_cumul_princ,
        random: false,
    },
    FormulaDef {
        id: "amorl",
        name: "AMORLIN",
        description: "Amortissement linéaire",
        category: Category::AuditFinancier,
        variables: &[
            req("cout", "Coût", Kind::Number, "10000"),
            req("valeur_residuelle", "Valeur résiduelle", Kind::Number, "1000"),
            req("duree_vie", "Durée de vie", Kind::Number, "10"),
        ],
        implementation: fn_amorl,
        random: false,
    },
    FormulaDef {
        id: "amordegr",
        name: "DB",
        description: "Amortissement dégressif à taux fixe",
        category: Category::AuditFinancier,
        variables: &[
            req("cout", "Coût", Kind::Number, "10000"),
            req("valeur_residuelle", "Valeur résiduelle", Kind::Number, "1000"),
            req("duree_vie", "Durée de vie", Kind::Number, "5"),
            req("periode", "Période", Kind::Number, "1"),
            opt("mois", "Mois de la première année", Kind::Number, "12"),
        ],
        implementation: fn_amordegr,
        random: false,
    },
    FormulaDef {
        id: "syd",
        name: "SYD",
        description: "Amortissement proportionnel à l'ordre numérique inversé des années",
        category: Category::AuditFinancier,
        variables: &[
            req("cout", "Coût", Kind::Number, "10000"),
            req("valeur_residuelle", "Valeur résiduelle", Kind::Number, "1000"),
            req("duree_vie", "Durée de vie", Kind::Number, "5"),
            req("periode", "Période", Kind::Number, "1"),
        ],
        implementation: fn_syd,
        random: false,
    },
    FormulaDef {
        id: "rentabilite_immobiliere",
        name: "Rentabilité immobilière",
        description: "Rendement locatif brut et net, crédit et cash-flow",
        category: Category::Finance,
        variables: &[
            req("prix_achat", "Prix d'achat", Kind::Number, "200000"),
            req("loyer_mensuel", "Loyer mensuel", Kind::Number, "900"),
            opt("frais_notaire_pct", "Frais de notaire (%)", Kind::Number, "7.5"),
            opt("cout_travaux", "Coût des travaux", Kind::Number, "0"),
            opt("charges_annuelles", "Charges annuelles", Kind::Number, "0"),
            opt("vacance_pct", "Vacance locative (%)", Kind::Number, "5"),
            opt("duree_emprunt", "Durée de l'emprunt (années)", Kind::Number, "20"),
            opt("taux_interet", "Taux d'intérêt (%)", Kind::Number, "3.5"),
            opt("apport", "Apport", Kind::Number, "0"),
        ],
        implementation: fn_rentabilite_immobiliere,
        random: false,
    },
];

const SCHEDULE_PERIOD: &[VariableSpec] = &[
    req("taux_periodique", "Taux périodique (%)", Kind::Number, "0.5"),
    req("periode", "Période", Kind::Number, "1"),
    req("nb_periodes", "Nombre de périodes", Kind::Number, "60"),
    req("valeur_actuelle", "Valeur actuelle", Kind::Number, "200000"),
    opt("valeur_future", "Valeur future", Kind::Number, "0"),
    opt("debut_periode", "Paiement en début de période (0/1)", Kind::Number, "0"),
];

const SCHEDULE_RANGE: &[VariableSpec] = &[
    req("taux_periodique", "Taux périodique (%)", Kind::Number, "1"),
    req("nb_periodes", "Nombre de périodes", Kind::Number, "12"),
    req("valeur_actuelle", "Valeur actuelle", Kind::Number, "10000"),
    req("periode_debut", "Première période", Kind::Number, "1"),
    req("periode_fin", "Dernière période", Kind::Number, "12"),
    opt("debut_periode", "Paiement en début de période (0/1)", Kind::Number, "0"),
];

fn timing(v: &Variables) -> FormulaResult<PaymentTiming> {
    PaymentTiming::from_flag(v.integer_or("debut_periode", 0)?)
}

/// Percentage input as a decimal fraction
fn rate(v: &Variables, name: &str) -> FormulaResult<f64> {
    Ok(v.number(name)? / 100.0)
}

/// Whole count; negative values read as 0 and fail range checks downstream
fn count(v: &Variables, name: &str) -> FormulaResult<usize> {
    Ok(usize::try_from(v.integer(name)?).unwrap_or(0))
}

/// VPM (PMT) on a monthly schedule
fn fn_vpm(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let monthly = v.number("taux_annuel")? / 12.0 / 100.0;
    let nper = v.number("nb_periodes")?;
    let pv = v.number("valeur_actuelle")?;
    let fv = v.number_or("valeur_future", 0.0)?;

    let pmt = round(amortization::payment(monthly, nper, pv, fv, timing(v)?)?, 2);
    let total = round(pmt.abs() * nper, 2);
    log::trace!("vpm: rate {} over {} periods -> {}", monthly, nper, pmt);

    Ok(ResultMap::new()
        .with("mensualite", pmt)
        .with("taux_periodique", round(monthly * 100.0, 6))
        .with("total_rembourse", total)
        .with("cout_interets", round(total - pv, 2)))
}

/// TRI (IRR)
fn fn_tri(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let flows = v.numbers("flux")?;
    let root = amortization::internal_rate_of_return(&flows, IRR_GUESS)?;
    Ok(ResultMap::new()
        .with("tri_decimal", round(root.value, 8))
        .with("tri_pct", round(root.value * 100.0, 4))
        .with("iterations", root.iterations))
}

/// VAN (NPV)
fn fn_van(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let flows = v.numbers("flux")?;
    if flows.is_empty() {
        return Err(FormulaError::domain("at least one cash flow is required"));
    }
    let npv = amortization::net_present_value(rate(v, "taux")?, &flows)?;
    Ok(ResultMap::new()
        .with("van", round(npv, 2))
        .with("nb_flux", flows.len()))
}

/// TAUX (RATE), monthly periods
fn fn_taux(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let root = amortization::implied_rate(
        v.number("nb_periodes")?,
        v.number("mensualite")?,
        v.number("valeur_actuelle")?,
        v.number_or("valeur_future", 0.0)?,
        timing(v)?,
        RATE_GUESS,
    )?;
    Ok(ResultMap::new()
        .with("taux_periodique", round(root.value, 8))
        .with("taux_periodique_pct", round(root.value * 100.0, 6))
        .with("taux_annuel_pct", round(root.value * 1200.0, 4)))
}

/// NPM (NPER)
fn fn_npm(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let n = amortization::periods(
        rate(v, "taux_periodique")?,
        v.number("mensualite")?,
        v.number("valeur_actuelle")?,
        v.number_or("valeur_future", 0.0)?,
        timing(v)?,
    )?;
    Ok(ResultMap::new()
        .with("nb_periodes", round(n, 2))
        .with("nb_annees", round(n / 12.0, 2)))
}

/// VC (FV)
fn fn_vc(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let nper = v.number("nb_periodes")?;
    let pmt = v.number_or("mensualite", 0.0)?;
    let pv = v.number_or("valeur_actuelle", 0.0)?;

    let fv = round(
        amortization::future_value(rate(v, "taux_periodique")?, nper, pmt, pv, timing(v)?)?,
        2,
    );
    let paid_in = round(-(pmt * nper + pv), 2);
    Ok(ResultMap::new()
        .with("valeur_future", fv)
        .with("total_verse", paid_in)
        .with("interets", round(fv - paid_in, 2)))
}

/// VA (PV)
fn fn_va(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let pv = amortization::present_value(
        rate(v, "taux_periodique")?,
        v.number("nb_periodes")?,
        v.number_or("mensualite", 0.0)?,
        v.number_or("valeur_future", 0.0)?,
        timing(v)?,
    )?;
    Ok(ResultMap::new().with("valeur_actuelle", round(pv, 2)))
}

/// INTPER (IPMT)
fn fn_intper(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let period = count(v, "periode")?;
    let interest = amortization::interest_payment(
        rate(v, "taux_periodique")?,
        period,
        count(v, "nb_periodes")?,
        v.number("valeur_actuelle")?,
        v.number_or("valeur_future", 0.0)?,
        timing(v)?,
    )?;
    Ok(ResultMap::new()
        .with("interets", round(interest, 2))
        .with("periode", period))
}

/// PRINCPER (PPMT)
fn fn_princper(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let period = count(v, "periode")?;
    let principal = amortization::principal_payment(
        rate(v, "taux_periodique")?,
        period,
        count(v, "nb_periodes")?,
        v.number("valeur_actuelle")?,
        v.number_or("valeur_future", 0.0)?,
        timing(v)?,
    )?;
    Ok(ResultMap::new()
        .with("principal", round(principal, 2))
        .with("periode", period))
}

fn cumulative(v: &Variables) -> FormulaResult<(f64, f64)> {
    amortization::cumulative(
        rate(v, "taux_periodique")?,
        count(v, "nb_periodes")?,
        v.number("valeur_actuelle")?,
        count(v, "periode_debut")?,
        count(v, "periode_fin")?,
        timing(v)?,
    )
}

/// CUMUL.INTER (CUMIPMT)
fn fn_cumul_inter(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let (interest, _) = cumulative(v)?;
    Ok(ResultMap::new().with("cumul_interets", round(interest, 2)))
}

/// CUMUL.PRINC (CUMPRINC)
fn fn_cumul_princ(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let (_, principal) = cumulative(v)?;
    Ok(ResultMap::new().with("cumul_principal", round(principal, 2)))
}

/// AMORLIN (SLN)
fn fn_amorl(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let cost = v.number("cout")?;
    let salvage = v.number("valeur_residuelle")?;
    let life = v.number("duree_vie")?;
    let yearly = amortization::straight_line(cost, salvage, life)?;
    Ok(ResultMap::new()
        .with("amortissement_annuel", round(yearly, 2))
        .with("duree", Value::compact(life))
        .with("base_amortissable", round(cost - salvage, 2)))
}

/// DB
fn fn_amordegr(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let cost = v.number("cout")?;
    let months = u32::try_from(v.integer_or("mois", 12)?)
        .map_err(|_| FormulaError::domain("month must be between 1 and 12"))?;
    let db = amortization::declining_balance(
        cost,
        v.number("valeur_residuelle")?,
        count(v, "duree_vie")?,
        count(v, "periode")?,
        months,
    )?;
    Ok(ResultMap::new()
        .with("amortissement", round(db.amount, 2))
        .with("taux", db.rate)
        .with("cumul", round(db.accumulated, 2))
        .with("valeur_nette", round(cost - db.accumulated, 2)))
}

/// SYD
fn fn_syd(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let cost = v.number("cout")?;
    let salvage = v.number("valeur_residuelle")?;
    let life = count(v, "duree_vie")?;
    let period = count(v, "periode")?;

    let amount = amortization::sum_of_years(cost, salvage, life, period)?;
    let mut accumulated = 0.0;
    for p in 1..=period {
        accumulated += amortization::sum_of_years(cost, salvage, life, p)?;
    }
    Ok(ResultMap::new()
        .with("amortissement", round(amount, 2))
        .with("cumul", round(accumulated, 2))
        .with("valeur_nette", round(cost - accumulated, 2)))
}

/// Buy-to-let yield with a monthly amortized loan
fn fn_rentabilite_immobiliere(v: &Variables, _ctx: &FormulaContext) -> FormulaResult<ResultMap> {
    let price = v.number("prix_achat")?;
    let rent = v.number("loyer_mensuel")?;
    let notary_pct = v.number_or("frais_notaire_pct", 7.5)?;
    let works = v.number_or("cout_travaux", 0.0)?;
    let charges = v.number_or("charges_annuelles", 0.0)?;
    let vacancy_pct = v.number_or("vacance_pct", 5.0)?;
    let years = v.number_or("duree_emprunt", 20.0)?.trunc();
    let interest_pct = v.number_or("taux_interet", 3.5)?;
    let deposit = v.number_or("apport", 0.0)?;

    let total_cost = price * (1.0 + notary_pct / 100.0) + works;
    if total_cost <= 0.0 {
        return Err(FormulaError::domain("total acquisition cost must be > 0"));
    }
    let gross_rent = rent * 12.0;
    let net_rent = gross_rent * (1.0 - vacancy_pct / 100.0) - charges;

    let borrowed = total_cost - deposit;
    let monthly = if borrowed > 0.0 {
        let monthly_rate = (interest_pct / 100.0 / 12.0).max(0.0);
        -amortization::payment(monthly_rate, years * 12.0, borrowed, 0.0, PaymentTiming::End)?
    } else {
        0.0
    };

    Ok(ResultMap::new()
        .with("cout_total_acquisition", round(total_cost, 2))
        .with("loyer_annuel_brut", round(gross_rent, 2))
        .with("loyer_annuel_net", round(net_rent, 2))
        .with("rendement_brut_pct", round(gross_rent / total_cost * 100.0, 2))
        .with("rendement_net_pct", round(net_rent / total_cost * 100.0, 2))
        .with("mensualite_emprunt", round(monthly, 2))
        .with("cout_total_credit", round(monthly * years * 12.0, 2))
        .with("cash_flow_mensuel", round(net_rent / 12.0 - monthly, 2))
        .with("montant_emprunte", round(borrowed, 2)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::{num, run};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_vpm() {
        let pmt = |input: serde_json::Value| num(&run(fn_vpm, input).unwrap(), "mensualite");
        assert_eq!(
            pmt(json!({"taux_annuel": 5, "nb_periodes": 240, "valeur_actuelle": 200000})),
            -1319.91
        );
        assert_eq!(
            pmt(json!({"taux_annuel": 0, "nb_periodes": 120, "valeur_actuelle": 120000})),
            -1000.0
        );
        assert_eq!(
            pmt(json!({"taux_annuel": 12, "nb_periodes": 360, "valeur_actuelle": 300000})),
            -3085.84
        );
        let with_fv = pmt(json!({
            "taux_annuel": 6, "nb_periodes": 120,
            "valeur_actuelle": 100000, "valeur_future": -50000,
        }));
        assert!((with_fv + 805.10).abs() < 0.02);
        let begin = pmt(json!({
            "taux_annuel": 5, "nb_periodes": 240,
            "valeur_actuelle": 200000, "debut_periode": 1,
        }));
        assert!(begin > -1319.91);
        assert!(run(fn_vpm, json!({"taux_annuel": 5, "nb_periodes": 0, "valeur_actuelle": 1000})).is_err());
    }

    #[test]
    fn test_tri() {
        let r = run(fn_tri, json!({"flux": [-1000, 1100]})).unwrap();
        assert!((num(&r, "tri_pct") - 10.0).abs() < 0.01);

        let flows = [-100000.0, 30000.0, 35000.0, 40000.0, 45000.0];
        let r = run(fn_tri, json!({ "flux": flows })).unwrap();
        let irr = num(&r, "tri_decimal");
        let npv: f64 = flows
            .iter()
            .enumerate()
            .map(|(i, cf)| cf / (1.0 + irr).powi(i as i32))
            .sum();
        assert!(npv.abs() < 0.1);

        let r = run(fn_tri, json!({"flux": [-100, 50, 50]})).unwrap();
        assert!(num(&r, "tri_pct").abs() < 0.01);
        assert!(run(fn_tri, json!({"flux": [-1000]})).is_err());
    }

    #[test]
    fn test_van() {
        let r = run(fn_van, json!({"taux": 10, "flux": [30000, 35000, 40000, 45000]})).unwrap();
        assert!((num(&r, "van") - 116986.54).abs() < 0.01);
        assert_eq!(r.get("nb_flux"), Some(&Value::Integer(4)));
    }

    #[test]
    fn test_taux() {
        let r = run(
            fn_taux,
            json!({"nb_periodes": 240, "mensualite": -1319.91, "valeur_actuelle": 200000}),
        )
        .unwrap();
        assert!((num(&r, "taux_annuel_pct") - 5.0).abs() < 0.01);
        let r = run(
            fn_taux,
            json!({"nb_periodes": 360, "mensualite": -3085.84, "valeur_actuelle": 300000}),
        )
        .unwrap();
        assert!((num(&r, "taux_annuel_pct") - 12.0).abs() < 0.01);
    }

    #[test]
    fn test_npm() {
        let r = run(
            fn_npm,
            json!({"taux_periodique": 0.5, "mensualite": -1500, "valeur_actuelle": 200000}),
        )
        .unwrap();
        assert!(num(&r, "nb_periodes") > 0.0);
        let r = run(
            fn_npm,
            json!({"taux_periodique": 0, "mensualite": -1000, "valeur_actuelle": 120000}),
        )
        .unwrap();
        assert_eq!(num(&r, "nb_periodes"), 120.0);
        assert_eq!(num(&r, "nb_annees"), 10.0);
        assert!(run(
            fn_npm,
            json!({"taux_periodique": 0, "mensualite": 0, "valeur_actuelle": 100000}),
        )
        .is_err());
    }

    #[test]
    fn test_vc_and_va() {
        let r = run(
            fn_vc,
            json!({"taux_periodique": 0, "nb_periodes": 120, "mensualite": -500}),
        )
        .unwrap();
        assert_eq!(num(&r, "valeur_future"), 60000.0);
        assert_eq!(num(&r, "interets"), 0.0);

        let r = run(
            fn_vc,
            json!({"taux_periodique": 0.5, "nb_periodes": 120, "valeur_actuelle": -10000}),
        )
        .unwrap();
        assert!((num(&r, "valeur_future") - 10000.0 * 1.005_f64.powi(120)).abs() < 0.01);

        let r = run(
            fn_va,
            json!({"taux_periodique": 5.0 / 12.0, "nb_periodes": 240, "mensualite": -1319.91}),
        )
        .unwrap();
        assert!((num(&r, "valeur_actuelle") - 200000.0).abs() < 100.0);
        let r = run(fn_va, json!({"taux_periodique": 0, "nb_periodes": 120, "mensualite": -1000})).unwrap();
        assert_eq!(num(&r, "valeur_actuelle"), 120000.0);
    }

    #[test]
    fn test_intper_princper() {
        let params = json!({"taux_periodique": 0.5, "periode": 1, "nb_periodes": 60, "valeur_actuelle": 200000});
        let interest = num(&run(fn_intper, params.clone()).unwrap(), "interets");
        let principal = num(&run(fn_princper, params).unwrap(), "principal");
        assert_eq!(interest, -1000.0);
        let r = 0.005_f64;
        let pmt = -(200000.0 * r) / (1.0 - (1.0 + r).powi(-60));
        assert!((interest + principal - pmt).abs() <= 0.02);

        let zero = json!({"taux_periodique": 0, "periode": 1, "nb_periodes": 10, "valeur_actuelle": 5000});
        assert_eq!(num(&run(fn_intper, zero.clone()).unwrap(), "interets"), 0.0);
        assert_eq!(num(&run(fn_princper, zero).unwrap(), "principal"), -500.0);

        assert!(run(
            fn_intper,
            json!({"taux_periodique": 1, "periode": 0, "nb_periodes": 12, "valeur_actuelle": 10000}),
        )
        .is_err());
    }

    #[test]
    fn test_cumulative() {
        let single = json!({
            "taux_periodique": 1, "nb_periodes": 12, "valeur_actuelle": 10000,
            "periode_debut": 1, "periode_fin": 1,
        });
        assert_eq!(num(&run(fn_cumul_inter, single).unwrap(), "cumul_interets"), -100.0);

        let full = json!({
            "taux_periodique": 0.5, "nb_periodes": 12, "valeur_actuelle": 10000,
            "periode_debut": 1, "periode_fin": 12,
        });
        let interest = num(&run(fn_cumul_inter, full.clone()).unwrap(), "cumul_interets");
        let principal = num(&run(fn_cumul_princ, full).unwrap(), "cumul_principal");
        assert!((principal + 10000.0).abs() < 0.01);
        assert!(interest < 0.0);

        assert!(run(
            fn_cumul_inter,
            json!({
                "taux_periodique": 1, "nb_periodes": 12, "valeur_actuelle": 10000,
                "periode_debut": 5, "periode_fin": 3,
            }),
        )
        .is_err());
    }

    #[test]
    fn test_amorl() {
        let r = run(fn_amorl, json!({"cout": 10000, "valeur_residuelle": 1000, "duree_vie": 10})).unwrap();
        assert_eq!(num(&r, "amortissement_annuel"), 900.0);
        assert_eq!(r.get("duree"), Some(&Value::Integer(10)));
        assert_eq!(num(&r, "base_amortissable"), 9000.0);
        assert!(run(fn_amorl, json!({"cout": 10000, "valeur_residuelle": 0, "duree_vie": 0})).is_err());
    }

    #[test]
    fn test_amordegr() {
        let dep = |period: i64| {
            run(
                fn_amordegr,
                json!({"cout": 10000, "valeur_residuelle": 1000, "duree_vie": 5, "periode": period}),
            )
        };
        let first = dep(1).unwrap();
        let second = dep(2).unwrap();
        assert_eq!(num(&first, "taux"), 0.369);
        assert_eq!(num(&first, "amortissement"), 3690.0);
        assert_eq!(num(&first, "valeur_nette"), 6310.0);
        assert!(num(&first, "amortissement") > num(&second, "amortissement"));
        assert!(dep(6).is_err());
    }

    #[test]
    fn test_syd() {
        let dep = |period: i64| {
            run(
                fn_syd,
                json!({"cout": 10000, "valeur_residuelle": 1000, "duree_vie": 5, "periode": period}),
            )
            .unwrap()
        };
        assert_eq!(num(&dep(1), "amortissement"), 3000.0);
        assert_eq!(num(&dep(5), "amortissement"), 600.0);
        assert_eq!(num(&dep(5), "cumul"), 9000.0);
        assert_eq!(num(&dep(5), "valeur_nette"), 1000.0);
    }

    #[test]
    fn test_rentabilite_immobiliere() {
        let r = run(
            fn_rentabilite_immobiliere,
            json!({
                "prix_achat": 200000, "loyer_mensuel": 1000,
                "frais_notaire_pct": 0, "vacance_pct": 0,
                "taux_interet": 0, "duree_emprunt": 20, "apport": 80000,
            }),
        )
        .unwrap();
        assert_eq!(num(&r, "cout_total_acquisition"), 200000.0);
        assert_eq!(num(&r, "loyer_annuel_brut"), 12000.0);
        assert_eq!(num(&r, "rendement_brut_pct"), 6.0);
        assert_eq!(num(&r, "montant_emprunte"), 120000.0);
        assert_eq!(num(&r, "mensualite_emprunt"), 500.0);
        assert_eq!(num(&r, "cash_flow_mensuel"), 500.0);

        let r = run(
            fn_rentabilite_immobiliere,
            json!({"prix_achat": 100000, "loyer_mensuel": 500, "apport": 200000}),
        )
        .unwrap();
        assert_eq!(num(&r, "mensualite_emprunt"), 0.0);
    }
}
