//! Motore di sicurezza: classificazione dei valori rispetto ai range di riferimento,
//! valori critici e semaforo complessivo del referto.
//!
//! Nessuna diagnosi: il modulo si limita a confrontare numeri con intervalli.

use crate::entities::{FlagLevel, ParameterFlag};
use lazy_static::lazy_static;
use regex::Regex;

/// Scostamento relativo oltre il limite violato che rende un parametro "rosso"
pub const RED_DEVIATION: f64 = 0.25;

lazy_static! {
    static ref RANGE_UNIT_RE: Regex = Regex::new(r"(?i)\s*(mg/dL|g/dL|mmol/L|%|IU/L|U/L)\s*").unwrap();
    static ref NUMBER_RE: Regex = Regex::new(r"\d+\.?\d*").unwrap();
}

struct Thresholds {
    key: &'static str,
    critical_high: Option<f64>,
    critical_low: Option<f64>,
    normal_high: f64,
    normal_low: f64,
}

const THRESHOLDS: &[Thresholds] = &[
    Thresholds { key: "glucose", critical_high: Some(400.0), critical_low: Some(40.0), normal_high: 100.0, normal_low: 70.0 },
    Thresholds { key: "creatinine", critical_high: Some(5.0), critical_low: None, normal_high: 1.2, normal_low: 0.6 },
    Thresholds { key: "hemoglobin", critical_high: None, critical_low: Some(7.0), normal_high: 17.5, normal_low: 13.5 },
];

fn thresholds_for(name: &str) -> Option<&'static Thresholds> {
    let name = name.to_lowercase();
    THRESHOLDS.iter().find(|t| name.contains(t.key))
}

/// Intervallo di riferimento; un estremo mancante non è vincolante
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Interpreta un intervallo testuale
///
/// * `"< 200 mg/dL"` -> max 200
/// * `"> 40"` -> min 40
/// * `"70-100"` -> min 70, max 100
/// * `"150"` -> max 150
pub fn parse_range(raw: &str) -> Option<Range> {
    let stripped = RANGE_UNIT_RE.replace_all(raw, "");
    let numbers: Vec<f64> = NUMBER_RE
        .find_iter(&stripped)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    let first = *numbers.first()?;

    let range = if stripped.contains('<') {
        Range { min: None, max: Some(first) }
    } else if stripped.contains('>') {
        Range { min: Some(first), max: None }
    } else if numbers.len() == 2 {
        Range {
            min: Some(numbers[0].min(numbers[1])),
            max: Some(numbers[0].max(numbers[1])),
        }
    } else if numbers.len() == 1 {
        Range { min: None, max: Some(first) }
    } else {
        Range::default()
    };
    Some(range)
}

/// Valore numerico di un risultato (`"11,500"` -> 11500); `None` se non numerico
pub fn numeric_value(value: &str) -> Option<f64> {
    value.trim().replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

fn classify_in(range: &Range, value: f64) -> ParameterFlag {
    match (range.min, range.max) {
        (Some(min), _) if value < min => ParameterFlag::Low,
        (_, Some(max)) if value > max => ParameterFlag::High,
        _ => ParameterFlag::Normal,
    }
}

/// Intervallo effettivo: quello del referto se leggibile, altrimenti le soglie interne
fn effective_range(name: &str, range: Option<&str>) -> Option<Range> {
    range.and_then(parse_range).or_else(|| {
        thresholds_for(name).map(|t| Range {
            min: Some(t.normal_low),
            max: Some(t.normal_high),
        })
    })
}

/// Classifica il valore come normal/high/low
pub fn classify_flag(name: &str, value: &str, range: Option<&str>) -> ParameterFlag {
    match (numeric_value(value), effective_range(name, range)) {
        (Some(v), Some(r)) => classify_in(&r, v),
        _ => ParameterFlag::Normal,
    }
}

/// `true` se il valore supera una soglia critica nella direzione del flag
pub fn is_critical_value(name: &str, value: &str, flag: ParameterFlag) -> bool {
    let (Some(v), Some(t)) = (numeric_value(value), thresholds_for(name)) else {
        return false;
    };
    match flag {
        ParameterFlag::High => t.critical_high.is_some_and(|c| v >= c),
        ParameterFlag::Low => t.critical_low.is_some_and(|c| v <= c),
        ParameterFlag::Normal => false,
    }
}

/// Esito della valutazione di un singolo parametro
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub flag: ParameterFlag,
    pub is_critical: bool,
    /// Scostamento relativo oltre il limite violato (0.3 = 30% oltre)
    pub deviation: Option<f64>,
}

pub fn assess(name: &str, value: &str, range: Option<&str>) -> Assessment {
    let flag = classify_flag(name, value, range);
    let deviation = match (numeric_value(value), effective_range(name, range)) {
        (Some(v), Some(r)) => match flag {
            ParameterFlag::High => r.max.filter(|m| *m > 0.0).map(|m| (v - m) / m),
            ParameterFlag::Low => r.min.filter(|m| *m > 0.0).map(|m| (m - v) / m),
            ParameterFlag::Normal => None,
        },
        _ => None,
    };
    Assessment {
        flag,
        is_critical: is_critical_value(name, value, flag),
        deviation,
    }
}

/// Semaforo complessivo: rosso se un parametro è critico o oltre il 25% dal limite,
/// giallo se almeno uno è fuori range, verde altrimenti
pub fn flag_level(assessments: &[Assessment]) -> FlagLevel {
    assessments
        .iter()
        .map(|a| {
            if a.is_critical || a.deviation.is_some_and(|d| d > RED_DEVIATION) {
                FlagLevel::Red
            } else if a.flag.is_abnormal() {
                FlagLevel::Yellow
            } else {
                FlagLevel::Green
            }
        })
        .max()
        .unwrap_or(FlagLevel::Green)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_range("< 200 mg/dL"), Some(Range { min: None, max: Some(200.0) }));
        assert_eq!(parse_range("> 40"), Some(Range { min: Some(40.0), max: None }));
        assert_eq!(parse_range("13.5 - 17.5 g/dL"), Some(Range { min: Some(13.5), max: Some(17.5) }));
        assert_eq!(parse_range("100-70"), Some(Range { min: Some(70.0), max: Some(100.0) }));
        assert_eq!(parse_range("150"), Some(Range { min: None, max: Some(150.0) }));
        assert_eq!(parse_range("negative"), None);
    }

    #[test]
    fn test_classify_with_range() {
        assert_eq!(classify_flag("Cholesterol", "230", Some("< 200")), ParameterFlag::High);
        assert_eq!(classify_flag("HDL", "35", Some("> 40")), ParameterFlag::Low);
        assert_eq!(classify_flag("Hemoglobin", "14", Some("13.5-17.5")), ParameterFlag::Normal);
        assert_eq!(classify_flag("WBC", "11,500", Some("4000 - 11000")), ParameterFlag::High);
    }

    #[test]
    fn test_classify_falls_back_to_thresholds() {
        assert_eq!(classify_flag("Fasting Glucose", "120", None), ParameterFlag::High);
        assert_eq!(classify_flag("Serum Creatinine", "0.4", Some("n/a")), ParameterFlag::Low);
        assert_eq!(classify_flag("Unknown Marker", "999", None), ParameterFlag::Normal);
    }

    #[test]
    fn test_non_numeric_values_are_normal() {
        assert_eq!(classify_flag("Glucose", "Positive", Some("70-100")), ParameterFlag::Normal);
        assert!(!is_critical_value("Glucose", "Positive", ParameterFlag::High));
    }

    #[test]
    fn test_critical_values() {
        assert!(is_critical_value("Glucose", "450", ParameterFlag::High));
        assert!(is_critical_value("Glucose", "35", ParameterFlag::Low));
        assert!(!is_critical_value("Glucose", "150", ParameterFlag::High));
        assert!(is_critical_value("Hemoglobin", "6.5", ParameterFlag::Low));
        // la creatinina non ha soglia critica bassa
        assert!(!is_critical_value("Creatinine", "0.1", ParameterFlag::Low));
        assert!(!is_critical_value("Glucose", "450", ParameterFlag::Normal));
    }

    #[test]
    fn test_flag_level() {
        assert_eq!(flag_level(&[]), FlagLevel::Green);

        let normal = assess("Hemoglobin", "14", Some("13.5-17.5"));
        assert_eq!(flag_level(&[normal]), FlagLevel::Green);

        // 110 su max 100: 10% oltre -> giallo
        let mild = assess("Glucose", "110", Some("70-100"));
        assert_eq!(mild.flag, ParameterFlag::High);
        assert_eq!(flag_level(&[normal, mild]), FlagLevel::Yellow);

        // 130 su max 100: 30% oltre -> rosso
        let far = assess("Glucose", "130", Some("70-100"));
        assert_eq!(flag_level(&[normal, mild, far]), FlagLevel::Red);

        // critico anche se lo scostamento dal range del referto è piccolo
        let critical = assess("Hemoglobin", "6.9", Some("6.95-17.5"));
        assert!(critical.is_critical);
        assert_eq!(flag_level(&[critical]), FlagLevel::Red);
    }
}
