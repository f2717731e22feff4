//! Parser del testo OCR: parametri di laboratorio, tipo di referto, laboratorio, data e paziente

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Parole chiave che rendono una riga candidata a contenere un parametro
const MEDICAL_KEYWORDS: &[&str] = &[
    // emocromo
    "hemoglobin", "hb", "rbc", "wbc", "platelet", "hematocrit", "pcv", "mcv", "mch", "mchc", "rdw",
    // profilo lipidico
    "cholesterol", "hdl", "ldl", "triglyceride", "vldl",
    // funzionalità epatica
    "alt", "ast", "sgot", "sgpt", "bilirubin", "albumin", "alkaline", "phosphatase",
    // funzionalità renale
    "creatinine", "urea", "bun", "uric acid", "egfr",
    // diabete
    "glucose", "hba1c", "fasting", "random",
    // tiroide
    "tsh", "t3", "t4", "ft3", "ft4",
    // formula leucocitaria
    "neutrophil", "lymphocyte", "monocyte", "eosinophil", "basophil",
    // altri
    "calcium", "sodium", "potassium", "chloride", "magnesium", "phosphorus",
    "vitamin d", "vitamin b12", "folate", "ferritin", "iron",
];

const LAB_KEYWORDS: &[&str] = &["lab", "diagnostics", "laboratory", "clinic"];

/// (parole chiave, tipo) nell'ordine di priorità
const REPORT_TYPES: &[(&[&str], &str)] = &[
    (&["cbc", "complete blood count", "haematology"], "Complete Blood Count"),
    (&["lipid", "cholesterol"], "Lipid Panel"),
    (&["bmp", "basic metabolic panel"], "Basic Metabolic Panel"),
    (&["lft", "liver function"], "Liver Function Test"),
    (&["hba1c", "hemoglobin a1c"], "HbA1c Test"),
    (&["thyroid"], "Thyroid Panel"),
    (&["urine"], "Urine Analysis"),
    (&["stool"], "Stool Analysis"),
];

pub const UNKNOWN_LAB: &str = "Unknown Lab";
pub const OTHER_REPORT_TYPE: &str = "Other";

lazy_static! {
    // Name Value Unit (Range), es. "Hemoglobin 8.5 g/dL (13.0 - 17.0)"
    static ref PARAMETER_RE: Regex = Regex::new(
        r"(?i)([A-Za-z\s]+(?:\([^)]+\))?)\s+([\d,\.]+)\s*([a-zA-Z/%µ]+)?\s*(?:\(([^)]+)\))?"
    ).unwrap();
    static ref NUMBER_TOKEN_RE: Regex = Regex::new(r"^[\d\.]+$").unwrap();
    static ref UNIT_TOKEN_RE: Regex = Regex::new(r"^[a-zA-Z/%µ]+$").unwrap();
    static ref PAREN_RANGE_RE: Regex = Regex::new(r"\(([^)]+)\)").unwrap();
    static ref SPACES_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref TEST_PREFIX_RE: Regex = Regex::new(r"(?i)^test\s+").unwrap();
    static ref ISO_DATE_RE: Regex = Regex::new(r"\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b").unwrap();
    static ref DMY_DATE_RE: Regex = Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b").unwrap();
    static ref PATIENT_NAME_RE: Regex = Regex::new(
        r"(?im)^\s*(?:patient(?:'s)?\s*name|patient|name)\s*[:\-]\s*([A-Za-z][A-Za-z.' ]*?)\s*(?:\s{2,}|\s(?:age|sex|gender)\b|$)"
    ).unwrap();
    static ref AGE_RE: Regex = Regex::new(
        r"(?i)\bage(?:\s*/\s*(?:sex|gender))?\s*[:\-]?\s*(\d{1,3})\b"
    ).unwrap();
    static ref GENDER_RE: Regex = Regex::new(
        r"(?i)\b(?:sex|gender)\s*[:\-]\s*(male|female|other|m|f)\b"
    ).unwrap();
    static ref AGE_SEX_RE: Regex = Regex::new(
        r"(?i)\bage\s*/\s*(?:sex|gender)\s*[:\-]?\s*\d{1,3}\s*(?:y(?:ears?|rs?)?)?\s*/\s*(male|female|m|f)\b"
    ).unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedParameter {
    pub name: String,
    pub value: String,
    pub unit: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedReport {
    pub report_type: String,
    pub lab_name: String,
    pub date: Option<String>,
    pub patient_name: Option<String>,
    pub patient_age: Option<String>,
    pub patient_gender: Option<String>,
    pub parameters: Vec<ParsedParameter>,
}

/// Struttura il testo grezzo dell'OCR
pub fn parse_report(text: &str) -> ParsedReport {
    let (patient_name, patient_age, patient_gender) = extract_patient(text);
    ParsedReport {
        report_type: detect_report_type(text).to_string(),
        lab_name: extract_lab_name(text),
        date: extract_date(text),
        patient_name,
        patient_age,
        patient_gender,
        parameters: extract_parameters(text),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn clean_name(raw: &str) -> String {
    let collapsed = SPACES_RE.replace_all(raw.trim(), " ");
    TEST_PREFIX_RE.replace(&collapsed, "").into_owned()
}

fn is_number_token(token: &str) -> bool {
    NUMBER_TOKEN_RE.is_match(&token.replace(',', ""))
}

pub fn extract_parameters(text: &str) -> Vec<ParsedParameter> {
    let mut parameters = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.len() < 3 {
            continue;
        }
        let lower = line.to_lowercase();
        if !MEDICAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
            continue;
        }

        if let Some(caps) = PARAMETER_RE.captures(line) {
            parameters.push(ParsedParameter {
                name: clean_name(&caps[1]),
                value: caps[2].replace(',', ""),
                unit: caps.get(3).and_then(|m| non_empty(m.as_str())),
                range: caps.get(4).and_then(|m| non_empty(m.as_str())),
            });
        } else if let Some(parameter) = parse_tokens(line) {
            parameters.push(parameter);
        }
    }

    if parameters.is_empty() {
        parameters = lenient_parameters(text);
    }
    parameters
}

/// Fallback per token: nome = parole prima del primo numero, poi unità e range opzionali
fn parse_tokens(line: &str) -> Option<ParsedParameter> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let value_idx = parts.iter().position(|p| is_number_token(p)).filter(|&i| i > 0)?;

    let rest = &parts[value_idx + 1..];
    let unit = rest
        .first()
        .filter(|p| UNIT_TOKEN_RE.is_match(p))
        .map(|p| p.to_string());
    let range = PAREN_RANGE_RE
        .captures(&rest.join(" "))
        .and_then(|c| non_empty(&c[1]));

    Some(ParsedParameter {
        name: parts[..value_idx].join(" "),
        value: parts[value_idx].replace(',', ""),
        unit,
        range,
    })
}

/// Ultima risorsa quando nessuna riga con parole chiave ha prodotto parametri:
/// qualunque riga "parole poi numero" è trattata come risultato.
fn lenient_parameters(text: &str) -> Vec<ParsedParameter> {
    text.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 2 || !line.chars().any(|c| c.is_ascii_digit()) {
                return None;
            }
            let idx = parts.iter().position(|p| is_number_token(p))?;
            (idx > 0).then(|| ParsedParameter {
                name: parts[..idx].join(" "),
                value: parts[idx].replace(',', ""),
                unit: None,
                range: None,
            })
        })
        .collect()
}

pub fn detect_report_type(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    REPORT_TYPES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, report_type)| *report_type)
        .unwrap_or(OTHER_REPORT_TYPE)
}

pub fn extract_lab_name(text: &str) -> String {
    text.lines()
        .take(10)
        .find(|line| {
            let lower = line.to_lowercase();
            LAB_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| UNKNOWN_LAB.to_string())
}

/// Prima data ISO (`YYYY-MM-DD`), altrimenti la prima `DD/MM/YYYY`; `None` se assente
pub fn extract_date(text: &str) -> Option<String> {
    ISO_DATE_RE
        .find(text)
        .or_else(|| DMY_DATE_RE.find(text))
        .map(|m| m.as_str().to_string())
}

fn normalize_gender(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "m" | "male" => "Male".to_string(),
        "f" | "female" => "Female".to_string(),
        _ => "Other".to_string(),
    }
}

fn extract_patient(text: &str) -> (Option<String>, Option<String>, Option<String>) {
    let name = PATIENT_NAME_RE
        .captures(text)
        .and_then(|c| non_empty(&c[1]));
    let age = AGE_RE.captures(text).map(|c| c[1].to_string());
    let gender = GENDER_RE
        .captures(text)
        .or_else(|| AGE_SEX_RE.captures(text))
        .map(|c| normalize_gender(&c[1]));
    (name, age, gender)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CBC_REPORT: &str = "\
City Diagnostics Lab
123 Main Street
Patient Name: John Smith    Age: 45
Sex: M
Date: 2024-01-15
COMPLETE BLOOD COUNT (CBC)
Hemoglobin 8.5 g/dL (13.0 - 17.0)
Total WBC Count 11,500 /cumm (4000 - 11000)
Platelet Count 2.5 lakh/cumm (1.5 - 4.5)
";

    #[test]
    fn test_parse_full_report() {
        let report = parse_report(CBC_REPORT);

        assert_eq!(report.report_type, "Complete Blood Count");
        assert_eq!(report.lab_name, "City Diagnostics Lab");
        assert_eq!(report.date.as_deref(), Some("2024-01-15"));
        assert_eq!(report.patient_name.as_deref(), Some("John Smith"));
        assert_eq!(report.patient_age.as_deref(), Some("45"));
        assert_eq!(report.patient_gender.as_deref(), Some("Male"));

        let hb = &report.parameters[0];
        assert_eq!(hb.name, "Hemoglobin");
        assert_eq!(hb.value, "8.5");
        assert_eq!(hb.unit.as_deref(), Some("g/dL"));
        assert_eq!(hb.range.as_deref(), Some("13.0 - 17.0"));
    }

    #[test]
    fn test_commas_are_stripped_from_values() {
        let params = extract_parameters("Total WBC Count 11,500 /cumm (4000 - 11000)");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "Total WBC Count");
        assert_eq!(params[0].value, "11500");
    }

    #[test]
    fn test_test_prefix_removed() {
        let params = extract_parameters("Test Glucose 110 mg/dL (70-100)");
        assert_eq!(params[0].name, "Glucose");
        assert_eq!(params[0].range.as_deref(), Some("70-100"));
    }

    #[test]
    fn test_lenient_pass_when_no_keywords_match() {
        let params = extract_parameters("Widget Index 42\nno numbers here\nX 7");
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "Widget Index");
        assert_eq!(params[0].value, "42");
        assert!(params[0].unit.is_none());
        assert_eq!(params[1].name, "X");
    }

    #[test]
    fn test_report_type_priority() {
        assert_eq!(detect_report_type("LIPID PROFILE"), "Lipid Panel");
        assert_eq!(detect_report_type("Thyroid function"), "Thyroid Panel");
        assert_eq!(detect_report_type("haematology and lipid"), "Complete Blood Count");
        assert_eq!(detect_report_type("misc"), "Other");
    }

    #[test]
    fn test_lab_name_only_in_first_ten_lines() {
        let mut text = String::new();
        for i in 0..10 {
            text.push_str(&format!("line {}\n", i));
        }
        text.push_str("Some Laboratory\n");
        assert_eq!(extract_lab_name(&text), UNKNOWN_LAB);
        assert_eq!(extract_lab_name("Acme Clinic\nfoo"), "Acme Clinic");
    }

    #[test]
    fn test_date_extraction() {
        assert_eq!(extract_date("Collected 15/01/2024, reported 2024-01-16").as_deref(), Some("2024-01-16"));
        assert_eq!(extract_date("Collected 15/01/2024").as_deref(), Some("15/01/2024"));
        assert_eq!(extract_date("no date"), None);
    }

    #[test]
    fn test_age_sex_combined_line() {
        let report = parse_report("Name: Jane Doe\nAge/Sex: 34 Y / F\n");
        assert_eq!(report.patient_name.as_deref(), Some("Jane Doe"));
        assert_eq!(report.patient_age.as_deref(), Some("34"));
        assert_eq!(report.patient_gender.as_deref(), Some("Female"));
    }
}
