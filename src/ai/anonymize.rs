//! Rimozione dei dati identificativi prima di scrivere testo OCR o dati paziente nei log

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FULL_NAME: Regex = Regex::new(r"\b[A-Z][a-z]+ [A-Z][a-z]+\b").unwrap();
    static ref PATIENT_ID: Regex = Regex::new(r"(?i)\bID:?\s*\d+").unwrap();
    static ref MRN: Regex = Regex::new(r"(?i)\bMRN:?\s*\d+").unwrap();
}

pub fn anonymize_text(text: &str) -> String {
    let text = FULL_NAME.replace_all(text, "[Patient]");
    let text = PATIENT_ID.replace_all(&text, "ID: [Redacted]");
    MRN.replace_all(&text, "MRN: [Redacted]").into_owned()
}
