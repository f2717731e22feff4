//! Prompt e controlli di sicurezza basati su regole
//!
//! Nessuna diagnosi e nessuna prescrizione: i controlli qui sono applicati sia prima
//! della chiamata al modello (richiesta dell'utente) sia dopo (testo generato).

pub const BATCH_EXPLANATION_SYSTEM_PROMPT: &str = "You are a medical report explanation assistant. \
You explain lab results in an educational, non-diagnostic manner. \
NEVER provide a diagnosis, NEVER suggest specific treatments, NEVER prescribe medications. \
For abnormal values always recommend consulting a doctor.";

const BATCH_EXPLANATION_TEMPLATE: &str = "Given the following lab test results, return a JSON array.

Each item must contain:
- name (must match input name exactly)
- what (educational description of what the test measures)
- meaning (what the result means in general terms)
- causes (array of common causes, not patient-specific)
- next_steps (array of general recommendations)
- flag (normal / high / low)

Lab results:
{parameters_json}

Return ONLY valid JSON. No markdown. No explanation text.";

const CHATBOT_SYSTEM_TEMPLATE: &str = "You are a medical information assistant helping users understand their lab reports.

Your role is EDUCATIONAL ONLY:
- Answer questions about what tests mean
- Explain medical terms in simple language
- Provide educational information about health
- For abnormal values, ALWAYS suggest \"consult your doctor\"

STRICT PROHIBITIONS:
- NEVER provide medical diagnoses
- NEVER suggest specific treatments
- NEVER prescribe medications
- NEVER give medical advice specific to the user's condition
- NEVER interpret results as a diagnosis

If asked about diagnosis or treatment, you MUST respond:
\"I cannot provide medical diagnoses or treatment recommendations. Please consult with a qualified healthcare provider for personalized medical advice.\"

Current Report Context:
- Report Type: {report_type}
- Test Parameters: {parameters_summary}

Remember: You are an educational tool, not a replacement for medical consultation.";

pub const MEDIBOT_SYSTEM_PROMPT: &str = "You are MediBot, a helpful and strictly informational AI assistant inside the MediGuide app.
Your goal is to help users understand their medical reports based on the provided structured data.

CONSTRAINTS:
1. ANSWER ONLY BASED ON THE PROVIDED CONTEXT. Do not use outside knowledge unless it is a general medical definition.
2. If the user asks about something not in the report, politely refuse.

CONTEXT:
You will be provided with a JSON document containing:
1. report_metadata: type of report, date, lab name and overall flag.
2. parameters: medical result values, units, flags (high/low/normal), reference ranges and pre-generated educational explanations.

STRICT SAFETY RULES (NON-NEGOTIABLE):
1. NOT A DOCTOR: You are an AI, not a medical professional. Do NOT diagnose medical conditions. Do NOT prescribe medications or treatments.
2. NO \"YOU HAVE\": Never say \"You have [condition]\". Instead say \"This value suggests...\" or \"Elevated levels can be associated with...\".
3. NO \"YOU SHOULD\": Never give personal medical advice. Instead say \"Standard treatments for this often include... but consult your doctor.\"
4. REFER TO DOCTOR: For any decision-making, diagnosis, or treatment question, explicitly advise the user to consult a doctor.
5. REFUSAL: If the user asks \"Do I have cancer?\" or \"What medicine should I take?\", you MUST refuse to answer and redirect to a professional.

TONE:
- Professional, empathetic, simplified, and educational.
- Avoid jargon where possible, or explain it.

OUTPUT:
A clear, safe text response.";

pub const SYNTHESIS_SYSTEM_PROMPT: &str = "You are an expert medical AI assistant helping a doctor review patient history. \
Your goal is to synthesize the CURRENT report findings in the context of PAST reports. \
Identify what has changed, improved, or worsened. \
Input data is minified: d=date, t=type, p=parameters (n=name, v=value, u=unit, f=flag). \
Output must be valid JSON.";

const SYNTHESIS_USER_TEMPLATE: &str = "CURRENT:
{current}

HISTORY:
{history}

TASK:
1. Summarize the user's current health status based on this report.
2. Identify key trends (e.g., \"Hemoglobin has increased from 11.2 to 12.5\").
3. Write a \"Doctor's Precis\", a concise professional summary for a GP.

OUTPUT FORMAT:
{\"status_summary\": \"1-2 sentences on current status\", \"key_trends\": [\"trend 1\", \"trend 2\"], \"doctor_precis\": \"Paragraph for the doctor\"}";

pub const CHATBOT_REFUSAL_RESPONSES: [&str; 3] = [
    "I cannot provide medical diagnoses or treatment recommendations. Please consult with a qualified healthcare provider for personalized medical advice.",
    "I'm designed to provide educational information only. For medical diagnosis and treatment, please consult a healthcare professional.",
    "I can help explain what tests mean, but I cannot diagnose conditions or recommend treatments. Please see a doctor for medical advice.",
];

pub const CHATBOT_ERROR_RESPONSE: &str =
    "I apologize, I'm having trouble processing your question. Please consult your doctor for medical advice.";

pub const MEDIBOT_REFUSAL_RESPONSE: &str = "I am an AI assistant and cannot provide medical diagnoses or prescribe medication. Please consult a qualified doctor for personal medical advice and treatment options.";

pub const MEDIBOT_ERROR_RESPONSE: &str =
    "I'm having trouble connecting to my knowledge base right now. Please try again later.";

/// Stop sequence inviate al modello durante la chat
pub const CHATBOT_STOP_WORDS: [&str; 3] = ["diagnosis", "prescribe", "treatment for you"];

const DIAGNOSIS_KEYWORDS: [&str; 8] = [
    "diagnose",
    "diagnosis",
    "what do i have",
    "what's wrong with me",
    "do i have",
    "am i sick",
    "what disease",
    "what condition",
];

const TREATMENT_KEYWORDS: [&str; 8] = [
    "prescribe",
    "prescription",
    "what medicine",
    "what treatment",
    "how to treat",
    "cure",
    "medication",
    "drug",
];

const MEDIBOT_UNSAFE_KEYWORDS: [&str; 5] = [
    "prescribe",
    "medication for me",
    "diagnose me",
    "do i have cancer",
    "am i dying",
];

/// Frasi che non devono mai comparire in un testo generato
pub const FORBIDDEN_PHRASES: [&str; 6] = [
    "you have",
    "you are diagnosed",
    "you should take",
    "prescribe",
    "treatment is",
    "you need medication",
];

pub fn batch_explanation_prompt(parameters_json: &str) -> String {
    BATCH_EXPLANATION_TEMPLATE.replace("{parameters_json}", parameters_json)
}

pub fn chatbot_system_prompt(report_type: &str, parameters_summary: &str) -> String {
    CHATBOT_SYSTEM_TEMPLATE
        .replace("{report_type}", report_type)
        .replace("{parameters_summary}", parameters_summary)
}

pub fn synthesis_user_prompt(current: &str, history: &str) -> String {
    SYNTHESIS_USER_TEMPLATE
        .replace("{current}", current)
        .replace("{history}", history)
}

/// Vero se il messaggio chiede una diagnosi o un trattamento
pub fn is_diagnosis_request(message: &str) -> bool {
    let lower = message.to_lowercase();
    DIAGNOSIS_KEYWORDS
        .iter()
        .chain(TREATMENT_KEYWORDS.iter())
        .any(|k| lower.contains(k))
}

pub fn is_unsafe_question(question: &str) -> bool {
    let lower = question.to_lowercase();
    MEDIBOT_UNSAFE_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub fn contains_forbidden_phrase(text: &str) -> bool {
    let lower = text.to_lowercase();
    FORBIDDEN_PHRASES.iter().any(|p| lower.contains(p))
}

/// Sceglie una risposta di rifiuto in modo deterministico a partire dal messaggio
pub fn refusal_for(message: &str) -> &'static str {
    let sum: usize = message.bytes().map(usize::from).sum();
    CHATBOT_REFUSAL_RESPONSES[sum % CHATBOT_REFUSAL_RESPONSES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnosis_requests_are_detected() {
        assert!(is_diagnosis_request("Do I have diabetes?"));
        assert!(is_diagnosis_request("What MEDICINE should I take"));
        assert!(is_diagnosis_request("how to treat high cholesterol"));
        assert!(!is_diagnosis_request("What does hemoglobin measure?"));
    }

    #[test]
    fn test_unsafe_medibot_questions() {
        assert!(is_unsafe_question("Can you diagnose me?"));
        assert!(is_unsafe_question("Am I dying??"));
        assert!(!is_unsafe_question("What is LDL?"));
    }

    #[test]
    fn test_forbidden_phrases_case_insensitive() {
        assert!(contains_forbidden_phrase("You Have anemia."));
        assert!(!contains_forbidden_phrase("Low values can be associated with anemia."));
    }

    #[test]
    fn test_refusal_is_deterministic() {
        let first = refusal_for("do i have cancer");
        assert_eq!(first, refusal_for("do i have cancer"));
        assert!(CHATBOT_REFUSAL_RESPONSES.contains(&first));
    }

    #[test]
    fn test_templates_are_filled() {
        let prompt = chatbot_system_prompt("Lipid Panel", "LDL: 160 mg/dL (high)");
        assert!(prompt.contains("Report Type: Lipid Panel"));
        assert!(prompt.contains("LDL: 160 mg/dL (high)"));
        assert!(!prompt.contains('{'));

        let batch = batch_explanation_prompt("[{\"name\":\"LDL\"}]");
        assert!(batch.contains("[{\"name\":\"LDL\"}]"));
    }
}
