//! Fixed prompts and response schemas for each pipeline stage.

use crate::domain::ports::ResponseSchema;
use serde_json::json;

pub const RELEVANCE_SCHEMA_NAME: &str = "relevance_verdict";
pub const DIAGNOSIS_SCHEMA_NAME: &str = "differential_diagnosis";

pub const RELEVANCE_PROMPT: &str = "You are a filter that evaluates whether an uploaded image is relevant \
for medical or biological diagnostic purposes. Reply with is_relevant set to true and a short reason \
if the image looks appropriate for generating a differential diagnosis. Otherwise reply with \
is_relevant set to false and a short reason explaining why.";

pub const DIAGNOSIS_PROMPT: &str = "You are a medical imaging assistant trained in dermatology, radiology \
and general clinical diagnostics. Given an image, provide a differential diagnosis: a list of possible \
conditions and a brief explanation of the visual findings behind them. Never make a definitive \
diagnosis; only give possibilities with reasoning. Base your answer only on the content of the image.";

pub const DIAGNOSIS_SCHEMA_INSTRUCTIONS: &str = "Return each condition with an estimated probability \
between 0 and 100, or null when no estimate can be given. The probabilities do not need to add up to 100.";

pub const DIAGNOSIS_FREEFORM_INSTRUCTIONS: &str = "Describe the findings and list the possible \
conditions in plain text.";

pub const STRUCTURING_PROMPT: &str = "You convert a free-text radiology style assessment into JSON. \
Extract every candidate condition mentioned, with its probability (0 to 100) when one is stated, \
and summarise the reasoning as a short explanation. If the text is not a medical assessment or \
contains no identifiable conditions, return an empty diagnoses list and a one sentence explanation \
instead of failing.";

pub fn relevance_schema() -> ResponseSchema {
    ResponseSchema {
        name: RELEVANCE_SCHEMA_NAME,
        schema: json!({
            "type": "object",
            "properties": {
                "is_relevant": { "type": "boolean" },
                "reason": { "type": "string" }
            },
            "required": ["is_relevant", "reason"],
            "additionalProperties": false
        }),
    }
}

pub fn diagnosis_schema() -> ResponseSchema {
    ResponseSchema {
        name: DIAGNOSIS_SCHEMA_NAME,
        schema: json!({
            "type": "object",
            "properties": {
                "diagnoses": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "condition": { "type": "string" },
                            "probability": { "type": ["integer", "null"], "minimum": 0, "maximum": 100 }
                        },
                        "required": ["condition", "probability"],
                        "additionalProperties": false
                    }
                },
                "explanation": { "type": "string" }
            },
            "required": ["diagnoses", "explanation"],
            "additionalProperties": false
        }),
    }
}
