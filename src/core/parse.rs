use crate::domain::model::{DiagnosisItem, DifferentialDiagnosis, RelevanceVerdict};
use crate::utils::error::{DdxError, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

pub const MISSING_EXPLANATION: &str = "No explanation was provided by the model.";
pub const NO_CONDITIONS_EXPLANATION: &str = "No identifiable conditions were found in the model output.";

#[derive(Debug, Deserialize)]
struct WireDiagnosis {
    #[serde(default)]
    diagnoses: Vec<WireItem>,
    #[serde(default)]
    explanation: Option<String>,
}

// 舊版回覆只有字串清單，新版是物件
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireItem {
    Label(String),
    Detailed {
        #[serde(alias = "label", alias = "name")]
        condition: String,
        #[serde(default)]
        probability: Option<serde_json::Number>,
    },
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fence pattern is valid")
    })
}

/// Pulls the JSON object out of a model reply, tolerating markdown fences and chatter.
pub fn extract_json(raw: &str) -> Result<&str> {
    let body = match fence_regex().captures(raw).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw.trim(),
    };

    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&body[start..=end]),
        _ => Err(DdxError::malformed(format!(
            "expected a JSON object in model reply, got: {}",
            preview(raw)
        ))),
    }
}

pub fn parse_verdict(raw: &str) -> Result<RelevanceVerdict> {
    let json = extract_json(raw)?;
    let verdict: RelevanceVerdict = serde_json::from_str(json)?;
    Ok(verdict)
}

pub fn parse_diagnosis(raw: &str) -> Result<DifferentialDiagnosis> {
    let json = extract_json(raw)?;
    let wire: WireDiagnosis = serde_json::from_str(json)?;

    let diagnoses = wire
        .diagnoses
        .into_iter()
        .map(into_item)
        .collect::<Result<Vec<_>>>()?;

    let explanation = match wire.explanation.map(|text| text.trim().to_string()) {
        Some(text) if !text.is_empty() => text,
        _ if diagnoses.is_empty() => NO_CONDITIONS_EXPLANATION.to_string(),
        _ => MISSING_EXPLANATION.to_string(),
    };

    Ok(DifferentialDiagnosis {
        diagnoses,
        explanation,
    })
}

/// 自由文字模式：沒有清單，原文即說明
pub fn freeform_diagnosis(raw: &str) -> DifferentialDiagnosis {
    let text = raw.trim();
    DifferentialDiagnosis {
        diagnoses: Vec::new(),
        explanation: if text.is_empty() {
            MISSING_EXPLANATION.to_string()
        } else {
            text.to_string()
        },
    }
}

fn into_item(item: WireItem) -> Result<DiagnosisItem> {
    match item {
        WireItem::Label(condition) => Ok(DiagnosisItem::label(condition.trim())),
        WireItem::Detailed {
            condition,
            probability,
        } => {
            let probability = probability
                .map(|number| parse_probability(&condition, &number))
                .transpose()?;
            Ok(DiagnosisItem {
                condition: condition.trim().to_string(),
                probability,
            })
        }
    }
}

fn parse_probability(condition: &str, number: &serde_json::Number) -> Result<u8> {
    let value = match number.as_u64() {
        Some(value) => Some(value),
        None => number
            .as_f64()
            .filter(|value| value.fract() == 0.0 && *value >= 0.0)
            .map(|value| value as u64),
    };

    match value {
        Some(value) if value <= 100 => Ok(value as u8),
        _ => Err(DdxError::malformed(format!(
            "probability for '{}' must be an integer between 0 and 100, got {}",
            condition, number
        ))),
    }
}

fn preview(raw: &str) -> String {
    const LIMIT: usize = 120;
    if raw.chars().count() > LIMIT {
        let cut: String = raw.chars().take(LIMIT).collect();
        format!("{}...", cut)
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detailed_items_with_probabilities() {
        let raw = r#"{"diagnoses":[{"condition":"Pneumonia","probability":60},{"condition":"Atelectasis","probability":25}],"explanation":"Right lower lobe opacity."}"#;
        let result = parse_diagnosis(raw).unwrap();

        assert_eq!(result.diagnoses.len(), 2);
        assert_eq!(result.diagnoses[0], DiagnosisItem::with_probability("Pneumonia", 60));
        assert_eq!(result.explanation, "Right lower lobe opacity.");
    }

    #[test]
    fn accepts_plain_string_items() {
        let raw = r#"{"diagnoses":["Psoriasis","Eczema"],"explanation":"Scaly plaques."}"#;
        let result = parse_diagnosis(raw).unwrap();

        assert_eq!(
            result.diagnoses,
            vec![DiagnosisItem::label("Psoriasis"), DiagnosisItem::label("Eczema")]
        );
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "Here you go:\n```json\n{\"is_relevant\": false, \"reason\": \"Blank white image\"}\n```";
        let verdict = parse_verdict(raw).unwrap();

        assert!(!verdict.is_relevant);
        assert_eq!(verdict.reason, "Blank white image");
    }

    #[test]
    fn probabilities_are_not_required_to_sum_to_100() {
        let raw = r#"{"diagnoses":[{"condition":"A","probability":90},{"condition":"B","probability":80},{"condition":"C","probability":70}],"explanation":"x"}"#;
        let result = parse_diagnosis(raw).unwrap();

        let total: u32 = result
            .diagnoses
            .iter()
            .filter_map(|item| item.probability)
            .map(u32::from)
            .sum();
        assert_eq!(total, 240);
    }

    #[test]
    fn null_probability_means_no_estimate() {
        let raw = r#"{"diagnoses":[{"condition":"Eczema","probability":null},{"condition":"Tinea","probability":20}],"explanation":"x"}"#;
        let result = parse_diagnosis(raw).unwrap();

        assert_eq!(result.diagnoses[0], DiagnosisItem::label("Eczema"));
        assert_eq!(result.diagnoses[1].probability, Some(20));
    }

    #[test]
    fn integral_float_probability_is_accepted() {
        let raw = r#"{"diagnoses":[{"condition":"Fracture","probability":35.0}],"explanation":"x"}"#;
        let result = parse_diagnosis(raw).unwrap();
        assert_eq!(result.diagnoses[0].probability, Some(35));
    }

    #[test]
    fn out_of_range_probability_is_a_schema_mismatch() {
        let over = r#"{"diagnoses":[{"condition":"A","probability":140}],"explanation":"x"}"#;
        let fractional = r#"{"diagnoses":[{"condition":"A","probability":12.5}],"explanation":"x"}"#;
        let negative = r#"{"diagnoses":[{"condition":"A","probability":-3}],"explanation":"x"}"#;

        for raw in [over, fractional, negative] {
            assert!(matches!(
                parse_diagnosis(raw),
                Err(DdxError::MalformedResponseError { .. })
            ));
        }
    }

    #[test]
    fn empty_reply_gets_short_explanation() {
        let result = parse_diagnosis(r#"{"diagnoses":[],"explanation":"   "}"#).unwrap();

        assert!(result.diagnoses.is_empty());
        assert_eq!(result.explanation, NO_CONDITIONS_EXPLANATION);
    }

    #[test]
    fn missing_explanation_is_filled_in() {
        let result = parse_diagnosis(r#"{"diagnoses":["Gout"]}"#).unwrap();
        assert_eq!(result.explanation, MISSING_EXPLANATION);
    }

    #[test]
    fn non_json_reply_is_malformed() {
        let err = parse_diagnosis("I cannot help with that.").unwrap_err();
        assert!(matches!(err, DdxError::MalformedResponseError { .. }));
    }

    #[test]
    fn schema_mismatch_is_an_error() {
        assert!(parse_verdict(r#"{"relevant": "maybe"}"#).is_err());
    }

    #[test]
    fn freeform_keeps_raw_text() {
        let result = freeform_diagnosis("  Possible pneumothorax on the left.  ");
        assert!(result.diagnoses.is_empty());
        assert_eq!(result.explanation, "Possible pneumothorax on the left.");
    }
}
