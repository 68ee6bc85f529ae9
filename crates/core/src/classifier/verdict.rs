//! Extracting and interpreting the classifier's verdict.
//!
//! The classifier may log freely to stdout; the verdict is the last JSON
//! object carrying a class name and a confidence.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::error::InvocationFailure;
use super::label::ClassificationLabel;

/// Details stored for photos that are not mushrooms.
pub const NOT_A_MUSHROOM_DETAILS: &str =
    "The image does not appear to be a mushroom or is not clearly identifiable.";

/// Fallback details for class names mentioning "edible".
pub const EDIBLE_DETAILS: &str = "This mushroom appears to be from an edible variety, though always consult an expert before consumption.";

/// Fallback details for class names mentioning "poisonous".
pub const POISONOUS_DETAILS: &str =
    "This mushroom appears to have characteristics consistent with poisonous varieties. Do not consume.";

/// Fallback details for any other identified class.
pub const GENERIC_DETAILS: &str = "This mushroom has been identified. Always consult an expert before handling or consuming any wild mushroom.";

const CONFIDENCE_SCALE: u32 = 4;

/// Opening braces tried, counting back from the end of stdout.
const MAX_VERDICT_CANDIDATES: usize = 256;

/// A verdict as reported by the classifier, before label mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the photo shows a mushroom, when reported.
    pub is_mushroom: Option<bool>,
    /// Reported class name, as emitted.
    pub class_name: String,
    /// Confidence normalized to `[0, 1]`.
    pub confidence: Decimal,
    /// Explanation supplied by the classifier.
    pub details: Option<String>,
}

/// A verdict mapped onto the label set, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVerdict {
    /// Stored label.
    pub label: ClassificationLabel,
    /// Confidence in `[0, 1]`.
    pub confidence: Decimal,
    /// Explanation text, never empty.
    pub details: String,
}

/// Class name outside the label set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized class name '{0}'")]
pub struct UnknownClass(pub String);

#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    classification: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    is_mushroom: Option<bool>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    details: Option<String>,
}

impl RawVerdict {
    fn into_verdict(self) -> Option<Verdict> {
        let class_name = [self.classification, self.class]
            .into_iter()
            .flatten()
            .map(|name| name.trim().to_string())
            .find(|name| !name.is_empty())?;
        let confidence = normalize_confidence(self.confidence.as_ref()?)?;

        Some(Verdict {
            is_mushroom: self.is_mushroom,
            class_name,
            confidence,
            details: self.details,
        })
    }
}

/// Finds the last well-formed verdict object in `stdout`.
///
/// Objects without a class name or with an unusable confidence are skipped.
/// Only the last [`MAX_VERDICT_CANDIDATES`] opening braces are considered.
#[must_use]
pub fn extract_verdict(stdout: &str) -> Option<Verdict> {
    stdout
        .rmatch_indices('{')
        .take(MAX_VERDICT_CANDIDATES)
        .find_map(|(start, _)| {
            let mut stream =
                serde_json::Deserializer::from_str(&stdout[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value @ Value::Object(_))) => serde_json::from_value::<RawVerdict>(value)
                    .ok()
                    .and_then(RawVerdict::into_verdict),
                _ => None,
            }
        })
}

/// Normalizes a reported confidence to `[0, 1]`.
///
/// Accepts numbers and numeric strings. A `%` suffix, or a bare value in
/// `(1, 100]`, is read as a percentage. Anything else out of range is
/// rejected.
#[must_use]
pub fn normalize_confidence(raw: &Value) -> Option<Decimal> {
    let (text, percent) = match raw {
        Value::Number(n) => (n.to_string(), false),
        Value::String(s) => {
            let trimmed = s.trim();
            match trimmed.strip_suffix('%') {
                Some(number) => (number.trim().to_string(), true),
                None => (trimmed.to_string(), false),
            }
        }
        _ => return None,
    };

    let value = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?;

    let hundred = Decimal::ONE_HUNDRED;
    let value = if percent || (value > Decimal::ONE && value <= hundred) {
        value.checked_div(hundred)?
    } else {
        value
    };

    if value < Decimal::ZERO || value > Decimal::ONE {
        return None;
    }

    Some(value.round_dp(CONFIDENCE_SCALE).normalize())
}

impl Verdict {
    /// Maps the reported class onto the label set.
    ///
    /// A verdict that says the photo is not a mushroom always becomes
    /// [`ClassificationLabel::NotAMushroom`] with fixed details. Otherwise the
    /// lower-cased class name must be a label or a legacy alias.
    pub fn resolve(self) -> Result<ResolvedVerdict, UnknownClass> {
        let name = self.class_name.to_lowercase();
        let not_a_mushroom = self.is_mushroom.map_or_else(
            || name == ClassificationLabel::NotAMushroom.as_str(),
            |is_mushroom| !is_mushroom,
        );

        if not_a_mushroom {
            return Ok(ResolvedVerdict {
                label: ClassificationLabel::NotAMushroom,
                confidence: self.confidence,
                details: NOT_A_MUSHROOM_DETAILS.to_string(),
            });
        }

        let label = ClassificationLabel::parse(&name)
            .or_else(|| ClassificationLabel::from_legacy(&name))
            .filter(|label| *label != ClassificationLabel::NotAMushroom)
            .ok_or_else(|| UnknownClass(self.class_name.clone()))?;

        let details = self
            .details
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| default_details(&name).to_string());

        Ok(ResolvedVerdict {
            label,
            confidence: self.confidence,
            details,
        })
    }
}

/// Canned details keyed on the lower-cased class name.
#[must_use]
pub fn default_details(class_name: &str) -> &'static str {
    if class_name.contains("edible") {
        EDIBLE_DETAILS
    } else if class_name.contains("poisonous") {
        POISONOUS_DETAILS
    } else {
        GENERIC_DETAILS
    }
}

/// Turns a successful run's stdout into a resolved verdict.
pub fn interpret(stdout: &str) -> Result<ResolvedVerdict, InvocationFailure> {
    let verdict = extract_verdict(stdout).ok_or_else(|| InvocationFailure::MalformedOutput {
        raw_output: stdout.to_string(),
    })?;

    verdict
        .resolve()
        .map_err(|UnknownClass(label)| InvocationFailure::UnrecognizedLabel {
            label,
            raw_output: stdout.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_extract_skips_log_noise() {
        let stdout = "Loading model weights...\n\
            1/1 [==============================] - 0s 120ms/step\n\
            {\"is_mushroom\": true, \"classification\": \"edible\", \"confidence\": 0.93, \"details\": \"Chanterelle-like.\"}\n";

        let verdict = extract_verdict(stdout).unwrap();
        assert_eq!(verdict.class_name, "edible");
        assert_eq!(verdict.confidence, dec!(0.93));
        assert_eq!(verdict.details.as_deref(), Some("Chanterelle-like."));
    }

    #[test]
    fn test_extract_prefers_last_object() {
        let stdout = r#"{"class": "poisonous", "confidence": 0.5}
progress {"step": 2}
{"class": "deadly", "confidence": "0.80", "meta": {"model": "v2"}} done"#;

        let verdict = extract_verdict(stdout).unwrap();
        assert_eq!(verdict.class_name, "deadly");
        assert_eq!(verdict.confidence, dec!(0.8));
    }

    #[test]
    fn test_extract_accepts_class_alias() {
        let verdict =
            extract_verdict(r#"{"class": "not_a_mushroom", "confidence": "0.41", "is_mushroom": false}"#)
                .unwrap();
        assert_eq!(verdict.class_name, "not_a_mushroom");
        assert_eq!(verdict.is_mushroom, Some(false));
    }

    #[test]
    fn test_extract_ignores_empty_class_name() {
        assert!(extract_verdict(r#"{"classification": "", "class": "", "confidence": ""}"#).is_none());
    }

    #[test]
    fn test_extract_skips_trailing_brace_noise() {
        let stdout = format!(
            "{}\n{}",
            r#"{"classification": "edible", "confidence": 0.7}"#,
            "{".repeat(MAX_VERDICT_CANDIDATES - 1)
        );

        let verdict = extract_verdict(&stdout).unwrap();

        assert_eq!(verdict.class_name, "edible");
    }

    #[test]
    fn test_extract_gives_up_past_candidate_limit() {
        let stdout = format!(
            "{}\n{}",
            r#"{"classification": "edible", "confidence": 0.7}"#,
            r#"{"x": "#.repeat(MAX_VERDICT_CANDIDATES)
        );

        assert!(extract_verdict(&stdout).is_none());
    }

    #[test]
    fn test_extract_returns_none_without_json() {
        assert!(extract_verdict("Traceback (most recent call last):\n  ...").is_none());
        assert!(extract_verdict("{ not json").is_none());
        assert!(extract_verdict("").is_none());
    }

    #[rstest]
    #[case(json!("87.00%"), dec!(0.87))]
    #[case(json!("91.50%"), dec!(0.915))]
    #[case(json!(" 12.5 % "), dec!(0.125))]
    #[case(json!(0.42), dec!(0.42))]
    #[case(json!("0.95"), dec!(0.95))]
    #[case(json!(87), dec!(0.87))]
    #[case(json!(1), dec!(1))]
    #[case(json!(0), dec!(0))]
    #[case(json!(0.123_456), dec!(0.1235))]
    fn test_normalize_confidence(#[case] raw: Value, #[case] expected: Decimal) {
        assert_eq!(normalize_confidence(&raw), Some(expected));
    }

    #[rstest]
    #[case(json!(-0.1))]
    #[case(json!(150))]
    #[case(json!("120%"))]
    #[case(json!(""))]
    #[case(json!("high"))]
    #[case(json!(true))]
    #[case(json!(null))]
    fn test_normalize_confidence_rejects(#[case] raw: Value) {
        assert_eq!(normalize_confidence(&raw), None);
    }

    #[test]
    fn test_resolve_edible_with_percentage() {
        let resolved = interpret(
            r#"{"is_mushroom": true, "classification": "Edible", "confidence": "91.50%"}"#,
        )
        .unwrap();

        assert_eq!(resolved.label, ClassificationLabel::Edible);
        assert_eq!(resolved.confidence, dec!(0.915));
        assert_eq!(resolved.details, EDIBLE_DETAILS);
    }

    #[test]
    fn test_resolve_not_a_mushroom_uses_fixed_details() {
        let resolved = interpret(
            r#"{"is_mushroom": false, "class": "dog", "confidence": "0.77", "details": "A dog."}"#,
        )
        .unwrap();

        assert_eq!(resolved.label, ClassificationLabel::NotAMushroom);
        assert_eq!(resolved.confidence, dec!(0.77));
        assert_eq!(resolved.details, NOT_A_MUSHROOM_DETAILS);
    }

    #[test]
    fn test_resolve_keeps_classifier_details() {
        let resolved = interpret(
            r#"{"is_mushroom": true, "classification": "deadly", "confidence": 0.99, "details": "Death cap features."}"#,
        )
        .unwrap();

        assert_eq!(resolved.label, ClassificationLabel::Deadly);
        assert_eq!(resolved.details, "Death cap features.");
    }

    #[rstest]
    #[case("conditionally_edible", ClassificationLabel::ConditionallyEdible, EDIBLE_DETAILS)]
    #[case("deadly", ClassificationLabel::Deadly, GENERIC_DETAILS)]
    #[case("POISONOUS", ClassificationLabel::Poisonous, POISONOUS_DETAILS)]
    #[case("edible_mushroom_sporocarp", ClassificationLabel::Edible, EDIBLE_DETAILS)]
    #[case("poisonous_sporocarp", ClassificationLabel::Poisonous, POISONOUS_DETAILS)]
    fn test_resolve_default_details(
        #[case] class_name: &str,
        #[case] label: ClassificationLabel,
        #[case] details: &str,
    ) {
        let verdict = Verdict {
            is_mushroom: Some(true),
            class_name: class_name.to_string(),
            confidence: dec!(0.6),
            details: Some("   ".to_string()),
        };

        let resolved = verdict.resolve().unwrap();
        assert_eq!(resolved.label, label);
        assert_eq!(resolved.details, details);
    }

    #[rstest]
    #[case("unknown")]
    #[case("error")]
    #[case("truffle")]
    fn test_unrecognized_label_is_rejected(#[case] class_name: &str) {
        let stdout = format!(r#"{{"is_mushroom": true, "class": "{class_name}", "confidence": 0}}"#);

        match interpret(&stdout) {
            Err(InvocationFailure::UnrecognizedLabel { label, raw_output }) => {
                assert_eq!(label, class_name);
                assert_eq!(raw_output, stdout);
            }
            other => panic!("expected UnrecognizedLabel, got {other:?}"),
        }
    }

    #[test]
    fn test_mushroom_verdict_cannot_claim_not_a_mushroom_label() {
        let stdout = r#"{"is_mushroom": true, "class": "not_a_mushroom", "confidence": 0.5}"#;
        assert!(matches!(
            interpret(stdout),
            Err(InvocationFailure::UnrecognizedLabel { .. })
        ));
    }

    #[test]
    fn test_missing_verdict_is_malformed() {
        assert!(matches!(
            interpret("Loading model...\n"),
            Err(InvocationFailure::MalformedOutput { raw_output }) if raw_output == "Loading model...\n"
        ));
    }

    proptest! {
        #[test]
        fn prop_normalized_confidence_in_unit_range(raw in "[0-9]{1,3}(\\.[0-9]{1,4})?%?") {
            if let Some(value) = normalize_confidence(&Value::String(raw)) {
                prop_assert!(value >= Decimal::ZERO && value <= Decimal::ONE);
            }
        }

        #[test]
        fn prop_noise_before_verdict_is_tolerated(noise in "[a-zA-Z0-9 .:=\\[\\]\n-]{0,200}") {
            let stdout = format!("{noise}\n{{\"class\": \"edible\", \"confidence\": 0.5}}");
            let verdict = extract_verdict(&stdout);
            prop_assert!(verdict.is_some());
            prop_assert_eq!(verdict.unwrap().class_name, "edible");
        }
    }
}
