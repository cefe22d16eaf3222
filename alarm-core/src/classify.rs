//! Classification of alarm endpoint responses.
//!
//! Servers answer with differently shaped JSON objects, so the verdict comes
//! from an ordered rule table. The first rule whose predicate matches decides;
//! nothing matching means "no alarm".
//!
//! | # | Predicate                          | Verdict                          |
//! |---|------------------------------------|----------------------------------|
//! | 1 | `alarm` is a boolean               | that boolean                     |
//! | 2 | `detection` present (any type)     | alarm                            |
//! | 3 | `success` and `detection` present  | alarm only if `detection` is an object |
//!
//! A non-boolean `alarm` (`null`, `"yes"`, `1`) does not match rule 1, so a
//! body such as `{"alarm":null,"detection":{}}` is decided by rule 2 and
//! counts as an alarm. Firmware that coerces any `alarm` key to a boolean
//! would report "no alarm" for it.
//!
//! Rule 3 can never be reached through the full chain because rule 2 already
//! matches whenever `detection` exists. Both are kept as written.

use serde::Serialize;
use serde_json::{Map, Value};

type Fields = Map<String, Value>;

/// Which rule produced a positive verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlarmSource {
    AlarmField,
    DetectionPresent,
    SuccessWithDetection,
}

/// Result of one poll. Only [`PollOutcome::Alarm`] means the annunciator fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Alarm(AlarmSource),
    /// A rule matched and said "no alarm".
    Clear,
    /// Valid JSON, but no rule matched. `fields` lists the top-level keys seen.
    Unrecognized { fields: Vec<String> },
    DecodeFailed { reason: String },
    /// The server answered with a non-2xx status.
    HttpStatus { code: u16 },
    /// No HTTP status was obtained at all.
    TransportFailed { reason: String },
    /// The link could not be (re)established; the poll was skipped.
    Offline,
}

impl PollOutcome {
    pub fn is_alarm(&self) -> bool {
        matches!(self, PollOutcome::Alarm(_))
    }

    /// Short label for status snapshots and logs.
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Alarm(_) => "alarm",
            PollOutcome::Clear => "clear",
            PollOutcome::Unrecognized { .. } => "unrecognized",
            PollOutcome::DecodeFailed { .. } => "decode_failed",
            PollOutcome::HttpStatus { .. } => "http_status",
            PollOutcome::TransportFailed { .. } => "transport_failed",
            PollOutcome::Offline => "offline",
        }
    }
}

/// One row of the decision table.
pub struct Rule {
    pub name: &'static str,
    pub source: AlarmSource,
    pub applies: fn(&Fields) -> bool,
    pub verdict: fn(&Fields) -> bool,
}

pub static RULES: [Rule; 3] = [
    Rule {
        name: "boolean alarm field",
        source: AlarmSource::AlarmField,
        applies: |f| f.get("alarm").is_some_and(Value::is_boolean),
        verdict: |f| f.get("alarm").and_then(Value::as_bool).unwrap_or(false),
    },
    Rule {
        name: "detection present",
        source: AlarmSource::DetectionPresent,
        applies: |f| f.contains_key("detection"),
        verdict: |_| true,
    },
    Rule {
        name: "success with structured detection",
        source: AlarmSource::SuccessWithDetection,
        applies: |f| f.contains_key("success") && f.contains_key("detection"),
        verdict: |f| f.get("detection").is_some_and(Value::is_object),
    },
];

/// Run an already-decoded object through the rule table.
pub fn classify_fields(fields: &Fields) -> PollOutcome {
    for rule in RULES.iter() {
        if (rule.applies)(fields) {
            let alarm = (rule.verdict)(fields);
            log::debug!("Rule '{}' matched: alarm={}", rule.name, alarm);
            return if alarm {
                PollOutcome::Alarm(rule.source)
            } else {
                PollOutcome::Clear
            };
        }
    }

    PollOutcome::Unrecognized {
        fields: fields.keys().cloned().collect(),
    }
}

/// Decode a response body and classify it. Never panics on malformed input.
pub fn classify_body(body: &[u8]) -> PollOutcome {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => classify_fields(&fields),
        Ok(_) => PollOutcome::Unrecognized { fields: Vec::new() },
        Err(e) => PollOutcome::DecodeFailed {
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn classify(value: Value) -> PollOutcome {
        classify_body(value.to_string().as_bytes())
    }

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test helper expects an object"),
        }
    }

    #[test]
    fn test_alarm_true() {
        assert_eq!(
            classify(json!({ "alarm": true })),
            PollOutcome::Alarm(AlarmSource::AlarmField)
        );
    }

    #[test]
    fn test_alarm_false_wins_over_detection() {
        assert_eq!(
            classify(json!({ "alarm": false, "detection": { "id": 7 } })),
            PollOutcome::Clear
        );
    }

    #[test]
    fn test_server_clear_response() {
        let body = br#"{"success":true,"alarm":false,"alert_count":0,"message":"no recent detection","timestamp":"2025-01-01T00:00:00.000Z"}"#;
        assert_eq!(classify_body(body), PollOutcome::Clear);
    }

    #[test]
    fn test_detection_object_without_alarm() {
        assert_eq!(
            classify(json!({ "detection": { "x": 1 } })),
            PollOutcome::Alarm(AlarmSource::DetectionPresent)
        );
    }

    #[test]
    fn test_detection_scalar_without_alarm() {
        assert!(classify(json!({ "detection": 0 })).is_alarm());
        assert!(classify(json!({ "detection": null })).is_alarm());
    }

    #[test]
    fn test_non_boolean_alarm_falls_through() {
        assert_eq!(
            classify(json!({ "alarm": "yes" })),
            PollOutcome::Unrecognized {
                fields: vec!["alarm".to_string()]
            }
        );
        assert!(classify(json!({ "alarm": 1, "detection": [] })).is_alarm());
        assert_eq!(
            classify(json!({ "alarm": null, "detection": {} })),
            PollOutcome::Alarm(AlarmSource::DetectionPresent)
        );
    }

    #[test]
    fn test_success_with_scalar_detection_hits_rule_two_first() {
        assert_eq!(
            classify(json!({ "success": true, "detection": "none" })),
            PollOutcome::Alarm(AlarmSource::DetectionPresent)
        );
    }

    #[test]
    fn test_success_rule_verdict_in_isolation() {
        let rule = &RULES[2];
        let scalar = fields(json!({ "success": true, "detection": 42 }));
        let object = fields(json!({ "success": true, "detection": { "id": 1 } }));
        let array = fields(json!({ "success": true, "detection": [1, 2] }));

        assert!((rule.applies)(&scalar));
        assert!(!(rule.verdict)(&scalar));
        assert!((rule.verdict)(&object));
        assert!(!(rule.verdict)(&array));
        assert!(!(rule.applies)(&fields(json!({ "detection": {} }))));
    }

    #[test]
    fn test_unrecognized_lists_fields() {
        match classify(json!({ "status": "ok", "uptime": 12 })) {
            PollOutcome::Unrecognized { mut fields } => {
                fields.sort();
                assert_eq!(fields, vec!["status", "uptime"]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_non_object_json() {
        assert_eq!(
            classify_body(b"[true]"),
            PollOutcome::Unrecognized { fields: Vec::new() }
        );
    }

    #[test]
    fn test_malformed_json() {
        let outcome = classify_body(b"{\"alarm\": tru");
        assert!(matches!(outcome, PollOutcome::DecodeFailed { .. }));
        assert!(!outcome.is_alarm());
        assert!(!classify_body(b"").is_alarm());
        assert!(!classify_body(b"<html>502 Bad Gateway</html>").is_alarm());
    }

    fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::from),
        ]
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        arb_scalar().prop_recursive(2, 8, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::hash_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn arb_extra_fields() -> impl Strategy<Value = Fields> {
        prop::collection::hash_map("[a-z]{1,6}", arb_value(), 0..5)
            .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_boolean_alarm_decides(alarm in any::<bool>(), mut extra in arb_extra_fields()) {
            extra.insert("alarm".to_string(), Value::Bool(alarm));
            let outcome = classify_body(Value::Object(extra).to_string().as_bytes());
            prop_assert_eq!(outcome.is_alarm(), alarm);
        }

        #[test]
        fn prop_any_detection_without_alarm_is_alarm(detection in arb_value(), mut extra in arb_extra_fields()) {
            extra.remove("alarm");
            extra.insert("detection".to_string(), detection);
            let outcome = classify_body(Value::Object(extra).to_string().as_bytes());
            prop_assert!(outcome.is_alarm());
        }

        #[test]
        fn prop_success_rule_verdict(detection in arb_scalar(), object in arb_extra_fields()) {
            let rule = &RULES[2];
            let scalar = fields(json!({ "success": true, "detection": detection }));
            let structured = fields(json!({ "success": true, "detection": Value::Object(object) }));
            prop_assert!(!(rule.verdict)(&scalar));
            prop_assert!((rule.verdict)(&structured));
        }

        #[test]
        fn prop_arbitrary_bytes_never_panic(body in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = classify_body(&body);
        }
    }
}
