//! First-match lookup over the portal's drifting telemetry field names.
//!
//! Each logical field has an ordered list of candidate keys. The first key
//! whose value is present and not blank wins; a value that fails to cast is
//! kept raw so one odd field never sinks the whole read.

use serde_json::{Map, Value};

use crate::types::{Resolved, Zone};

pub type Payload = Map<String, Value>;

/// `null`, `""` and the literal string `"null"` all mean "not reported".
fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == "null",
        _ => false,
    }
}

pub fn resolve<T>(
    payload: &Payload,
    candidates: &[String],
    cast: impl Fn(&Value) -> Option<T>,
    default: Option<Resolved<T>>,
) -> Option<Resolved<T>> {
    candidates
        .iter()
        .filter(|k| !k.is_empty())
        .find_map(|k| payload.get(k).filter(|v| !is_blank(v)))
        .map(|v| match cast(v) {
            Some(t) => Resolved::Cast(t),
            None => Resolved::Raw(v.clone()),
        })
        .or(default)
}

/// Numbers and numeric strings; booleans count as 1/0.
pub fn to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Flags are compared as text, so `1` and `"1"` read the same.
pub fn to_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Candidate keys for every field a zone reads, newest schema first.
#[derive(Debug, Clone)]
pub struct FieldKeys {
    pub target: Vec<String>,
    pub current: Vec<String>,
    pub frost: Vec<String>,
    pub heating: Vec<String>,
    pub mode: Vec<String>,
}

impl FieldKeys {
    pub fn for_zone(zone: Zone) -> Self {
        let z = zone.suffix();
        let n = zone.number();
        Self {
            target: vec![
                format!("current_temp{z}_sp"),
                format!("setTemp{z}"),
                format!("setPoint{n}"),
                format!("CH{n}currentSetPoint"),
            ],
            current: vec![
                format!("current_temp{z}"),
                format!("roomTemp{n}"),
                format!("CH{n}currentRoomTemp"),
            ],
            frost: vec!["frost".to_string()],
            heating: vec![
                format!("CH{n}heatOnOffStatus"),
                format!("heatOnOffStatus{z}"),
            ],
            mode: vec![format!("CH{n}heatOnOff"), format!("mode{z}")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: Value) -> Payload {
        match v {
            Value::Object(m) => m,
            _ => panic!("test payload must be an object"),
        }
    }

    fn keys(ks: &[&str]) -> Vec<String> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn missing_field_returns_default() {
        let p = payload(json!({"other": "1"}));
        let got = resolve(&p, &keys(&["a", "b"]), to_f64, Some(Resolved::Cast(18.0)));
        assert_eq!(got, Some(Resolved::Cast(18.0)));
        let none: Option<Resolved<f64>> = resolve(&p, &keys(&["a"]), to_f64, None);
        assert_eq!(none, None);
    }

    #[test]
    fn first_present_key_wins() {
        let p = payload(json!({"b": "20.5", "c": "19.0"}));
        let got = resolve(&p, &keys(&["a", "b", "c"]), to_f64, None);
        assert_eq!(got, Some(Resolved::Cast(20.5)));
        let got = resolve(&p, &keys(&["c", "a", "b"]), to_f64, None);
        assert_eq!(got, Some(Resolved::Cast(19.0)));
    }

    #[test]
    fn blank_values_are_skipped() {
        let p = payload(json!({"a": null, "b": "", "c": "null", "d": 17}));
        let got = resolve(&p, &keys(&["a", "b", "c", "d"]), to_f64, None);
        assert_eq!(got, Some(Resolved::Cast(17.0)));

        let all_blank = payload(json!({"a": null, "b": "", "c": "null"}));
        let got = resolve(&all_blank, &keys(&["a", "b", "c"]), to_f64, Some(Resolved::Cast(1.0)));
        assert_eq!(got, Some(Resolved::Cast(1.0)));
    }

    #[test]
    fn failed_cast_keeps_raw_value() {
        let p = payload(json!({"a": "--.-"}));
        let got = resolve(&p, &keys(&["a"]), to_f64, Some(Resolved::Cast(20.0)));
        assert_eq!(got, Some(Resolved::Raw(json!("--.-"))));
    }

    #[test]
    fn empty_candidate_names_are_ignored() {
        let p = payload(json!({"": "5", "a": "6"}));
        let got = resolve(&p, &keys(&["", "a"]), to_f64, None);
        assert_eq!(got, Some(Resolved::Cast(6.0)));
    }

    #[test]
    fn text_cast_normalizes_numbers() {
        let p = payload(json!({"flag": 1}));
        let got = resolve(&p, &keys(&["flag"]), to_text, None);
        assert_eq!(got, Some(Resolved::Cast("1".to_string())));
    }

    #[test]
    fn numeric_cast_variants() {
        assert_eq!(to_f64(&json!("21.5")), Some(21.5));
        assert_eq!(to_f64(&json!(" 7 ")), Some(7.0));
        assert_eq!(to_f64(&json!(22)), Some(22.0));
        assert_eq!(to_f64(&json!(true)), Some(1.0));
        assert_eq!(to_f64(&json!("abc")), None);
        assert_eq!(to_f64(&json!([1])), None);
    }

    #[test]
    fn zone_keys_modern_first_legacy_last() {
        let k = FieldKeys::for_zone(Zone::Z2);
        assert_eq!(k.target.first().unwrap(), "current_tempZ2_sp");
        assert_eq!(k.target.last().unwrap(), "CH2currentSetPoint");
        assert_eq!(k.current.first().unwrap(), "current_tempZ2");
        assert_eq!(k.current.last().unwrap(), "CH2currentRoomTemp");
        assert_eq!(k.heating, keys(&["CH2heatOnOffStatus", "heatOnOffStatusZ2"]));
        assert_eq!(k.mode, keys(&["CH2heatOnOff", "modeZ2"]));
        assert_eq!(k.frost, keys(&["frost"]));
    }
}
