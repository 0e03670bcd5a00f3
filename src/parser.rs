use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::errors::ParseError;
use crate::nutrition::NutritionEstimate;

/// Remove a surrounding fenced-code block (```` ``` ```` or ```` ```json ````), if any.
pub fn strip_code_fences(raw: &str) -> &str {
    static FENCE_RE: OnceLock<Regex> = OnceLock::new();
    let fence_re = FENCE_RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z0-9_+\-]*[ \t]*\r?\n?(.*?)\s*```\s*$").expect("fence regex")
    });

    match fence_re.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw.trim(),
    }
}

/// Parse one raw model reply into an estimate.
///
/// Pure function of `raw`. Unknown fields are ignored; a missing, non-numeric
/// or negative required field rejects the whole reply.
pub fn parse_estimate(raw: &str) -> Result<NutritionEstimate, ParseError> {
    let payload = strip_code_fences(raw);
    let value: Value =
        serde_json::from_str(payload).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let root = value.as_object().ok_or(ParseError::NotAnObject)?;
    let macros = root.get("macronutrients").and_then(Value::as_object);

    let calories = required(root, &["calories_cal", "calories"], "calories_cal")?;
    let protein_g = macro_field(root, macros, "protein_g")?;
    let fat_g = macro_field(root, macros, "fat_g")?;
    let carbs_g = macro_field(root, macros, "carbs_g")?;
    let sugar_g = required(root, &["sugar_g"], "sugar_g")?;
    let fiber_g = required(root, &["fiber_g"], "fiber_g")?;
    let satiety_index = required(root, &["satiety_index"], "satiety_index")?;

    Ok(NutritionEstimate::new(
        calories,
        protein_g,
        fat_g,
        carbs_g,
        sugar_g,
        fiber_g,
        satiety_index,
    ))
}

// Nested under "macronutrients" wins over a top-level key of the same name.
fn macro_field(
    root: &Map<String, Value>,
    macros: Option<&Map<String, Value>>,
    name: &'static str,
) -> Result<f64, ParseError> {
    match macros.and_then(|m| m.get(name)) {
        Some(value) => number(value, name),
        None => required(root, &[name], name),
    }
}

fn required(
    obj: &Map<String, Value>,
    keys: &[&str],
    name: &'static str,
) -> Result<f64, ParseError> {
    let value = keys
        .iter()
        .find_map(|k| obj.get(*k))
        .ok_or(ParseError::MissingField(name))?;
    number(value, name)
}

fn number(value: &Value, name: &'static str) -> Result<f64, ParseError> {
    let n = value
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or(ParseError::NonNumeric(name))?;
    if n < 0.0 {
        return Err(ParseError::Negative { field: name, value: n });
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"{
  "calories_cal": 650,
  "macronutrients": { "fat_g": 32.5, "protein_g": 28, "carbs_g": 61 },
  "fiber_g": 4,
  "sugar_g": 9.5,
  "satiety_index": 1.2
}"#;

    #[test]
    fn parses_prompt_shape() {
        let est = parse_estimate(NESTED).unwrap();
        assert_eq!(est.calories(), 650.0);
        assert_eq!(est.fat_g(), 32.5);
        assert_eq!(est.protein_g(), 28.0);
        assert_eq!(est.carbs_g(), 61.0);
        assert_eq!(est.fiber_g(), 4.0);
        assert_eq!(est.sugar_g(), 9.5);
        assert_eq!(est.satiety_index(), 1.2);
    }

    #[test]
    fn parses_flat_shape_with_calories_alias() {
        let raw = r#"{"calories": 120, "protein_g": 3, "fat_g": 1, "carbs_g": 25,
                      "sugar_g": 19, "fiber_g": 3.1, "satiety_index": 7}"#;
        let est = parse_estimate(raw).unwrap();
        assert_eq!(est.calories(), 120.0);
        assert_eq!(est.satiety_index(), 7.0);
    }

    #[test]
    fn strips_json_fence() {
        let fenced = format!("```json\n{NESTED}\n```");
        assert_eq!(parse_estimate(&fenced).unwrap(), parse_estimate(NESTED).unwrap());
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        let fenced = format!("  \n```\n{NESTED}```  \n");
        assert_eq!(parse_estimate(&fenced).unwrap(), parse_estimate(NESTED).unwrap());
    }

    #[test]
    fn strip_leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn ignores_extra_fields() {
        let raw = NESTED.replace("\"fiber_g\"", "\"dish\": \"ramen\", \"confidence\": \"high\", \"fiber_g\"");
        assert!(parse_estimate(&raw).is_ok());
    }

    #[test]
    fn rejects_missing_field() {
        let raw = NESTED.replace("\"sugar_g\": 9.5,", "");
        assert_eq!(parse_estimate(&raw), Err(ParseError::MissingField("sugar_g")));
    }

    #[test]
    fn rejects_missing_macro() {
        let raw = NESTED.replace("\"protein_g\": 28, ", "");
        assert_eq!(parse_estimate(&raw), Err(ParseError::MissingField("protein_g")));
    }

    #[test]
    fn rejects_numeric_string() {
        let raw = NESTED.replace("\"fiber_g\": 4", "\"fiber_g\": \"4\"");
        assert_eq!(parse_estimate(&raw), Err(ParseError::NonNumeric("fiber_g")));
    }

    #[test]
    fn rejects_null() {
        let raw = NESTED.replace("\"satiety_index\": 1.2", "\"satiety_index\": null");
        assert_eq!(parse_estimate(&raw), Err(ParseError::NonNumeric("satiety_index")));
    }

    #[test]
    fn rejects_negative() {
        let raw = NESTED.replace("\"calories_cal\": 650", "\"calories_cal\": -5");
        assert!(matches!(
            parse_estimate(&raw),
            Err(ParseError::Negative { field: "calories_cal", .. })
        ));
    }

    #[test]
    fn rejects_prose_and_arrays() {
        assert!(matches!(
            parse_estimate("I think this is about 500 calories."),
            Err(ParseError::InvalidJson(_))
        ));
        assert_eq!(parse_estimate("[1, 2, 3]"), Err(ParseError::NotAnObject));
    }
}
