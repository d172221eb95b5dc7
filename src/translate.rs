//! Natural-language-to-action translation. The trait is a black box that
//! produces a raw action descriptor (or an error marker); its output is never
//! evaluated, only parsed and validated by the action layer downstream.
//!
//! `RuleTranslator` is the deterministic default: a handful of regex rules
//! covering the common phrasings for sort, filter, and update.

use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Could not derive an action from the prompt: {0}")]
    Unrecognized(String),
}

pub trait ActionTranslator: Send + Sync {
    fn translate(&self, prompt: &str, known_columns: &[String]) -> Result<Value, TranslateError>;
}

pub struct RuleTranslator {
    sort_re: Regex,
    update_re: Regex,
    mark_re: Regex,
    filter_re: Regex,
}

impl Default for RuleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleTranslator {
    pub fn new() -> Self {
        // The unwraps are on literal patterns, checked by the tests below.
        Self {
            sort_re: Regex::new(r"(?i)^\s*sort(?:\s+by)?\s+(.+?)(?:\s+(asc|ascending|desc|descending))?\s*$").unwrap(),
            update_re: Regex::new(r"(?i)^\s*(?:set|update|change)\s+(.+?)\s+to\s+(.+?)\s*$").unwrap(),
            mark_re: Regex::new(r"(?i)^\s*mark\s+(?:all\s+)?(.+?)\s+as\s+(.+?)\s*$").unwrap(),
            filter_re: Regex::new(
                r"(?i)^\s*(?:show|filter|keep)?\s*(?:rows?)?\s*(?:where\s+)?(.+?)\s+(over|above|greater than|more than|under|below|less than|is not|not|equals|is|==|!=|=|>|<)\s+(.+?)\s*$",
            )
            .unwrap(),
        }
    }

    fn resolve_column(token: &str, known_columns: &[String]) -> Option<String> {
        let token = token.trim().trim_matches('"').trim_matches('\'');
        known_columns
            .iter()
            .find(|c| c.eq_ignore_ascii_case(token))
            .cloned()
    }

    /// Bare numbers become JSON numbers; anything else is a string with
    /// surrounding quotes stripped.
    fn parse_value(token: &str) -> Value {
        let token = token.trim();
        if let Ok(i) = token.parse::<i64>() {
            return json!(i);
        }
        if let Ok(f) = token.parse::<f64>() {
            return json!(f);
        }
        json!(token.trim_matches('"').trim_matches('\''))
    }

    fn op_symbol(word: &str) -> &'static str {
        match word.to_ascii_lowercase().as_str() {
            "over" | "above" | "greater than" | "more than" | ">" => ">",
            "under" | "below" | "less than" | "<" => "<",
            "not" | "is not" | "!=" => "!=",
            _ => "==",
        }
    }
}

impl ActionTranslator for RuleTranslator {
    fn translate(&self, prompt: &str, known_columns: &[String]) -> Result<Value, TranslateError> {
        if let Some(caps) = self.sort_re.captures(prompt) {
            if let Some(column) = Self::resolve_column(&caps[1], known_columns) {
                let order = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
                    Some(o) if o.starts_with("desc") => "desc",
                    _ => "asc",
                };
                return Ok(json!({"operation": "sort", "column": column, "order": order}));
            }
        }

        for re in [&self.update_re, &self.mark_re] {
            if let Some(caps) = re.captures(prompt) {
                if let Some(column) = Self::resolve_column(&caps[1], known_columns) {
                    return Ok(json!({
                        "operation": "update",
                        "column": column,
                        "value": Self::parse_value(&caps[2]),
                    }));
                }
            }
        }

        if let Some(caps) = self.filter_re.captures(prompt) {
            if let Some(column) = Self::resolve_column(&caps[1], known_columns) {
                return Ok(json!({
                    "operation": "filter",
                    "column": column,
                    "condition": {
                        "operator": Self::op_symbol(&caps[2]),
                        "value": Self::parse_value(&caps[3]),
                    },
                }));
            }
        }

        Err(TranslateError::Unrecognized(prompt.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols() -> Vec<String> {
        vec!["Region".to_string(), "Profit".to_string(), "Status".to_string()]
    }

    fn translate(prompt: &str) -> Value {
        RuleTranslator::new().translate(prompt, &cols()).unwrap()
    }

    #[test]
    fn sort_phrasings() {
        assert_eq!(
            translate("sort by Profit descending"),
            json!({"operation": "sort", "column": "Profit", "order": "desc"})
        );
        assert_eq!(
            translate("Sort region"),
            json!({"operation": "sort", "column": "Region", "order": "asc"})
        );
    }

    #[test]
    fn filter_phrasings() {
        assert_eq!(
            translate("show rows where Profit over 300"),
            json!({"operation": "filter", "column": "Profit", "condition": {"operator": ">", "value": 300}})
        );
        assert_eq!(
            translate("Region is West"),
            json!({"operation": "filter", "column": "Region", "condition": {"operator": "==", "value": "West"}})
        );
        assert_eq!(
            translate("profit less than 2.5"),
            json!({"operation": "filter", "column": "Profit", "condition": {"operator": "<", "value": 2.5}})
        );
        assert_eq!(
            translate("Status not Done"),
            json!({"operation": "filter", "column": "Status", "condition": {"operator": "!=", "value": "Done"}})
        );
    }

    #[test]
    fn update_phrasings() {
        assert_eq!(
            translate("set Status to Complete"),
            json!({"operation": "update", "column": "Status", "value": "Complete"})
        );
        assert_eq!(
            translate("mark all Status as 'on hold'"),
            json!({"operation": "update", "column": "Status", "value": "on hold"})
        );
        assert_eq!(
            translate("change Profit to 0"),
            json!({"operation": "update", "column": "Profit", "value": 0})
        );
    }

    #[test]
    fn output_passes_the_action_validator() {
        for prompt in ["sort by Profit desc", "Profit over 300", "set Status to Done"] {
            let v = translate(prompt);
            crate::action::validate(&v, &cols()).unwrap();
            let _: crate::action::Action = serde_json::from_value(v).unwrap();
        }
    }

    #[test]
    fn unmatched_prompt_is_an_error() {
        let err = RuleTranslator::new().translate("make it pretty", &cols()).unwrap_err();
        assert!(err.to_string().contains("make it pretty"));
    }

    #[test]
    fn unknown_column_token_is_an_error() {
        assert!(RuleTranslator::new().translate("sort by Revenue", &cols()).is_err());
    }
}
