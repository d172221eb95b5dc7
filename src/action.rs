//! Action descriptors: the closed tagged union of table mutations, plus the
//! advisory schema validator that runs against raw JSON before anything is
//! parsed or executed. Descriptors arrive from clients or from the
//! natural-language translator; translator output is never evaluated, only
//! parsed against this union.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One table mutation. `operation` is the serde tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum Action {
    Sort {
        column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<String>,
    },
    Filter {
        column: String,
        condition: Condition,
    },
    Update {
        column: String,
        value: Value,
    },
}

impl Action {
    pub fn column(&self) -> &str {
        match self {
            Action::Sort { column, .. } | Action::Filter { column, .. } | Action::Update { column, .. } => column,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub operator: CmpOp,
    pub value: Value,
}

/// Comparison operators, serde-renamed to their symbols. Action conditions
/// accept only the first four; the filter preview accepts all six.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl CmpOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ">" => Some(CmpOp::Gt),
            "<" => Some(CmpOp::Lt),
            "==" => Some(CmpOp::Eq),
            "!=" => Some(CmpOp::Ne),
            ">=" => Some(CmpOp::Ge),
            "<=" => Some(CmpOp::Le),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
        }
    }

    /// True for operators that need an ordering on the column type.
    pub fn is_ordering(&self) -> bool {
        !matches!(self, CmpOp::Eq | CmpOp::Ne)
    }
}

/// Operators allowed inside an action's filter condition.
const ACTION_CONDITION_OPS: [&str; 4] = [">", "<", "==", "!="];

/// Advisory schema check over a raw descriptor. Pure: no side effects, and
/// callers still handle execution-time type errors. Rules run in order and
/// the first violation wins.
pub fn validate(descriptor: &Value, known_columns: &[String]) -> Result<(), String> {
    let obj = match descriptor.as_object() {
        Some(o) => o,
        None => return Err("Invalid or missing 'operation'. Got: None".to_string()),
    };

    // 1. operation present and known
    let operation = obj.get("operation").and_then(|v| v.as_str());
    let required: &[&str] = match operation {
        Some("sort") => &["column"],
        Some("filter") => &["column", "condition"],
        Some("update") => &["column", "value"],
        _ => {
            let got = operation
                .map(|s| s.to_string())
                .unwrap_or_else(|| "None".to_string());
            return Err(format!("Invalid or missing 'operation'. Got: {}", got));
        }
    };
    let operation = operation.unwrap_or_default();

    // 2. operation-specific required keys
    for key in required {
        if !obj.contains_key(*key) {
            return Err(format!("Missing key '{}' for operation '{}'", key, operation));
        }
    }

    // 3. a present column must exist in the sheet
    if let Some(column) = obj.get("column").and_then(|v| v.as_str()) {
        if !known_columns.iter().any(|c| c == column) {
            return Err(format!("Column '{}' not found in sheet.", column));
        }
    }

    // 4. filter condition structure
    if operation == "filter" {
        let cond = match obj.get("condition").and_then(|v| v.as_object()) {
            Some(c) => c,
            None => return Err("'condition' must be an object".to_string()),
        };
        if !cond.contains_key("operator") || !cond.contains_key("value") {
            return Err("Filter condition must have 'operator' and 'value'".to_string());
        }
        let op = cond.get("operator").and_then(|v| v.as_str()).unwrap_or_default();
        if !ACTION_CONDITION_OPS.contains(&op) {
            return Err(format!("Unsupported operator: {}", op));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols() -> Vec<String> {
        vec!["Region".to_string(), "Profit".to_string()]
    }

    #[test]
    fn missing_operation_is_rejected() {
        let err = validate(&json!({"column": "Region"}), &cols()).unwrap_err();
        assert_eq!(err, "Invalid or missing 'operation'. Got: None");
    }

    #[test]
    fn unknown_operation_is_named() {
        let err = validate(&json!({"operation": "explode"}), &cols()).unwrap_err();
        assert_eq!(err, "Invalid or missing 'operation'. Got: explode");
    }

    #[test]
    fn missing_required_key_is_named() {
        let err = validate(&json!({"operation": "update", "column": "Region"}), &cols()).unwrap_err();
        assert_eq!(err, "Missing key 'value' for operation 'update'");
    }

    #[test]
    fn unknown_column_is_named() {
        let err = validate(&json!({"operation": "sort", "column": "Nope"}), &cols()).unwrap_err();
        assert_eq!(err, "Column 'Nope' not found in sheet.");
    }

    #[test]
    fn filter_condition_must_be_an_object() {
        let err = validate(
            &json!({"operation": "filter", "column": "Profit", "condition": "Profit > 3"}),
            &cols(),
        )
        .unwrap_err();
        assert_eq!(err, "'condition' must be an object");
    }

    #[test]
    fn filter_condition_needs_operator_and_value() {
        let err = validate(
            &json!({"operation": "filter", "column": "Profit", "condition": {"operator": ">"}}),
            &cols(),
        )
        .unwrap_err();
        assert_eq!(err, "Filter condition must have 'operator' and 'value'");
    }

    #[test]
    fn action_conditions_reject_ordered_or_equal() {
        let err = validate(
            &json!({"operation": "filter", "column": "Profit", "condition": {"operator": ">=", "value": 1}}),
            &cols(),
        )
        .unwrap_err();
        assert_eq!(err, "Unsupported operator: >=");
    }

    #[test]
    fn valid_descriptors_pass_and_parse() {
        let sort = json!({"operation": "sort", "column": "Profit", "order": "desc"});
        let filter = json!({"operation": "filter", "column": "Region", "condition": {"operator": "==", "value": "West"}});
        let update = json!({"operation": "update", "column": "Region", "value": "Done"});
        for v in [&sort, &filter, &update] {
            validate(v, &cols()).unwrap();
            let _: Action = serde_json::from_value((*v).clone()).unwrap();
        }
    }

    #[test]
    fn cmp_op_symbols_roundtrip() {
        for sym in [">", "<", "==", "!=", ">=", "<="] {
            let op = CmpOp::parse(sym).unwrap();
            assert_eq!(op.as_str(), sym);
            let j = serde_json::to_value(op).unwrap();
            assert_eq!(j, serde_json::json!(sym));
        }
        assert!(CmpOp::parse("~=").is_none());
        assert!(CmpOp::Gt.is_ordering());
        assert!(!CmpOp::Eq.is_ordering());
    }
}
