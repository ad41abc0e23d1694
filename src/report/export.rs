use serde_json::Value;

/// Spreadsheet apps evaluate cells starting with these as formulas.
/// A lone sign is plain text (it is the placeholder for missing values).
fn is_formula(text: &str) -> bool {
    let text = text.trim();
    let mut chars = text.chars();
    matches!(chars.next(), Some('=' | '+' | '-' | '@')) && chars.next().is_some()
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) if is_formula(text) => format!("'{text}"),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Renders `rows` as CSV with a header line, taking cells in `columns` order.
/// Missing keys become empty cells.
pub fn to_csv(columns: &[&str], rows: &[Value]) -> String {
    let mut out = columns.iter().map(|c| escape(c)).collect::<Vec<_>>().join(",");

    for row in rows {
        let line = columns
            .iter()
            .map(|column| escape(&cell(row.get(column))))
            .collect::<Vec<_>>()
            .join(",");
        out.push('\n');
        out.push_str(&line);
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn header_then_rows_in_column_order() {
        let rows = vec![json!({"b": 2, "a": "x"}), json!({"a": "y"})];
        assert_eq!(to_csv(&["a", "b"], &rows), "a,b\nx,2\ny,\n");
    }

    #[test]
    fn quotes_separators_quotes_and_newlines() {
        let rows = vec![json!({"v": "Perera, Kamal"}), json!({"v": "say \"hi\""}), json!({"v": "two\nlines"})];
        assert_eq!(
            to_csv(&["v"], &rows),
            "v\n\"Perera, Kamal\"\n\"say \"\"hi\"\"\"\n\"two\nlines\"\n"
        );
    }

    #[test]
    fn formulas_are_neutralized_but_numbers_are_not() {
        let rows = vec![json!({"v": "=SUM(A1:A9)", "n": -12.5})];
        assert_eq!(to_csv(&["v", "n"], &rows), "v,n\n'=SUM(A1:A9),-12.5\n");
    }

    #[test]
    fn missing_placeholder_is_written_as_is() {
        use crate::report::shape::MISSING;

        let rows = vec![json!({"check_out": MISSING, "reason": MISSING, "note": "-1+2"})];
        assert_eq!(
            to_csv(&["check_out", "reason", "note"], &rows),
            "check_out,reason,note\n-,-,'-1+2\n"
        );
    }
}
