//! ASCII rendering of table contents.

use std::fmt::Write;

use super::Table;
use crate::value::{TabularType, Value, deserialize};

impl Table {
    /// Renders the table as a `+`-bordered ASCII grid.
    ///
    /// Numeric cells are right-aligned and floats print with two decimals.
    /// Cells that fail to deserialize render as `ERROR`. Rendering is a
    /// diagnostic aid, not part of the storage contract.
    pub fn render(&self) -> String {
        let columns = self.columns();
        if columns.is_empty() {
            return String::from("(empty table)\n");
        }

        let rows = self.rows.read();
        let grid: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(row)
                    .map(|(col, blob)| match deserialize(col.tabular_type(), blob) {
                        Ok(value) => cell_text(&value),
                        Err(_) => String::from("ERROR"),
                    })
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = columns.iter().map(|col| col.name().len()).collect();
        for row in &grid {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let mut out = String::new();
        push_rule(&mut out, &widths);

        out.push('|');
        for (i, col) in columns.iter().enumerate() {
            let _ = write!(out, " {:<width$} |", col.name(), width = widths[i]);
        }
        out.push('\n');
        push_rule(&mut out, &widths);

        for row in &grid {
            out.push('|');
            for (i, (col, cell)) in columns.iter().zip(row).enumerate() {
                let _ = match col.tabular_type() {
                    TabularType::Int32 | TabularType::Float64 => {
                        write!(out, " {:>width$} |", cell, width = widths[i])
                    }
                    TabularType::String => write!(out, " {:<width$} |", cell, width = widths[i]),
                };
            }
            out.push('\n');
        }
        push_rule(&mut out, &widths);
        out
    }
}

fn push_rule(out: &mut String, widths: &[usize]) {
    out.push('+');
    for width in widths {
        out.push_str(&"-".repeat(width + 2));
        out.push('+');
    }
    out.push('\n');
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Int32(v) => v.to_string(),
        Value::Float64(v) => format!("{v:.2}"),
        Value::String(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::indexer::IndexerKind;
    use crate::table::Column;

    #[test]
    fn test_render_layout() {
        let table = Table::new(vec![
            Column::new("name", TabularType::String, Value::from(""), IndexerKind::None).unwrap(),
            Column::new(
                "salary",
                TabularType::Float64,
                Value::Float64(0.0),
                IndexerKind::None,
            )
            .unwrap(),
        ])
        .unwrap();

        table
            .insert_row(&HashMap::from([
                ("name".to_string(), Value::from("John Doe")),
                ("salary".to_string(), Value::Float64(12.0)),
            ]))
            .unwrap();

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with('+') && lines[0].ends_with('+'));
        assert!(lines[1].contains("name"));
        assert!(lines[1].contains("salary"));
        assert!(lines[3].contains("John Doe"));
        assert!(lines[3].contains("12.00"));
        // Every line is equally wide.
        assert!(lines.iter().all(|line| line.len() == lines[0].len()));
    }

    #[test]
    fn test_render_empty_table_has_header_only() {
        let table = Table::new(vec![
            Column::new("id", TabularType::Int32, Value::Int32(0), IndexerKind::None).unwrap(),
        ])
        .unwrap();
        let rendered = table.render();
        assert_eq!(rendered.lines().count(), 4);
        assert!(rendered.contains("id"));
    }
}
