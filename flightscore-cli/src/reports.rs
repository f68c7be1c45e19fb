use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use flightscore_core::{FlightSchedule, FlightTotal, ScoreTable};

/// One line of the version listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRow {
    pub version: String,
    pub valid: bool,
    /// Manoeuvres carrying a snapshot for this version.
    pub coverage: usize,
    pub manoeuvres: usize,
}

impl VersionRow {
    pub const fn is_complete(&self) -> bool {
        self.coverage == self.manoeuvres
    }
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.3}")
    }
}

// Non-finite values have no JSON form, so cells go out as nullable numbers.
#[derive(Serialize)]
struct JsonTable<'a> {
    schedule: String,
    columns: &'a [String],
    rows: Vec<JsonRow<'a>>,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    manoeuvre: &'a str,
    values: Vec<Option<f64>>,
}

pub fn write_console_table(
    out: &mut dyn Write,
    title: &str,
    schedule: &FlightSchedule,
    table: &ScoreTable,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", format!("📊 {title}").bright_cyan().bold())?;
    writeln!(out, "{}", "=".repeat(title.chars().count() + 3).cyan())?;
    writeln!(out, "Schedule: {schedule}")?;
    writeln!(out)?;

    if table.is_empty() {
        writeln!(out, "No scores available.")?;
        return Ok(());
    }

    let name_width = table
        .rows()
        .iter()
        .map(|r| r.chars().count())
        .max()
        .unwrap_or(0)
        .max("Manoeuvre".len());
    let col_width = table
        .columns()
        .iter()
        .map(|c| c.chars().count())
        .max()
        .unwrap_or(0)
        .max(9);

    write!(out, "{:name_width$}", "Manoeuvre".bold())?;
    for column in table.columns() {
        write!(out, "  {:>col_width$}", column.bold())?;
    }
    writeln!(out)?;

    for (row, values) in table.rows().iter().zip(table.values()) {
        write!(out, "{row:name_width$}")?;
        for value in values {
            let cell = format_cell(*value);
            if value.is_nan() {
                write!(out, "  {:>col_width$}", cell.yellow())?;
            } else {
                write!(out, "  {cell:>col_width$}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_json_table(
    out: &mut dyn Write,
    schedule: &FlightSchedule,
    table: &ScoreTable,
) -> Result<()> {
    let payload = JsonTable {
        schedule: schedule.to_string(),
        columns: table.columns(),
        rows: table
            .rows()
            .iter()
            .zip(table.values())
            .map(|(row, values)| JsonRow {
                manoeuvre: row,
                values: values
                    .iter()
                    .map(|v| v.is_finite().then_some(*v))
                    .collect(),
            })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &payload)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_markdown_table(
    out: &mut dyn Write,
    title: &str,
    schedule: &FlightSchedule,
    table: &ScoreTable,
) -> Result<()> {
    writeln!(out, "# {title}\n")?;
    writeln!(out, "- **Schedule**: {schedule}\n")?;
    if table.is_empty() {
        writeln!(out, "_No scores available._")?;
        return Ok(());
    }

    write!(out, "| Manoeuvre |")?;
    for column in table.columns() {
        write!(out, " {column} |")?;
    }
    writeln!(out)?;
    write!(out, "|---|")?;
    for _ in table.columns() {
        write!(out, "---:|")?;
    }
    writeln!(out)?;
    for (row, values) in table.rows().iter().zip(table.values()) {
        write!(out, "| {row} |")?;
        for value in values {
            write!(out, " {} |", format_cell(*value))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn write_csv_table(out: &mut dyn Write, table: &ScoreTable) -> Result<()> {
    let header: Vec<String> = std::iter::once("manoeuvre".to_string())
        .chain(table.columns().iter().map(|c| csv_field(c)))
        .collect();
    writeln!(out, "{}", header.join(","))?;
    for (row, values) in table.rows().iter().zip(table.values()) {
        let cells: Vec<String> = std::iter::once(csv_field(row))
            .chain(values.iter().map(|v| format_cell(*v)))
            .collect();
        writeln!(out, "{}", cells.join(","))?;
    }
    Ok(())
}

pub fn write_console_versions(out: &mut dyn Write, rows: &[VersionRow]) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "🏷️  Scoring Versions".bright_cyan().bold())?;
    writeln!(out, "{}", "===================".cyan())?;
    if rows.is_empty() {
        writeln!(out, "No scoring history recorded.")?;
        return Ok(());
    }
    for row in rows {
        let status = if !row.valid {
            "⚠️  MALFORMED".yellow()
        } else if row.is_complete() {
            "✅ COMPLETE".green()
        } else {
            "➖ PARTIAL".normal()
        };
        writeln!(
            out,
            "{status} {} ({}/{} manoeuvres)",
            row.version.bold(),
            row.coverage,
            row.manoeuvres
        )?;
    }
    Ok(())
}

pub fn write_markdown_versions(out: &mut dyn Write, rows: &[VersionRow]) -> Result<()> {
    writeln!(out, "# Scoring Versions\n")?;
    if rows.is_empty() {
        writeln!(out, "_No scoring history recorded._")?;
        return Ok(());
    }
    writeln!(out, "| Version | Valid | Coverage |")?;
    writeln!(out, "|---|---|---:|")?;
    for row in rows {
        let valid = if row.valid { "✅" } else { "❌" };
        writeln!(
            out,
            "| {} | {valid} | {}/{} |",
            row.version, row.coverage, row.manoeuvres
        )?;
    }
    Ok(())
}

pub fn write_csv_versions(out: &mut dyn Write, rows: &[VersionRow]) -> Result<()> {
    writeln!(out, "version,valid,coverage,manoeuvres")?;
    for row in rows {
        writeln!(
            out,
            "{},{},{},{}",
            csv_field(&row.version),
            row.valid,
            row.coverage,
            row.manoeuvres
        )?;
    }
    Ok(())
}

pub fn write_console_totals(
    out: &mut dyn Write,
    schedule: &FlightSchedule,
    totals: &[FlightTotal],
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "🏁 Flight Totals".bright_cyan().bold())?;
    writeln!(out, "{}", "================".cyan())?;
    writeln!(out, "Schedule: {schedule}")?;
    if totals.is_empty() {
        writeln!(out, "No valid scoring versions.")?;
        return Ok(());
    }
    let best = totals
        .iter()
        .max_by(|a, b| a.total.total_cmp(&b.total))
        .map(|t| t.version.as_str());
    for total in totals {
        let line = format!("{:>12}  {:>9.3}", total.version, total.total);
        if Some(total.version.as_str()) == best {
            writeln!(out, "{}", line.green())?;
        } else {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

pub fn write_markdown_totals(
    out: &mut dyn Write,
    schedule: &FlightSchedule,
    totals: &[FlightTotal],
) -> Result<()> {
    writeln!(out, "# Flight Totals\n")?;
    writeln!(out, "- **Schedule**: {schedule}\n")?;
    if totals.is_empty() {
        writeln!(out, "_No valid scoring versions._")?;
        return Ok(());
    }
    writeln!(out, "| Version | Total |")?;
    writeln!(out, "|---|---:|")?;
    for total in totals {
        writeln!(out, "| {} | {:.3} |", total.version, total.total)?;
    }
    Ok(())
}

pub fn write_csv_totals(out: &mut dyn Write, totals: &[FlightTotal]) -> Result<()> {
    writeln!(out, "version,total")?;
    for total in totals {
        writeln!(out, "{},{}", csv_field(&total.version), format_cell(total.total))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightscore_core::{
        FlightSession, GroupSelection, ManoeuvreRecord, MissingPolicy, ScheduleRef, Score,
        ScoreProperties, ScoreSnapshot,
    };

    fn table(missing: MissingPolicy) -> ScoreTable {
        let man = ManoeuvreRecord::new("Top Hat", "th", 3.0, ScheduleRef::new("f3a", "p25"))
            .with_snapshot(
                "1.0",
                ScoreSnapshot::single(
                    ScoreProperties::default(),
                    Score {
                        total: 7.25,
                        ..Score::default()
                    },
                ),
            )
            .unwrap();
        let other = ManoeuvreRecord::new("Spin, 2 turns", "sp", 2.0, ScheduleRef::new("f3a", "p25"));
        FlightSession::new(true, vec![man, other])
            .get_scores("1.0", None, GroupSelection::default(), missing)
            .unwrap()
    }

    fn render(f: impl FnOnce(&mut dyn Write) -> Result<()>) -> String {
        let mut buf: Vec<u8> = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn csv_quotes_names_and_marks_nan() {
        let text = render(|out| write_csv_table(out, &table(MissingPolicy::Nan)));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "manoeuvre,total");
        assert_eq!(lines[1], "Top Hat,7.250");
        assert_eq!(lines[2], "\"Spin, 2 turns\",NaN");
    }

    #[test]
    fn json_table_uses_null_for_nan() {
        let text = render(|out| write_json_table(out, &FlightSchedule::Mixed, &table(MissingPolicy::Nan)));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["schedule"], "mixed");
        assert_eq!(value["rows"][0]["values"][0], 7.25);
        assert!(value["rows"][1]["values"][0].is_null());
    }

    #[test]
    fn markdown_versions_show_coverage() {
        let rows = vec![
            VersionRow {
                version: "1.0".into(),
                valid: true,
                coverage: 2,
                manoeuvres: 2,
            },
            VersionRow {
                version: "nightly".into(),
                valid: false,
                coverage: 1,
                manoeuvres: 2,
            },
        ];
        let text = render(|out| write_markdown_versions(out, &rows));
        assert!(text.contains("| 1.0 | ✅ | 2/2 |"));
        assert!(text.contains("| nightly | ❌ | 1/2 |"));
        assert!(rows[0].is_complete());
        assert!(!rows[1].is_complete());
    }

    #[test]
    fn console_totals_handle_empty_input() {
        let text = render(|out| write_console_totals(out, &FlightSchedule::Mixed, &[]));
        assert!(text.contains("No valid scoring versions."));
    }
}
