use std::env;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use fairquote_cli::commands::CommandResult;
use fairquote_cli::{execute, Cli};
use serde_json::Value;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const HISTORY: &[&[&str]] = &[
    &["Card #", "Discrepancy", "Corrective Action", "Total Hours", "Ref No", "Year"],
    &["C-1", "Hydraulic leak at L/H MLG", "Replaced seal", "40", "R-10", "2020"],
    &["C-2", "hydraulic leak at l/h mlg 02/03/2021", "replaced  seal", "40", "R-11", "2021"],
    &["C-3", "Hydraulic leak at L/H MLG", "Replaced seal", "45", "R-12", "2022"],
    &["C-4", "Hydraulic leak at L/H MLG", "Replaced seal and gasket", "52", "R-13", "2022"],
    &["C-5", "Cabin light inop", "Replaced lamp", "1", "R-14", "2019"],
    &["C-6", "Tire worn", "", "3", "R-15", "2019"],
];

#[test]
fn search_json_reports_exact_matches_and_fair_quote() -> Result<()> {
    with_env(&[("FAIRQUOTE_MATCHING_EMPHASIS", "html")], || {
        let dir = TempDir::new()?;
        let data = write_workbook(&dir, HISTORY)?;

        let result = run_cli(&[
            "search",
            "--data",
            path_arg(&data)?,
            "--discrepancy",
            "Hydraulic leak at L/H MLG",
            "--corrective",
            "Replaced seal",
            "--json",
        ])?;
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output)?;
        assert_eq!(payload["command"], "search");
        assert_eq!(payload["status"], "ok");

        let data = &payload["data"];
        assert_eq!(data["exact"].as_array().map(Vec::len), Some(3));
        assert_eq!(data["fair_quote"]["quote_hours"], "41");
        assert_eq!(data["fair_quote"]["statistic"], "mean");
        assert_eq!(data["fair_quote"]["sample_size"], 3);

        let approximate = data["approximate"].as_array().context("approximate array")?;
        assert_eq!(approximate.len(), 4);
        assert_eq!(approximate[0]["record"]["card_number"], "C-1");
        assert_eq!(approximate[3]["record"]["card_number"], "C-4");
        assert_eq!(approximate[3]["record"]["reference_number"], "R-13");
        assert_eq!(
            data["rendered"][3]["corrective_action"],
            "REPLACED SEAL <span style='color:red'>AND</span> <span style='color:red'>GASKET</span>"
        );
        Ok(())
    })
}

#[test]
fn search_text_follows_configured_statistic_and_emphasis() -> Result<()> {
    with_env(
        &[("FAIRQUOTE_QUOTE_STATISTIC", "mode"), ("FAIRQUOTE_MATCHING_EMPHASIS", "brackets")],
        || {
            let dir = TempDir::new()?;
            let data = write_workbook(&dir, HISTORY)?;

            let result = run_cli(&[
                "search",
                "--data",
                path_arg(&data)?,
                "--discrepancy",
                "hydraulic leak at l/h mlg",
                "--corrective",
                "replaced seal",
            ])?;
            assert_eq!(result.exit_code, 0, "{}", result.output);
            assert!(result.output.contains("Exact matches (3):"), "{}", result.output);
            assert!(result.output.contains("Fair Quote: 39 hours"), "{}", result.output);
            assert!(result.output.contains("REPLACED SEAL [AND] [GASKET]"), "{}", result.output);
            Ok(())
        },
    )
}

#[test]
fn search_without_matches_is_still_successful() -> Result<()> {
    with_env(&[], || {
        let dir = TempDir::new()?;
        let data = write_workbook(&dir, HISTORY)?;

        let result = run_cli(&[
            "search",
            "--data",
            path_arg(&data)?,
            "--discrepancy",
            "Engine oil pressure low",
            "--corrective",
            "Replaced sender",
        ])?;
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("No exact match found."));
        assert!(result.output.contains("No close matches found."));
        Ok(())
    })
}

#[test]
fn search_rejects_blank_fields_with_validation_code() -> Result<()> {
    with_env(&[], || {
        let dir = TempDir::new()?;
        let data = write_workbook(&dir, HISTORY)?;

        let result = run_cli(&[
            "search",
            "--data",
            path_arg(&data)?,
            "--discrepancy",
            "",
            "--corrective",
            "ABC",
            "--json",
        ])?;
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output)?;
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "validation");
        assert_eq!(payload["message"], "Please enter both fields.");
        Ok(())
    })
}

#[test]
fn search_reports_missing_columns_with_schema_code() -> Result<()> {
    with_env(&[], || {
        let dir = TempDir::new()?;
        let data = write_workbook(
            &dir,
            &[&["Discrepancy", "Corrective Action"], &["Leak", "Replaced seal"]],
        )?;

        let result = run_cli(&[
            "search",
            "--data",
            path_arg(&data)?,
            "--discrepancy",
            "Leak",
            "--corrective",
            "Replaced seal",
            "--json",
        ])?;
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output)?;
        assert_eq!(payload["error_class"], "schema");
        let detail = payload["detail"].as_str().context("detail string")?;
        assert!(detail.contains("Total Hours"), "{detail}");
        Ok(())
    })
}

#[test]
fn unreadable_inputs_use_the_read_exit_code() -> Result<()> {
    with_env(&[], || {
        let dir = TempDir::new()?;
        let missing = dir.path().join("absent.xlsx");
        let not_xlsx = dir.path().join("history.csv");
        fs::write(&not_xlsx, "Discrepancy,Corrective Action,Total Hours\n")?;

        let result = run_cli(&["inspect", "--data", path_arg(&missing)?, "--json"])?;
        assert_eq!(result.exit_code, 5);
        assert_eq!(parse_payload(&result.output)?["error_class"], "read");

        let result = run_cli(&["inspect", "--data", path_arg(&not_xlsx)?, "--json"])?;
        assert_eq!(result.exit_code, 5);
        assert_eq!(parse_payload(&result.output)?["error_class"], "parse");
        Ok(())
    })
}

#[test]
fn inspect_reports_rows_and_resolved_columns() -> Result<()> {
    with_env(&[], || {
        let dir = TempDir::new()?;
        let data = write_workbook(&dir, HISTORY)?;

        let result = run_cli(&["inspect", "--data", path_arg(&data)?, "--json"])?;
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output)?;
        let data = &payload["data"];
        assert_eq!(data["rows_loaded"], 5);
        assert_eq!(data["rows_dropped"], 1);
        assert_eq!(data["content_hash"].as_str().map(str::len), Some(64));

        let columns = data["columns"].as_array().context("columns array")?;
        let located: Vec<(&str, &str)> = columns
            .iter()
            .filter_map(|column| Some((column["name"].as_str()?, column["column"].as_str()?)))
            .collect();
        assert_eq!(
            located,
            vec![
                ("Discrepancy", "B"),
                ("Corrective Action", "C"),
                ("Total Hours", "D"),
                ("Card Number", "A"),
                ("Reference Number", "E"),
                ("Year", "F"),
            ]
        );
        Ok(())
    })
}

#[test]
fn invalid_environment_fails_with_config_code() -> Result<()> {
    with_env(&[("FAIRQUOTE_MATCHING_SCORING_MODE", "levenshtein")], || {
        let dir = TempDir::new()?;
        let data = write_workbook(&dir, HISTORY)?;

        let result = run_cli(&["inspect", "--data", path_arg(&data)?])?;
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output)?;
        assert_eq!(payload["command"], "inspect");
        assert_eq!(payload["error_class"], "config_validation");
        Ok(())
    })
}

#[test]
fn config_attributes_each_value_to_its_source() -> Result<()> {
    with_env(&[("FAIRQUOTE_QUOTE_STATISTIC", "mode")], || {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("fairquote.toml");
        fs::write(&config_path, "[matching]\nhighlight_mode = \"alignment\"\n")?;

        let result = run_cli(&["config", "--config-file", path_arg(&config_path)?])?;
        assert_eq!(result.exit_code, 0);

        let output = &result.output;
        assert!(
            output.contains("- quote.statistic = Mode (source: env (FAIRQUOTE_QUOTE_STATISTIC))"),
            "{output}"
        );
        assert!(
            output.contains("- matching.highlight_mode = Alignment (source: file ("),
            "{output}"
        );
        assert!(output.contains("- normalize.strip_dates = true (source: default)"), "{output}");
        assert!(output.contains("- matching.threshold = 90 (source: fixed)"), "{output}");
        Ok(())
    })
}

fn run_cli(args: &[&str]) -> Result<CommandResult> {
    let cli = Cli::try_parse_from(std::iter::once("fairquote").chain(args.iter().copied()))?;
    Ok(execute(cli))
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str().context("temp path should be valid utf-8")
}

fn parse_payload(output: &str) -> Result<Value> {
    serde_json::from_str(output).with_context(|| format!("output should be json: {output}"))
}

/// Writes `rows` through a shared-string table, numbers as numeric cells.
fn write_workbook(dir: &TempDir, rows: &[&[&str]]) -> Result<PathBuf> {
    let mut strings: Vec<String> = Vec::new();
    let mut sheet = String::from(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (offset, row) in rows.iter().enumerate() {
        let row_number = offset + 1;
        sheet.push_str(&format!(r#"<row r="{row_number}">"#));
        for (column, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let reference = format!("{}{row_number}", char::from(b'A' + column as u8));
            if value.parse::<f64>().is_ok() {
                sheet.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            } else {
                strings.push(value.replace('&', "&amp;").replace('<', "&lt;"));
                let index = strings.len() - 1;
                sheet.push_str(&format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#));
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let mut shared = String::from(
        r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );
    for value in &strings {
        shared.push_str(&format!("<si><t>{value}</t></si>"));
    }
    shared.push_str("</sst>");

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("xl/sharedStrings.xml", SimpleFileOptions::default())?;
    writer.write_all(shared.as_bytes())?;
    writer.start_file("xl/worksheets/sheet1.xml", SimpleFileOptions::default())?;
    writer.write_all(sheet.as_bytes())?;
    let bytes = writer.finish()?.into_inner();

    let path = dir.path().join("history.xlsx");
    fs::write(&path, bytes)?;
    Ok(path)
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce() -> Result<()>) -> Result<()> {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FAIRQUOTE_NORMALIZE_STRIP_DATES",
        "FAIRQUOTE_MATCHING_SCORING_MODE",
        "FAIRQUOTE_MATCHING_HIGHLIGHT_MODE",
        "FAIRQUOTE_MATCHING_EMPHASIS",
        "FAIRQUOTE_QUOTE_STATISTIC",
        "FAIRQUOTE_LOGGING_LEVEL",
        "FAIRQUOTE_LOGGING_FORMAT",
        "FAIRQUOTE_LOG_LEVEL",
        "FAIRQUOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let result = test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }

    result
}
