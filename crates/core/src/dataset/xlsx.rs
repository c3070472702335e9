//! Minimal xlsx reader: first worksheet in tab order, cell values only.
//!
//! Formulas, styles and number formats are ignored; a formula cell contributes its
//! cached value.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::FairQuoteError;

/// Upper bound on decompressed bytes read from one archive entry.
const MAX_XML_ENTRY_BYTES: u64 = 64 * 1024 * 1024;
/// Spreadsheet column limit (`XFD`).
const MAX_COLUMNS: usize = 16_384;
const SHEET_PREFIX: &str = "xl/worksheets/sheet";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Display text of the cell, `None` when blank.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            Self::Empty => return None,
            Self::Text(text) => text.trim().to_string(),
            Self::Number(value) => format_number(*value),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
        };
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SheetRow {
    /// 1-based worksheet row number.
    pub number: u32,
    pub cells: Vec<Cell>,
}

impl SheetRow {
    pub fn cell(&self, column: usize) -> &Cell {
        self.cells.get(column).unwrap_or(&Cell::Empty)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| cell.as_text().is_none())
    }
}

pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<SheetRow>, FairQuoteError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| FairQuoteError::parse(format!("not an xlsx archive: {error}")))?;

    let sheet_name = match first_listed_worksheet(&mut archive)? {
        Some(name) => name,
        None => lowest_numbered_worksheet(&archive)
            .ok_or_else(|| FairQuoteError::parse("workbook contains no worksheets"))?,
    };
    let shared_strings = match read_entry(&mut archive, SHARED_STRINGS)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let sheet_xml = read_entry(&mut archive, &sheet_name)?
        .ok_or_else(|| FairQuoteError::parse(format!("missing worksheet entry `{sheet_name}`")))?;

    parse_sheet(&sheet_xml, &shared_strings)
}

/// Resolves the first `<sheet>` of `xl/workbook.xml` through the workbook relationships.
/// `None` when either part is absent.
fn first_listed_worksheet(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
) -> Result<Option<String>, FairQuoteError> {
    let Some(workbook) = read_entry(archive, WORKBOOK)? else {
        return Ok(None);
    };
    let Some(rels) = read_entry(archive, WORKBOOK_RELS)? else {
        return Ok(None);
    };
    let Some(relationship_id) = first_element_attribute(&workbook, "workbook", b"sheet", b"id")?
    else {
        return Ok(None);
    };

    let mut reader = Reader::from_reader(rels.as_slice());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if attribute(&e, "relationships", b"Id")?.as_deref()
                    == Some(relationship_id.as_str())
                {
                    let target = attribute(&e, "relationships", b"Target")?.ok_or_else(|| {
                        FairQuoteError::parse(format!(
                            "relationship `{relationship_id}` has no target"
                        ))
                    })?;
                    return Ok(Some(resolve_target(&target)));
                }
            }
            Ok(Event::Eof) => break,
            Err(error) => return Err(xml_error("relationships", error)),
            _ => {}
        }
        buf.clear();
    }

    Err(FairQuoteError::parse(format!(
        "worksheet relationship `{relationship_id}` is missing"
    )))
}

/// Relationship targets are relative to `xl/` unless rooted.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(rooted) => rooted.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn first_element_attribute(
    xml: &[u8],
    part: &str,
    element: &[u8],
    key: &[u8],
) -> Result<Option<String>, FairQuoteError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == element => {
                return attribute(&e, part, key);
            }
            Ok(Event::Eof) => return Ok(None),
            Err(error) => return Err(xml_error(part, error)),
            _ => {}
        }
        buf.clear();
    }
}

fn lowest_numbered_worksheet(archive: &zip::ZipArchive<Cursor<&[u8]>>) -> Option<String> {
    archive
        .file_names()
        .filter(|name| name.starts_with(SHEET_PREFIX) && name.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches(SHEET_PREFIX)
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(str::to_string)
}

fn read_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<Vec<u8>>, FairQuoteError> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(error) => return Err(FairQuoteError::parse(format!("cannot open `{name}`: {error}"))),
    };

    let mut buf = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut buf)
        .map_err(|error| FairQuoteError::parse(format!("cannot read `{name}`: {error}")))?;
    Ok(Some(buf))
}

fn xml_error(part: &str, error: impl std::fmt::Display) -> FairQuoteError {
    FairQuoteError::parse(format!("malformed {part}: {error}"))
}

/// Rich-text runs inside one `<si>` are concatenated.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, FairQuoteError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = current.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|error| xml_error("shared strings", error))?;
                if let Some(current) = current.as_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => strings.extend(current.take()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(error) => return Err(xml_error("shared strings", error)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellKind {
    SharedString,
    InlineString,
    FormulaString,
    Bool,
    Error,
    Number,
}

struct PendingCell {
    row: u32,
    column: usize,
    kind: CellKind,
    raw: String,
}

fn parse_sheet(xml: &[u8], shared_strings: &[String]) -> Result<Vec<SheetRow>, FairQuoteError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rows: BTreeMap<u32, Vec<Cell>> = BTreeMap::new();

    let mut current_row = 0u32;
    let mut next_column = 0usize;
    let mut pending: Option<PendingCell> = None;
    let mut capturing = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = row_number(&e)?.unwrap_or(current_row + 1);
                    next_column = 0;
                }
                b"c" => {
                    let (row, column, kind) = cell_header(&e, current_row, next_column)?;
                    next_column = column + 1;
                    pending = Some(PendingCell { row, column, kind, raw: String::new() });
                }
                b"v" => capturing = pending.is_some(),
                b"t" => {
                    capturing = pending
                        .as_ref()
                        .is_some_and(|cell| cell.kind == CellKind::InlineString);
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = row_number(&e)?.unwrap_or(current_row + 1);
                    next_column = 0;
                }
                b"c" => {
                    let (_, column, _) = cell_header(&e, current_row, next_column)?;
                    next_column = column + 1;
                }
                _ => {}
            },
            Ok(Event::Text(te)) if capturing => {
                let text = te.unescape().map_err(|error| xml_error("worksheet", error))?;
                if let Some(cell) = pending.as_mut() {
                    cell.raw.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => capturing = false,
                b"c" => {
                    if let Some(cell) = pending.take() {
                        let value = resolve_cell(&cell, shared_strings)?;
                        let cells = rows.entry(cell.row).or_default();
                        if cells.len() <= cell.column {
                            cells.resize(cell.column + 1, Cell::Empty);
                        }
                        cells[cell.column] = value;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(error) => return Err(xml_error("worksheet", error)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rows.into_iter().map(|(number, cells)| SheetRow { number, cells }).collect())
}

fn attribute(
    e: &BytesStart<'_>,
    part: &str,
    key: &[u8],
) -> Result<Option<String>, FairQuoteError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|error| xml_error(part, error))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr.unescape_value().map_err(|error| xml_error(part, error))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn row_number(e: &BytesStart<'_>) -> Result<Option<u32>, FairQuoteError> {
    Ok(attribute(e, "worksheet", b"r")?.and_then(|value| value.trim().parse::<u32>().ok()))
}

fn cell_header(
    e: &BytesStart<'_>,
    current_row: u32,
    next_column: usize,
) -> Result<(u32, usize, CellKind), FairQuoteError> {
    let (row, column) = match attribute(e, "worksheet", b"r")? {
        Some(reference) => parse_reference(&reference).ok_or_else(|| {
            FairQuoteError::parse(format!("invalid cell reference `{reference}`"))
        })?,
        None if next_column < MAX_COLUMNS => (current_row, next_column),
        None => {
            return Err(FairQuoteError::parse(format!(
                "row {current_row} has more than {MAX_COLUMNS} columns"
            )))
        }
    };

    let kind = match attribute(e, "worksheet", b"t")?.as_deref() {
        Some("s") => CellKind::SharedString,
        Some("inlineStr") => CellKind::InlineString,
        Some("str") => CellKind::FormulaString,
        Some("b") => CellKind::Bool,
        Some("e") => CellKind::Error,
        _ => CellKind::Number,
    };

    Ok((row, column, kind))
}

/// `"C12"` → row 12, zero-based column 2. Columns past `XFD` are rejected.
fn parse_reference(reference: &str) -> Option<(u32, usize)> {
    let split = reference.find(|ch: char| ch.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut column = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let offset = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        column = column * 26 + offset;
        if column > MAX_COLUMNS {
            return None;
        }
    }

    let row = digits.parse::<u32>().ok()?;
    Some((row, column - 1))
}

fn resolve_cell(cell: &PendingCell, shared_strings: &[String]) -> Result<Cell, FairQuoteError> {
    let raw = cell.raw.as_str();
    let value = match cell.kind {
        CellKind::SharedString => {
            let index = raw.trim().parse::<usize>().map_err(|_| {
                FairQuoteError::parse(format!("invalid shared string index `{raw}`"))
            })?;
            let text = shared_strings.get(index).ok_or_else(|| {
                FairQuoteError::parse(format!("shared string index {index} out of range"))
            })?;
            Cell::Text(text.clone())
        }
        CellKind::InlineString | CellKind::FormulaString => Cell::Text(raw.to_string()),
        CellKind::Bool => Cell::Bool(raw.trim() == "1"),
        CellKind::Error => Cell::Empty,
        CellKind::Number => match raw.trim() {
            "" => Cell::Empty,
            trimmed => match trimmed.parse::<f64>() {
                Ok(value) if value.is_finite() => Cell::Number(value),
                _ => Cell::Text(raw.to_string()),
            },
        },
    };
    Ok(value)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
