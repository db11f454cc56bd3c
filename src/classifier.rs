//! Input Classifier (C5): inspects an optional delimited-text file and
//! decides crawl mode plus semantic column roles.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use once_cell::sync::Lazy;

static URL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(https?:)?//|^/[^/]").unwrap());

const DELIMITERS: [char; 3] = [',', '\t', ';'];
const SAMPLE_LINES: usize = 50;
const AVG_LEN_THRESHOLD: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Url,
    Title,
    Description,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    NoInput,
    ExplicitUrls,
    Discovery,
    SingleText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputShape {
    pub exists: bool,
    pub column_count: usize,
    pub first_column_url_share: f64,
    pub first_row_is_url: bool,
    pub inferred_roles: Vec<ColumnRole>,
}

impl InputShape {
    pub fn absent() -> Self {
        InputShape {
            exists: false,
            column_count: 0,
            first_column_url_share: 0.0,
            first_row_is_url: false,
            inferred_roles: Vec::new(),
        }
    }
}

/// A row padded to the classified file's max column width, with both
/// index- and (eventually) name-based access.
#[derive(Debug, Clone)]
pub struct Row(pub Vec<String>);

impl Row {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }
}

pub struct ClassifiedInput {
    pub shape: InputShape,
    pub mode: RunMode,
    pub rows: Vec<Row>,
}

/// An expected row from the input (§3 Data Model): at least one of
/// `expected_title`/`expected_description` present, or `expected_url`
/// present.
#[derive(Debug, Clone, Default)]
pub struct ExpectedRow {
    pub expected_url: Option<String>,
    pub expected_title: Option<String>,
    pub expected_description: Option<String>,
}

/// Project classified rows onto `ExpectedRow`s using the inferred column
/// roles. Rows that carry none of the three fields are dropped.
pub fn expected_rows(input: &ClassifiedInput) -> Vec<ExpectedRow> {
    if input.shape.inferred_roles.is_empty() {
        return Vec::new();
    }
    input
        .rows
        .iter()
        .map(|row| {
            let mut expected = ExpectedRow::default();
            for (i, role) in input.shape.inferred_roles.iter().enumerate() {
                let value = row.get(i).map(str::to_string).filter(|s| !s.is_empty());
                match role {
                    ColumnRole::Url => expected.expected_url = value,
                    ColumnRole::Title => expected.expected_title = value,
                    ColumnRole::Description => expected.expected_description = value,
                }
            }
            expected
        })
        .filter(|r| r.expected_url.is_some() || r.expected_title.is_some() || r.expected_description.is_some())
        .collect()
}

/// Classify an optional input file per §4.5. Absence or an empty file
/// yields `RunMode::NoInput` with an absent shape.
pub fn classify(path: Option<&Path>) -> anyhow::Result<ClassifiedInput> {
    let Some(path) = path else {
        return Ok(ClassifiedInput {
            shape: InputShape::absent(),
            mode: RunMode::NoInput,
            rows: Vec::new(),
        });
    };

    let raw = std::fs::read_to_string(path)?;
    let text = raw.strip_prefix('\u{FEFF}').unwrap_or(&raw);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

    if lines.is_empty() {
        return Ok(ClassifiedInput {
            shape: InputShape::absent(),
            mode: RunMode::NoInput,
            rows: Vec::new(),
        });
    }

    let delimiter = detect_delimiter(&lines);
    let mut split_rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| split_line(line, delimiter))
        .collect();

    let max_width = split_rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
    for row in &mut split_rows {
        while row.len() < max_width {
            row.push(String::new());
        }
    }

    let first_column_url_share = {
        let matches = split_rows
            .iter()
            .filter(|row| row.first().map(|c| URL_SHAPE.is_match(c)).unwrap_or(false))
            .count();
        matches as f64 / split_rows.len() as f64
    };

    let first_row_is_url = split_rows
        .first()
        .and_then(|r| r.first())
        .map(|c| URL_SHAPE.is_match(c))
        .unwrap_or(false);

    let inferred_roles = infer_roles(max_width, first_column_url_share, &split_rows);

    let shape = InputShape {
        exists: true,
        column_count: max_width,
        first_column_url_share,
        first_row_is_url,
        inferred_roles: inferred_roles.clone(),
    };

    let mode = derive_mode(&shape);

    Ok(ClassifiedInput {
        shape,
        mode,
        rows: split_rows.into_iter().map(Row).collect(),
    })
}

fn detect_delimiter(lines: &[&str]) -> char {
    let sample: Vec<&&str> = lines.iter().take(SAMPLE_LINES).collect();
    let mut best = DELIMITERS[0];
    let mut best_variance = -1.0;
    for &delim in &DELIMITERS {
        let counts: Vec<f64> = sample
            .iter()
            .map(|line| split_line(line, delim).len() as f64)
            .collect();
        let variance = variance_of(&counts);
        if variance > best_variance {
            best_variance = variance;
            best = delim;
        }
    }
    best
}

fn variance_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn split_line(line: &str, delim: char) -> Vec<String> {
    line.split(delim).map(|s| s.trim().to_string()).collect()
}

fn avg_len(rows: &[Vec<String>], col: usize) -> f64 {
    let lens: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.get(col))
        .map(|c| c.len() as f64)
        .collect();
    if lens.is_empty() {
        0.0
    } else {
        lens.iter().sum::<f64>() / lens.len() as f64
    }
}

fn infer_roles(column_count: usize, first_col_share: f64, rows: &[Vec<String>]) -> Vec<ColumnRole> {
    match column_count {
        n if n >= 3 => vec![ColumnRole::Url, ColumnRole::Title, ColumnRole::Description],
        2 => {
            let second_col_share = {
                let matches = rows
                    .iter()
                    .filter(|r| r.get(1).map(|c| URL_SHAPE.is_match(c)).unwrap_or(false))
                    .count();
                matches as f64 / rows.len().max(1) as f64
            };
            if first_col_share >= 0.6 && second_col_share < 0.3 {
                if avg_len(rows, 1) < AVG_LEN_THRESHOLD {
                    vec![ColumnRole::Url, ColumnRole::Title]
                } else {
                    vec![ColumnRole::Url, ColumnRole::Description]
                }
            } else if first_col_share < 0.3 && second_col_share < 0.3 {
                vec![ColumnRole::Title, ColumnRole::Description]
            } else {
                Vec::new()
            }
        }
        1 => {
            if first_col_share >= 0.6 {
                vec![ColumnRole::Url]
            } else if avg_len(rows, 0) < AVG_LEN_THRESHOLD {
                vec![ColumnRole::Title]
            } else {
                vec![ColumnRole::Description]
            }
        }
        _ => Vec::new(),
    }
}

/// Number of fetched pages probed when refining a single-column guess.
const SINGLE_TEXT_PROBES: usize = 8;
/// Minimum normalized-token Jaccard similarity counted as a "hit" against a
/// fetched title/description during refinement.
const SINGLE_TEXT_HIT_THRESHOLD: f64 = 0.34;
/// Margin by which one side must dominate the other to flip the role.
const SINGLE_TEXT_FLIP_MARGIN: u32 = 2;

/// Refine a single non-URL column's role once a few pages have been fetched
/// (§4.5): compare each probed input value's normalized tokens against the
/// fetched titles and descriptions, and flip the role if the opposite side
/// dominates by `SINGLE_TEXT_FLIP_MARGIN` hits out of up to
/// `SINGLE_TEXT_PROBES` probes. A no-op for any shape other than the
/// single-column `[Title]`/`[Description]` guess this exists to correct.
pub fn refine_single_text_role(
    shape: &mut InputShape,
    rows: &[Row],
    fetched_titles: &[String],
    fetched_descriptions: &[String],
) {
    if shape.column_count != 1 {
        return;
    }
    let current = match shape.inferred_roles.first().copied() {
        Some(role @ (ColumnRole::Title | ColumnRole::Description)) => role,
        _ => return,
    };

    let mut title_hits = 0u32;
    let mut desc_hits = 0u32;
    for row in rows.iter().take(SINGLE_TEXT_PROBES) {
        let Some(value) = row.get(0).filter(|v| !v.is_empty()) else {
            continue;
        };
        let best_title = fetched_titles
            .iter()
            .map(|t| crate::text_norm::jaccard_similarity(value, t))
            .fold(0.0_f64, f64::max);
        let best_desc = fetched_descriptions
            .iter()
            .map(|d| crate::text_norm::jaccard_similarity(value, d))
            .fold(0.0_f64, f64::max);

        if best_title < SINGLE_TEXT_HIT_THRESHOLD && best_desc < SINGLE_TEXT_HIT_THRESHOLD {
            continue;
        }
        if best_title >= best_desc {
            title_hits += 1;
        } else {
            desc_hits += 1;
        }
    }

    let flipped = match current {
        ColumnRole::Title if desc_hits >= title_hits + SINGLE_TEXT_FLIP_MARGIN => Some(ColumnRole::Description),
        ColumnRole::Description if title_hits >= desc_hits + SINGLE_TEXT_FLIP_MARGIN => Some(ColumnRole::Title),
        _ => None,
    };

    if let Some(new_role) = flipped {
        shape.inferred_roles = vec![new_role];
    }
}

fn derive_mode(shape: &InputShape) -> RunMode {
    if !shape.exists {
        return RunMode::NoInput;
    }
    let explicit = shape.column_count >= 3
        || (shape.column_count == 1 && shape.inferred_roles.contains(&ColumnRole::Url))
        || (shape.column_count == 2 && shape.first_column_url_share >= 0.6);
    if explicit {
        RunMode::ExplicitUrls
    } else if shape.column_count <= 1 {
        RunMode::SingleText
    } else {
        RunMode::Discovery
    }
}
