//! Output Gate (C6): validates user-selected outputs against the classified
//! input shape. Advisory (surfaces errors) and enforced (rejects `Apply`).

use std::collections::HashSet;

use crate::classifier::{ColumnRole, InputShape};
use crate::error::GateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Urls,
    SiteCatalog,
    InternalLinks,
    Tree,
    ExistenceCsv,
    ComparisonCsv,
}

impl OutputKind {
    fn key(self) -> &'static str {
        match self {
            OutputKind::Urls => "urls",
            OutputKind::SiteCatalog => "site_catalog",
            OutputKind::InternalLinks => "internal_links",
            OutputKind::Tree => "tree",
            OutputKind::ExistenceCsv => "existence_csv",
            OutputKind::ComparisonCsv => "comparison_csv",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "urls" => Some(OutputKind::Urls),
            "site_catalog" => Some(OutputKind::SiteCatalog),
            "internal_links" => Some(OutputKind::InternalLinks),
            "tree" => Some(OutputKind::Tree),
            "existence_csv" => Some(OutputKind::ExistenceCsv),
            "comparison_csv" => Some(OutputKind::ComparisonCsv),
            _ => None,
        }
    }
}

/// Parse the CLI/Control-Channel string form of selected outputs,
/// silently ignoring unrecognized names.
pub fn parse_selected(names: &[String]) -> HashSet<OutputKind> {
    names.iter().filter_map(|n| OutputKind::from_key(n)).collect()
}

#[derive(Debug, Clone)]
pub struct GateResult {
    pub ok: bool,
    pub errors: Vec<GateError>,
}

/// Validate `selected` against `shape`. The `columnCount == 2` ambiguity
/// between the Classifier's table and this gate's own rule is resolved in
/// this function's favor (see the crate's design notes): gating is keyed
/// only on `first_column_url_share` and `inferred_roles` membership.
pub fn validate(shape: &InputShape, selected: &HashSet<OutputKind>) -> GateResult {
    let mut errors = Vec::new();

    let has_url_shape = shape.first_column_url_share >= 0.6 || shape.inferred_roles.contains(&ColumnRole::Url);
    let has_text_shape =
        shape.inferred_roles.contains(&ColumnRole::Title) || shape.inferred_roles.contains(&ColumnRole::Description);

    if selected.contains(&OutputKind::ExistenceCsv) {
        if !shape.exists {
            errors.push(reject(OutputKind::ExistenceCsv, "no input file was provided"));
        } else if !has_url_shape {
            errors.push(reject(
                OutputKind::ExistenceCsv,
                "first column must look like URLs",
            ));
        }
    }

    if selected.contains(&OutputKind::ComparisonCsv) {
        if !shape.exists {
            errors.push(reject(OutputKind::ComparisonCsv, "no input file was provided"));
        } else if !has_text_shape {
            errors.push(reject(
                OutputKind::ComparisonCsv,
                "input must contain a title and/or description column",
            ));
        }
    }

    GateResult {
        ok: errors.is_empty(),
        errors,
    }
}

fn reject(kind: OutputKind, reason: &str) -> GateError {
    GateError {
        key: kind.key().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(column_count: usize, first_col_share: f64, roles: Vec<ColumnRole>) -> InputShape {
        InputShape {
            exists: true,
            column_count,
            first_column_url_share: first_col_share,
            first_row_is_url: first_col_share >= 0.6,
            inferred_roles: roles,
        }
    }

    #[test]
    fn always_allowed_outputs_never_rejected() {
        let shape = shape(2, 0.0, vec![ColumnRole::Title, ColumnRole::Description]);
        let selected = [
            OutputKind::Urls,
            OutputKind::SiteCatalog,
            OutputKind::InternalLinks,
            OutputKind::Tree,
        ]
        .into_iter()
        .collect();
        let result = validate(&shape, &selected);
        assert!(result.ok);
    }

    #[test]
    fn titles_and_descriptions_reject_existence_but_allow_comparison() {
        let shape = shape(2, 0.0, vec![ColumnRole::Title, ColumnRole::Description]);
        let selected = [OutputKind::ComparisonCsv].into_iter().collect();
        assert!(validate(&shape, &selected).ok);

        let selected = [OutputKind::ExistenceCsv].into_iter().collect();
        let result = validate(&shape, &selected);
        assert!(!result.ok);
        assert_eq!(result.errors[0].key, "existence_csv");
    }

    #[test]
    fn single_url_column_rejects_comparison() {
        let shape = shape(1, 1.0, vec![ColumnRole::Url]);
        let selected = [OutputKind::ComparisonCsv].into_iter().collect();
        let result = validate(&shape, &selected);
        assert!(!result.ok);
        assert!(result.errors[0].reason.contains("title"));
    }

    #[test]
    fn absent_input_rejects_both_gated_outputs() {
        let shape = InputShape::absent();
        let selected = [OutputKind::ExistenceCsv, OutputKind::ComparisonCsv]
            .into_iter()
            .collect();
        let result = validate(&shape, &selected);
        assert!(!result.ok);
        assert_eq!(result.errors.len(), 2);
    }
}
