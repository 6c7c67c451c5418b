//! Stateless helper utilities shared by the renderers and backends.

use std::collections::BTreeSet;

use crate::conf::{
    C_SHEET_NAME_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::error::RenderError;
use crate::spec::SpecAutofitCellsPolicy;
use crate::value::CellValue;

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
///
/// Excel also rejects names starting or ending with an apostrophe; those are
/// stripped after length capping.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    let c_name: String = c_name.trim().chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect();
    let c_name = c_name.trim_matches(|c: char| c == '\'' || c.is_whitespace());
    if c_name.is_empty() {
        return C_SHEET_NAME_DEFAULT.to_string();
    }
    c_name.to_string()
}

/// Return `name`, or the first free `name__N` (N from 2), and record it as taken.
///
/// Excel compares sheet names case-insensitively, so `set_sheet_names_existing`
/// holds lowercased keys.
pub fn derive_unique_sheet_name(name: &str, set_sheet_names_existing: &mut BTreeSet<String>) -> String {
    if set_sheet_names_existing.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let mut n_idx = 2usize;
    loop {
        let c_suffix = format!("__{n_idx}");
        let n_len_base = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_suffix.len());
        let c_base: String = name.chars().take(n_len_base).collect();
        let candidate = format!("{c_base}{c_suffix}");
        if set_sheet_names_existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

/// Last path segment of a type name, generics stripped.
pub fn derive_short_type_name(type_name: &str) -> &str {
    let c_base = type_name.split('<').next().unwrap_or(type_name);
    c_base.rsplit("::").next().unwrap_or(c_base)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GridBounds

/// Cast a grid row to the worksheet row type, enforcing the Excel limit.
pub fn cast_row_num(value: usize) -> Result<u32, RenderError> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(RenderError::RowOverflow { row: value });
    }
    u32::try_from(value).map_err(|_| RenderError::RowOverflow { row: value })
}

/// Cast a grid column to the worksheet column type, enforcing the Excel limit.
pub fn cast_col_num(value: usize) -> Result<u16, RenderError> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(RenderError::ColumnOverflow { col: value });
    }
    u16::try_from(value).map_err(|_| RenderError::ColumnOverflow { col: value })
}

pub fn validate_cell_position(row: usize, col: usize) -> Result<(), RenderError> {
    cast_row_num(row)?;
    cast_col_num(col)?;
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Autofit

/// Estimate display width: ASCII counts 1, other chars 1.6 each.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

/// Estimate displayed width units for one written cell value.
pub fn estimate_width_len(value: &CellValue) -> usize {
    match value {
        CellValue::Empty => 0,
        CellValue::Text(s) => estimate_unicode_string_width(s),
        CellValue::Number(n) if n.fract() != 0.0 => format!("{n:.4}").len(),
        other => other.to_string().len(),
    }
}

pub fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), String> {
    if policy_autofit.width_cell_min == 0 {
        return Err("policy_autofit.width_cell_min must be >= 1.".to_string());
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        );
    }
    Ok(())
}

/// Final column width from a recorded content width.
pub fn derive_autofit_width(policy_autofit: &SpecAutofitCellsPolicy, n_width_recorded: usize) -> usize {
    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
    usize::min(
        n_max,
        usize::max(n_min, n_width_recorded + policy_autofit.width_cell_padding),
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("  [*]  ", ""), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);
        assert_eq!(sanitize_sheet_name("'Q1'", "_"), "Q1");
        assert_eq!(sanitize_sheet_name("''", "_"), "Sheet");
        assert_eq!(
            sanitize_sheet_name(&format!("{}' tail", "a".repeat(30)), "_"),
            "a".repeat(30)
        );
    }

    #[test]
    fn test_derive_unique_sheet_name_suffixes_and_caps_length() {
        let mut set_names = BTreeSet::new();
        assert_eq!(derive_unique_sheet_name("Teacher", &mut set_names), "Teacher");
        assert_eq!(derive_unique_sheet_name("Teacher", &mut set_names), "Teacher__2");
        assert_eq!(derive_unique_sheet_name("Teacher", &mut set_names), "Teacher__3");

        let c_long = "y".repeat(31);
        assert_eq!(derive_unique_sheet_name(&c_long, &mut set_names), c_long);
        let c_dedup = derive_unique_sheet_name(&c_long, &mut set_names);
        assert_eq!(c_dedup, format!("{}__2", "y".repeat(28)));
        assert_eq!(c_dedup.chars().count(), 31);
    }

    #[test]
    fn test_derive_unique_sheet_name_ignores_case() {
        let mut set_names = BTreeSet::new();
        assert_eq!(derive_unique_sheet_name("Sales", &mut set_names), "Sales");
        assert_eq!(derive_unique_sheet_name("sales", &mut set_names), "sales__2");
        assert_eq!(derive_unique_sheet_name("SALES__2", &mut set_names), "SALES__2__2");
    }

    #[test]
    fn test_derive_unique_sheet_name_keeps_wide_suffixes_whole() {
        let mut set_names = BTreeSet::new();
        let c_long = "z".repeat(31);
        let l_names: Vec<String> = (0..12)
            .map(|_| derive_unique_sheet_name(&c_long, &mut set_names))
            .collect();

        assert_eq!(l_names[9], format!("{}__10", "z".repeat(27)));
        assert_eq!(l_names[11], format!("{}__12", "z".repeat(27)));
        assert!(l_names.iter().all(|c_name| c_name.chars().count() <= 31));
        assert_eq!(l_names.iter().collect::<BTreeSet<_>>().len(), 12);
    }

    #[test]
    fn test_derive_short_type_name() {
        assert_eq!(derive_short_type_name("crate::testing::Teacher"), "Teacher");
        assert_eq!(derive_short_type_name("a::Wrap<b::Inner>"), "Wrap");
        assert_eq!(derive_short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_cast_enforces_excel_limits() {
        assert_eq!(cast_row_num(N_NROWS_EXCEL_MAX - 1).unwrap(), 1_048_575);
        assert!(matches!(
            cast_row_num(N_NROWS_EXCEL_MAX),
            Err(RenderError::RowOverflow { row: 1_048_576 })
        ));
        assert!(matches!(
            cast_col_num(N_NCOLS_EXCEL_MAX),
            Err(RenderError::ColumnOverflow { col: 16_384 })
        ));
        assert!(validate_cell_position(0, 0).is_ok());
    }

    #[test]
    fn test_width_estimates() {
        assert_eq!(estimate_unicode_string_width("abc"), 3);
        assert_eq!(estimate_unicode_string_width("名字"), 3);
        assert_eq!(estimate_width_len(&CellValue::Empty), 0);
        assert_eq!(estimate_width_len(&CellValue::Integer(12345)), 5);
        assert_eq!(estimate_width_len(&CellValue::Number(1.5)), 6);
        assert_eq!(estimate_width_len(&CellValue::Bool(true)), 4);
    }

    #[test]
    fn test_autofit_width_clamps_to_policy() {
        let policy = SpecAutofitCellsPolicy::default();
        assert_eq!(derive_autofit_width(&policy, 0), 8);
        assert_eq!(derive_autofit_width(&policy, 10), 12);
        assert_eq!(derive_autofit_width(&policy, 500), 60);

        assert!(validate_policy_autofit(&policy).is_ok());
        assert!(validate_policy_autofit(&SpecAutofitCellsPolicy {
            width_cell_min: 0,
            ..Default::default()
        })
        .is_err());
        assert!(validate_policy_autofit(&SpecAutofitCellsPolicy {
            width_cell_max: 4,
            ..Default::default()
        })
        .is_err());
    }
}
