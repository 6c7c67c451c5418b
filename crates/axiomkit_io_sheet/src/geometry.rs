//! Grid geometry of layout trees.
//!
//! These spans are the only source of truth for header height and column
//! count; every merge the renderers emit is derived from them.

use crate::layout::FieldLayout;

/// Grid columns occupied by `field`: 1 for a leaf, else the sum over children.
pub fn column_span(field: &FieldLayout) -> usize {
    if !field.is_nested {
        return 1;
    }
    field.child_layout.iter().map(column_span).sum()
}

/// Header rows needed by `field`.
///
/// A leaf needs one row per label. A nested field needs its own label rows
/// (when shown) plus the tallest child.
pub fn row_span(field: &FieldLayout) -> usize {
    if !field.is_nested {
        return field.header_labels.len();
    }
    let n_rows_own = if field.show_own_header_when_nested {
        field.header_labels.len()
    } else {
        0
    };
    n_rows_own + field.child_layout.iter().map(row_span).max().unwrap_or(0)
}

/// Grid columns of a sheet with top-level `fields`.
pub fn sheet_column_span(fields: &[FieldLayout], if_show_row_index: bool) -> usize {
    usize::from(if_show_row_index) + fields.iter().map(column_span).sum::<usize>()
}

/// Header rows of a sheet with top-level `fields`.
pub fn sheet_row_span(fields: &[FieldLayout]) -> usize {
    fields.iter().map(row_span).max().unwrap_or(0)
}

/// Leaf fields under `fields` paired with their grid column, left to right.
pub(crate) fn derive_leaf_columns(
    fields: &[FieldLayout],
    col_start: usize,
) -> Vec<(usize, &FieldLayout)> {
    let mut l_leaves = Vec::new();
    let mut n_col = col_start;
    for field in fields {
        if field.is_nested {
            l_leaves.extend(derive_leaf_columns(&field.child_layout, n_col));
        } else {
            l_leaves.push((n_col, field));
        }
        n_col += column_span(field);
    }
    l_leaves
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arb_field() -> impl Strategy<Value = FieldLayout> {
        let leaf = (1usize..4).prop_map(|n_labels| {
            FieldLayout::test_leaf("leaf", &vec!["L"; n_labels])
        });
        leaf.prop_recursive(3, 32, 4, |inner| {
            (
                prop::collection::vec(inner, 1..4),
                0usize..3,
                any::<bool>(),
            )
                .prop_map(|(children, n_labels, if_show)| {
                    FieldLayout::test_nested("group", &vec!["G"; n_labels], if_show, children)
                })
        })
    }

    #[test]
    fn test_leaf_spans() {
        let field = FieldLayout::test_leaf("name", &["Person", "Name"]);
        assert_eq!(column_span(&field), 1);
        assert_eq!(row_span(&field), 2);
    }

    #[test]
    fn test_nested_with_own_header_and_sibling() {
        let nested = FieldLayout::test_nested(
            "mentor",
            &["Mentor"],
            true,
            vec![
                FieldLayout::test_leaf("age", &["Age"]),
                FieldLayout::test_leaf("name", &["Name"]),
            ],
        );
        let fields = vec![nested, FieldLayout::test_leaf("title", &["Title"])];

        assert_eq!(sheet_row_span(&fields), 1 + 1);
        assert_eq!(sheet_column_span(&fields, false), 2 + 1);
        assert_eq!(sheet_column_span(&fields, true), 4);
    }

    #[test]
    fn test_hidden_own_header_adds_no_rows() {
        let nested = FieldLayout::test_nested(
            "mentor",
            &["Mentor", "Info"],
            false,
            vec![FieldLayout::test_leaf("age", &["Age"])],
        );
        assert_eq!(row_span(&nested), 1);
    }

    #[test]
    fn test_empty_sheet_spans_are_zero() {
        assert_eq!(sheet_row_span(&[]), 0);
        assert_eq!(sheet_column_span(&[], false), 0);
        assert_eq!(sheet_column_span(&[], true), 1);
    }

    #[test]
    fn test_leaf_columns_follow_spans() {
        let fields = vec![
            FieldLayout::test_leaf("a", &["A"]),
            FieldLayout::test_nested(
                "g",
                &["G"],
                true,
                vec![
                    FieldLayout::test_leaf("b", &["B"]),
                    FieldLayout::test_leaf("c", &["C"]),
                ],
            ),
            FieldLayout::test_leaf("d", &["D"]),
        ];
        let l_cols: Vec<(usize, &str)> = derive_leaf_columns(&fields, 1)
            .into_iter()
            .map(|(n_col, leaf)| (n_col, leaf.name.as_str()))
            .collect();
        assert_eq!(l_cols, vec![(1, "a"), (2, "b"), (3, "c"), (4, "d")]);
    }

    proptest! {
        #[test]
        fn prop_nested_column_span_is_sum_of_children(field in arb_field()) {
            if field.is_nested {
                let n_sum: usize = field.child_layout.iter().map(column_span).sum();
                prop_assert_eq!(column_span(&field), n_sum);
            }
            let n_leaves = derive_leaf_columns(std::slice::from_ref(&field), 0).len();
            prop_assert_eq!(column_span(&field), n_leaves);
        }

        #[test]
        fn prop_row_span_covers_every_child(field in arb_field()) {
            for child in &field.child_layout {
                prop_assert!(row_span(&field) >= row_span(child));
            }
        }

        #[test]
        fn prop_flat_sheet_column_span_counts_fields(n_fields in 0usize..12, if_show in any::<bool>()) {
            let fields: Vec<FieldLayout> = (0..n_fields)
                .map(|_| FieldLayout::test_leaf("f", &["F"]))
                .collect();
            prop_assert_eq!(
                sheet_column_span(&fields, if_show),
                n_fields + usize::from(if_show)
            );
        }
    }
}
