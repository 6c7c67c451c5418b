//! Style cascade resolution.

use tracing::debug;

use crate::conf::derive_builtin_cell_style;
use crate::spec::{EnumStyleRole, SpecCellStyle, SpecDocumentStyles};

/// Resolves the style of one cell role.
///
/// Cascade: explicit field style, per-type default, document default,
/// built-in default. Per-type defaults are folded into the field overrides
/// by the layout resolver, so lookups here see three tiers.
#[derive(Debug, Clone)]
pub struct StyleResolver {
    document: SpecDocumentStyles,
    l_builtin: [SpecCellStyle; 4],
}

impl StyleResolver {
    pub fn new(document: SpecDocumentStyles) -> Self {
        for role in EnumStyleRole::ALL {
            if document.get(role).is_some() {
                debug!(role = role.as_str(), "document style overrides built-in");
            }
        }
        Self {
            document,
            l_builtin: EnumStyleRole::ALL.map(derive_builtin_cell_style),
        }
    }

    /// Return the first style found along the cascade.
    pub fn resolve<'s>(
        &'s self,
        role: EnumStyleRole,
        field_override: Option<&'s SpecCellStyle>,
    ) -> &'s SpecCellStyle {
        field_override
            .or_else(|| self.document.get(role))
            .unwrap_or(&self.l_builtin[role as usize])
    }

    pub fn document(&self) -> &SpecDocumentStyles {
        &self.document
    }
}

impl Default for StyleResolver {
    fn default() -> Self {
        Self::new(SpecDocumentStyles::default())
    }
}
