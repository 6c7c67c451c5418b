//! Schema resolver: declarations in, cached layout trees out.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::conf::N_DEPTH_LAYOUT_MAX;
use crate::error::SchemaError;
use crate::layout::{FieldLayout, SheetLayout, SpecValueTransform};
use crate::schema::{EnumFieldShape, FieldDecl, SheetDecl, SheetRecord, TransformRef};
use crate::spec::SpecCellStyle;
use crate::util::derive_short_type_name;
use crate::value::{ValueKind, ValueTransform};

/// Per-call resolution state.
///
/// Layouts resolved during one top-level call are staged here and reach the
/// shared cache only when that call succeeds.
#[derive(Default)]
pub struct ResolveState {
    l_visiting: Vec<(TypeId, &'static str)>,
    dict_staged: HashMap<TypeId, Arc<SheetLayout>>,
}

/// Resolves record declarations into [`SheetLayout`] trees, cached per type.
///
/// Construct once and share; callers needing isolation build their own.
pub struct SchemaResolver {
    dict_layouts: RwLock<HashMap<TypeId, Arc<SheetLayout>>>,
    dict_transforms: Mutex<HashMap<TypeId, Arc<dyn ValueTransform>>>,
    lock_resolve: Mutex<()>,
    n_depth_max: usize,
}

/// Resolved field plus the dotted paths of its multi-valued declarations.
struct SpecFieldResolution {
    field: FieldLayout,
    l_multi_paths: Vec<String>,
}

impl SchemaResolver {
    pub fn new() -> Self {
        Self::with_max_depth(N_DEPTH_LAYOUT_MAX)
    }

    /// Resolver following at most `n_depth_max` nested record levels.
    pub fn with_max_depth(n_depth_max: usize) -> Self {
        Self {
            dict_layouts: RwLock::new(HashMap::new()),
            dict_transforms: Mutex::new(HashMap::new()),
            lock_resolve: Mutex::new(()),
            n_depth_max,
        }
    }

    /// Return the layout of `T`, resolving and caching it on first request.
    pub fn get_layout<T: SheetRecord>(&self) -> Result<Arc<SheetLayout>, SchemaError> {
        let type_id = TypeId::of::<T>();
        if let Some(layout) = self.derive_cached(type_id) {
            return Ok(layout);
        }

        let _guard = self.lock_resolve.lock();
        if let Some(layout) = self.derive_cached(type_id) {
            return Ok(layout);
        }

        let mut state = ResolveState::default();
        let layout = self.resolve_staged::<T>(&mut state)?;

        let mut dict_layouts = self.dict_layouts.write();
        for (staged_id, staged_layout) in state.dict_staged {
            dict_layouts.entry(staged_id).or_insert(staged_layout);
        }
        Ok(layout)
    }

    /// Whether the layout of `T` is already cached.
    pub fn is_cached<T: SheetRecord>(&self) -> bool {
        self.dict_layouts.read().contains_key(&TypeId::of::<T>())
    }

    /// Number of cached layouts.
    pub fn len(&self) -> usize {
        self.dict_layouts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict_layouts.read().is_empty()
    }

    fn derive_cached(&self, type_id: TypeId) -> Option<Arc<SheetLayout>> {
        self.dict_layouts.read().get(&type_id).cloned()
    }

    pub(crate) fn resolve_staged<T: SheetRecord>(
        &self,
        state: &mut ResolveState,
    ) -> Result<Arc<SheetLayout>, SchemaError> {
        let type_id = TypeId::of::<T>();
        let c_type_name = type_name::<T>();

        if let Some(layout) = self.derive_cached(type_id) {
            return Ok(layout);
        }
        if let Some(layout) = state.dict_staged.get(&type_id) {
            return Ok(Arc::clone(layout));
        }

        if let Some(n_pos) = state.l_visiting.iter().position(|(id, _)| *id == type_id) {
            let mut l_path: Vec<String> = state.l_visiting[n_pos..]
                .iter()
                .map(|(_, name)| derive_short_type_name(name).to_string())
                .collect();
            l_path.push(derive_short_type_name(c_type_name).to_string());
            return Err(SchemaError::CyclicReference { path: l_path });
        }
        if state.l_visiting.len() >= self.n_depth_max {
            return Err(SchemaError::DepthLimitExceeded {
                type_name: c_type_name,
                max_depth: self.n_depth_max,
            });
        }

        let Some(decl) = T::sheet_decl() else {
            return Err(SchemaError::MissingSheetMetadata {
                type_name: c_type_name,
            });
        };

        state.l_visiting.push((type_id, c_type_name));
        let result = self.derive_sheet_layout(decl, c_type_name, state);
        state.l_visiting.pop();

        let layout = Arc::new(result?);
        debug!(
            type_name = c_type_name,
            n_fields = layout.fields.len(),
            n_cols = layout.column_span(),
            n_rows_header = layout.row_span(),
            "resolved sheet layout"
        );
        state.dict_staged.insert(type_id, Arc::clone(&layout));
        Ok(layout)
    }

    fn derive_sheet_layout<T: SheetRecord>(
        &self,
        decl: SheetDecl<T>,
        c_type_name: &'static str,
        state: &mut ResolveState,
    ) -> Result<SheetLayout, SchemaError> {
        let SheetDecl {
            title,
            show_title_row,
            show_row_index_column,
            freeze_header,
            title_style,
            row_index_style,
            head_style,
            content_style,
            fields,
        } = decl;

        let mut l_fields = Vec::with_capacity(fields.len());
        let mut l_multi_paths: Vec<String> = Vec::new();
        for field_decl in fields {
            let resolution = self.derive_field_layout(
                field_decl,
                c_type_name,
                head_style.as_ref(),
                content_style.as_ref(),
                state,
            )?;
            l_multi_paths.extend(resolution.l_multi_paths);
            if l_multi_paths.len() > 1 {
                return Err(SchemaError::DuplicateMultiValued {
                    type_name: c_type_name,
                    first: l_multi_paths[0].clone(),
                    second: l_multi_paths[1].clone(),
                });
            }
            l_fields.push(resolution.field);
        }
        l_fields.sort_by_key(|field| field.order);

        let title = if title.trim().is_empty() {
            derive_short_type_name(c_type_name).to_string()
        } else {
            title
        };

        Ok(SheetLayout::new(
            c_type_name,
            title,
            show_title_row,
            show_row_index_column,
            freeze_header,
            title_style,
            row_index_style,
            l_fields,
            l_multi_paths.pop(),
        ))
    }

    fn derive_field_layout<T: SheetRecord>(
        &self,
        decl: FieldDecl<T>,
        c_type_name: &'static str,
        type_head_style: Option<&SpecCellStyle>,
        type_content_style: Option<&SpecCellStyle>,
        state: &mut ResolveState,
    ) -> Result<SpecFieldResolution, SchemaError> {
        let FieldDecl {
            name,
            shape,
            labels,
            order,
            show_own_header,
            transform,
            head_style,
            content_style,
            accessor,
            ..
        } = decl;

        let Some(accessor) = accessor else {
            return Err(SchemaError::MissingAccessor {
                type_name: c_type_name,
                field: name,
            });
        };
        let header_labels = labels.unwrap_or_else(|| vec![name.clone()]);
        let head_style = head_style.or_else(|| type_head_style.cloned());
        let content_style = content_style.or_else(|| type_content_style.cloned());

        match shape {
            EnumFieldShape::Scalar(kind) | EnumFieldShape::List(kind) => {
                if header_labels.is_empty() {
                    return Err(SchemaError::MissingHeaderLabels {
                        type_name: c_type_name,
                        field: name,
                    });
                }
                let is_collection = matches!(shape, EnumFieldShape::List(_));

                let (value_kind, value_transform) = match transform {
                    None => (kind, None),
                    Some(transform_ref) => {
                        let inner = self.derive_transform(&transform_ref);
                        if !inner.input_kind().accepts(kind) {
                            return Err(SchemaError::TransformTypeMismatch {
                                type_name: c_type_name,
                                field: name,
                                transform: transform_ref.type_name,
                                expected: inner.input_kind(),
                                actual: kind,
                            });
                        }
                        (
                            inner.output_kind(),
                            Some(SpecValueTransform {
                                name: transform_ref.type_name,
                                inner,
                            }),
                        )
                    }
                };

                let l_multi_paths = if is_collection {
                    vec![name.clone()]
                } else {
                    vec![]
                };
                Ok(SpecFieldResolution {
                    field: FieldLayout {
                        name,
                        order,
                        header_labels,
                        is_multi_valued: is_collection,
                        is_collection,
                        is_nested: false,
                        show_own_header_when_nested: false,
                        child_layout: Vec::new(),
                        value_kind,
                        value_transform,
                        head_style,
                        content_style,
                        accessor,
                        owner_type_name: c_type_name,
                    },
                    l_multi_paths,
                })
            }
            EnumFieldShape::Nested {
                target,
                is_collection,
            } => {
                if let Some(transform_ref) = transform {
                    warn!(
                        type_name = c_type_name,
                        field = %name,
                        transform = transform_ref.type_name,
                        "transform on nested field is ignored"
                    );
                }

                let child = (target.resolve)(self, state).map_err(|err| match err {
                    SchemaError::MissingSheetMetadata { type_name } if type_name == target.type_name => {
                        SchemaError::NestedTypeUnresolved {
                            type_name: c_type_name,
                            field: name.clone(),
                            element: target.type_name,
                        }
                    }
                    other => other,
                })?;
                if child.fields.is_empty() {
                    return Err(SchemaError::EmptyNestedLayout {
                        type_name: target.type_name,
                    });
                }

                let mut l_multi_paths = Vec::new();
                if is_collection {
                    l_multi_paths.push(name.clone());
                }
                if let Some(c_child_path) = &child.multi_valued_path {
                    l_multi_paths.push(format!("{name}.{c_child_path}"));
                }

                Ok(SpecFieldResolution {
                    field: FieldLayout {
                        name,
                        order,
                        header_labels,
                        is_multi_valued: is_collection || child.has_multi_valued_descendant,
                        is_collection,
                        is_nested: true,
                        show_own_header_when_nested: show_own_header,
                        child_layout: child.fields.clone(),
                        value_kind: ValueKind::Any,
                        value_transform: None,
                        head_style,
                        content_style,
                        accessor,
                        owner_type_name: c_type_name,
                    },
                    l_multi_paths,
                })
            }
        }
    }

    fn derive_transform(&self, transform_ref: &TransformRef) -> Arc<dyn ValueTransform> {
        let mut dict_transforms = self.dict_transforms.lock();
        Arc::clone(
            dict_transforms
                .entry(transform_ref.type_id)
                .or_insert_with(transform_ref.create),
        )
    }
}

impl Default for SchemaResolver {
    fn default() -> Self {
        Self::new()
    }
}
