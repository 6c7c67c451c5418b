//! Neutral schema declarations consumed by the layout resolver.
//!
//! A record type opts into sheet export by implementing [`SheetRecord`] and
//! returning a [`SheetDecl`] that lists its fields in declaration order.
//! Field accessors are type-erased here, so the resolved layout tree carries
//! no generic parameters.

use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::conf::N_ORDER_FIELD_DEFAULT;
use crate::error::SchemaError;
use crate::layout::SheetLayout;
use crate::resolver::{ResolveState, SchemaResolver};
use crate::spec::SpecCellStyle;
use crate::value::{CellValue, FieldValue, ValueKind, ValueTransform};

/// Type-erased record reference handed through the renderers.
pub type AnyRecord = dyn Any + Send + Sync;

pub(crate) type ErasedAccessor =
    Arc<dyn for<'a> Fn(&'a AnyRecord) -> Option<FieldValue<'a>> + Send + Sync>;

pub(crate) fn erase<F>(read: F) -> ErasedAccessor
where
    F: for<'a> Fn(&'a AnyRecord) -> Option<FieldValue<'a>> + Send + Sync + 'static,
{
    Arc::new(read)
}

/// A record type that can be laid out as sheet rows.
pub trait SheetRecord: Any + Send + Sync + Sized {
    /// Layout declaration of the type; `None` marks a type without metadata.
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        None
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region SheetDeclaration

/// Type-level layout declaration.
pub struct SheetDecl<T> {
    pub(crate) title: String,
    pub(crate) show_title_row: bool,
    pub(crate) show_row_index_column: bool,
    pub(crate) freeze_header: bool,
    pub(crate) title_style: Option<SpecCellStyle>,
    pub(crate) row_index_style: Option<SpecCellStyle>,
    pub(crate) head_style: Option<SpecCellStyle>,
    pub(crate) content_style: Option<SpecCellStyle>,
    pub(crate) fields: Vec<FieldDecl<T>>,
}

impl<T: SheetRecord> SheetDecl<T> {
    /// Start a declaration; an empty title falls back to the type name.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            show_title_row: false,
            show_row_index_column: false,
            freeze_header: false,
            title_style: None,
            row_index_style: None,
            head_style: None,
            content_style: None,
            fields: Vec::new(),
        }
    }

    /// Write the title in a merged row above the header.
    pub fn show_title_row(mut self, if_show: bool) -> Self {
        self.show_title_row = if_show;
        self
    }

    /// Prefix every sheet row with a 1-based instance index column.
    pub fn show_row_index_column(mut self, if_show: bool) -> Self {
        self.show_row_index_column = if_show;
        self
    }

    /// Freeze the title and header rows.
    pub fn freeze_header(mut self, if_freeze: bool) -> Self {
        self.freeze_header = if_freeze;
        self
    }

    pub fn title_style(mut self, style: SpecCellStyle) -> Self {
        self.title_style = Some(style);
        self
    }

    pub fn row_index_style(mut self, style: SpecCellStyle) -> Self {
        self.row_index_style = Some(style);
        self
    }

    /// Header style of every field that declares none.
    pub fn head_style(mut self, style: SpecCellStyle) -> Self {
        self.head_style = Some(style);
        self
    }

    /// Content style of every field that declares none.
    pub fn content_style(mut self, style: SpecCellStyle) -> Self {
        self.content_style = Some(style);
        self
    }

    /// Append a field; declaration order breaks `order` ties.
    pub fn field(mut self, field: FieldDecl<T>) -> Self {
        self.fields.push(field);
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldDeclaration

/// Element type of a nested field, resolved lazily by the resolver.
#[derive(Clone, Copy)]
pub(crate) struct NestedTarget {
    pub(crate) type_name: &'static str,
    pub(crate) resolve:
        fn(&SchemaResolver, &mut ResolveState) -> Result<Arc<SheetLayout>, SchemaError>,
}

impl NestedTarget {
    fn of<C: SheetRecord>() -> Self {
        Self {
            type_name: type_name::<C>(),
            resolve: SchemaResolver::resolve_staged::<C>,
        }
    }
}

/// Transform type declared on a field, instantiated once per resolver.
#[derive(Clone, Copy)]
pub(crate) struct TransformRef {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) create: fn() -> Arc<dyn ValueTransform>,
}

fn create_transform<X: ValueTransform + Default + 'static>() -> Arc<dyn ValueTransform> {
    Arc::new(X::default())
}

#[derive(Clone, Copy)]
pub(crate) enum EnumFieldShape {
    /// One value per record.
    Scalar(ValueKind),
    /// Direct one-to-many leaf.
    List(ValueKind),
    /// Nested record, one-to-one or one-to-many.
    Nested {
        target: NestedTarget,
        is_collection: bool,
    },
}

/// Field-level layout declaration.
pub struct FieldDecl<T> {
    pub(crate) name: String,
    pub(crate) shape: EnumFieldShape,
    pub(crate) labels: Option<Vec<String>>,
    pub(crate) order: i32,
    pub(crate) show_own_header: bool,
    pub(crate) transform: Option<TransformRef>,
    pub(crate) head_style: Option<SpecCellStyle>,
    pub(crate) content_style: Option<SpecCellStyle>,
    pub(crate) accessor: Option<ErasedAccessor>,
    _record: PhantomData<fn(&T)>,
}

impl<T: SheetRecord> FieldDecl<T> {
    fn with_shape(name: impl Into<String>, shape: EnumFieldShape) -> Self {
        Self {
            name: name.into(),
            shape,
            labels: None,
            order: N_ORDER_FIELD_DEFAULT,
            show_own_header: false,
            transform: None,
            head_style: None,
            content_style: None,
            accessor: None,
            _record: PhantomData,
        }
    }

    /// Declare a scalar field without an accessor; attach one with [`Self::read`].
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::with_shape(name, EnumFieldShape::Scalar(kind))
    }

    /// Declare a scalar field.
    pub fn scalar<F>(name: impl Into<String>, kind: ValueKind, read: F) -> Self
    where
        F: Fn(&T) -> CellValue + Send + Sync + 'static,
    {
        Self::new(name, kind).read(read)
    }

    /// Declare a multi-valued leaf; every element takes one row.
    pub fn list<F>(name: impl Into<String>, kind: ValueKind, read: F) -> Self
    where
        F: Fn(&T) -> Option<Vec<CellValue>> + Send + Sync + 'static,
    {
        let mut field = Self::with_shape(name, EnumFieldShape::List(kind));
        field.accessor = Some(erase(move |record| {
            record
                .downcast_ref::<T>()
                .map(|rec| FieldValue::List(read(rec)))
        }));
        field
    }

    /// Declare a one-to-one nested record field.
    pub fn nested<C, F>(name: impl Into<String>, read: F) -> Self
    where
        C: SheetRecord,
        F: for<'a> Fn(&'a T) -> Option<&'a C> + Send + Sync + 'static,
    {
        let mut field = Self::with_shape(
            name,
            EnumFieldShape::Nested {
                target: NestedTarget::of::<C>(),
                is_collection: false,
            },
        );
        field.accessor = Some(erase(move |record| {
            record
                .downcast_ref::<T>()
                .map(|rec| FieldValue::Record(read(rec).map(|child| child as &AnyRecord)))
        }));
        field
    }

    /// Declare a one-to-many nested record field.
    pub fn nested_list<C, F>(name: impl Into<String>, read: F) -> Self
    where
        C: SheetRecord,
        F: for<'a> Fn(&'a T) -> Option<Vec<&'a C>> + Send + Sync + 'static,
    {
        let mut field = Self::with_shape(
            name,
            EnumFieldShape::Nested {
                target: NestedTarget::of::<C>(),
                is_collection: true,
            },
        );
        field.accessor = Some(erase(move |record| {
            record.downcast_ref::<T>().map(|rec| {
                FieldValue::Records(read(rec).map(|l_children| {
                    l_children
                        .into_iter()
                        .map(|child| child as &AnyRecord)
                        .collect()
                }))
            })
        }));
        field
    }

    /// Attach a scalar accessor.
    pub fn read<F>(mut self, read: F) -> Self
    where
        F: Fn(&T) -> CellValue + Send + Sync + 'static,
    {
        self.accessor = Some(erase(move |record| {
            record
                .downcast_ref::<T>()
                .map(|rec| FieldValue::Scalar(read(rec)))
        }));
        self
    }

    /// Single header label.
    pub fn label(self, label: impl Into<String>) -> Self {
        self.labels([label.into()])
    }

    /// Multi-row header labels, top row first.
    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Ascending sort key among siblings.
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Render this nested field's labels above its children's headers.
    pub fn show_own_header(mut self, if_show: bool) -> Self {
        self.show_own_header = if_show;
        self
    }

    /// Convert values through `X` before writing.
    pub fn transform<X: ValueTransform + Default + 'static>(mut self) -> Self {
        self.transform = Some(TransformRef {
            type_id: TypeId::of::<X>(),
            type_name: type_name::<X>(),
            create: create_transform::<X>,
        });
        self
    }

    pub fn head_style(mut self, style: SpecCellStyle) -> Self {
        self.head_style = Some(style);
        self
    }

    pub fn content_style(mut self, style: SpecCellStyle) -> Self {
        self.content_style = Some(style);
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
