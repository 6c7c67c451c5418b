//! Shared record fixtures for in-crate tests.

use crate::schema::{FieldDecl, SheetDecl, SheetRecord};
use crate::spec::SpecCellStyle;
use crate::value::{CellValue, IntegerToText, ValueKind};

pub struct Student {
    pub name: String,
    pub age: i64,
}

impl Student {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            name: name.to_string(),
            age,
        }
    }
}

impl SheetRecord for Student {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("Student")
                .field(
                    FieldDecl::scalar("age", ValueKind::Integer, |s: &Student| {
                        CellValue::from(s.age)
                    })
                    .label("Age")
                    .order(2),
                )
                .field(
                    FieldDecl::scalar("name", ValueKind::Text, |s: &Student| {
                        CellValue::from(&s.name)
                    })
                    .label("Name")
                    .order(1),
                ),
        )
    }
}

pub struct Colleague {
    pub name: String,
    pub age: i64,
}

impl Colleague {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            name: name.to_string(),
            age,
        }
    }
}

impl SheetRecord for Colleague {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("Colleague")
                .head_style(SpecCellStyle {
                    bg_color: Some("#FFFF00".to_string()),
                    ..Default::default()
                })
                .field(
                    FieldDecl::scalar("age", ValueKind::Integer, |c: &Colleague| {
                        CellValue::from(c.age)
                    })
                    .label("Age")
                    .order(1)
                    .transform::<IntegerToText>(),
                )
                .field(
                    FieldDecl::scalar("name", ValueKind::Text, |c: &Colleague| {
                        CellValue::from(&c.name)
                    })
                    .label("Name")
                    .order(2),
                ),
        )
    }
}

/// Seven grid columns with the row index, two header rows.
pub struct Teacher {
    pub name: String,
    pub age: i64,
    pub students: Option<Vec<Student>>,
    pub mentor: Option<Colleague>,
}

pub fn derive_teacher(
    name: &str,
    age: i64,
    students: Option<Vec<Student>>,
    mentor: Option<Colleague>,
) -> Teacher {
    Teacher {
        name: name.to_string(),
        age,
        students,
        mentor,
    }
}

impl SheetRecord for Teacher {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("Teacher")
                .show_title_row(true)
                .show_row_index_column(true)
                .freeze_header(true)
                .field(
                    FieldDecl::scalar("name", ValueKind::Text, |t: &Teacher| {
                        CellValue::from(&t.name)
                    })
                    .label("Name")
                    .order(3),
                )
                .field(
                    FieldDecl::scalar("age", ValueKind::Integer, |t: &Teacher| {
                        CellValue::from(t.age)
                    })
                    .label("Age")
                    .order(1)
                    .transform::<IntegerToText>(),
                )
                .field(
                    FieldDecl::nested_list::<Student, _>("students", |t: &Teacher| {
                        t.students
                            .as_ref()
                            .map(|l_students| l_students.iter().collect::<Vec<_>>())
                    })
                    .label("Students")
                    .show_own_header(true)
                    .order(2),
                )
                .field(
                    FieldDecl::nested::<Colleague, _>("mentor", |t: &Teacher| t.mentor.as_ref())
                        .label("Mentor")
                        .show_own_header(true)
                        .order(4),
                ),
        )
    }
}

/// Scalar name beside a multi-valued text leaf.
pub struct Tagged {
    pub name: String,
    pub tags: Option<Vec<String>>,
}

impl Tagged {
    pub fn new(name: &str, tags: Option<Vec<&str>>) -> Self {
        Self {
            name: name.to_string(),
            tags: tags.map(|l_tags| l_tags.into_iter().map(str::to_string).collect()),
        }
    }
}

impl SheetRecord for Tagged {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("")
                .field(FieldDecl::scalar("name", ValueKind::Text, |t: &Tagged| {
                    CellValue::from(&t.name)
                }))
                .field(FieldDecl::list("tags", ValueKind::Text, |t: &Tagged| {
                    t.tags
                        .as_ref()
                        .map(|l_tags| l_tags.iter().map(CellValue::from).collect())
                })),
        )
    }
}

/// Title carrying characters Excel rejects in sheet names.
pub struct Quarterly {
    pub region: String,
}

impl SheetRecord for Quarterly {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("Q1/Q2: Sales").field(
                FieldDecl::scalar("region", ValueKind::Text, |q: &Quarterly| {
                    CellValue::from(&q.region)
                })
                .label("Region"),
            ),
        )
    }
}

/// Sheet titles that collide once case is ignored, plus a quoted title.
macro_rules! titled_region_record {
    ($($name:ident => $title:expr),+ $(,)?) => {
        $(
            pub struct $name {
                pub region: String,
            }

            impl SheetRecord for $name {
                fn sheet_decl() -> Option<SheetDecl<Self>> {
                    Some(SheetDecl::new($title).field(
                        FieldDecl::scalar("region", ValueKind::Text, |r: &$name| {
                            CellValue::from(&r.region)
                        })
                        .label("Region"),
                    ))
                }
            }
        )+
    };
}

titled_region_record!(
    SalesUpper => "Sales",
    SalesLower => "sales",
    QuotedQuarter => "'Q1'",
);

/// Field of a kind without a cell writer; resolves, fails on write.
pub struct Blobby {
    pub payload: Vec<u8>,
}

impl SheetRecord for Blobby {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(SheetDecl::new("Blobby").field(FieldDecl::scalar(
            "payload",
            ValueKind::Other("Blob"),
            |b: &Blobby| CellValue::from(b.payload.len() as u32),
        )))
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region InvalidDeclarations

pub struct DoubleMulti {
    pub tags: Vec<String>,
    pub students: Vec<Student>,
}

impl SheetRecord for DoubleMulti {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("DoubleMulti")
                .field(FieldDecl::list("tags", ValueKind::Text, |d: &DoubleMulti| {
                    Some(d.tags.iter().map(CellValue::from).collect())
                }))
                .field(FieldDecl::nested_list::<Student, _>(
                    "students",
                    |d: &DoubleMulti| Some(d.students.iter().collect::<Vec<_>>()),
                )),
        )
    }
}

pub struct NestedDoubleMulti {
    pub tags: Vec<String>,
    pub teacher: Teacher,
}

impl SheetRecord for NestedDoubleMulti {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("NestedDoubleMulti")
                .field(FieldDecl::list(
                    "tags",
                    ValueKind::Text,
                    |d: &NestedDoubleMulti| Some(d.tags.iter().map(CellValue::from).collect()),
                ))
                .field(FieldDecl::nested::<Teacher, _>(
                    "teacher",
                    |d: &NestedDoubleMulti| Some(&d.teacher),
                )),
        )
    }
}

pub struct Node {
    pub next: Option<Box<Node>>,
}

impl SheetRecord for Node {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("Node")
                .field(FieldDecl::nested::<Node, _>("next", |n: &Node| n.next.as_deref())),
        )
    }
}

pub struct Unregistered;

impl SheetRecord for Unregistered {}

pub struct UnregisteredHolder {
    pub inner: Unregistered,
}

impl SheetRecord for UnregisteredHolder {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(SheetDecl::new("Holder").field(FieldDecl::nested::<Unregistered, _>(
            "inner",
            |h: &UnregisteredHolder| Some(&h.inner),
        )))
    }
}

pub struct NoAccessor;

impl SheetRecord for NoAccessor {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(SheetDecl::new("NoAccessor").field(FieldDecl::new("ghost", ValueKind::Text)))
    }
}

pub struct BadTransform {
    pub code: String,
}

impl SheetRecord for BadTransform {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("BadTransform").field(
                FieldDecl::scalar("code", ValueKind::Text, |b: &BadTransform| {
                    CellValue::from(&b.code)
                })
                .transform::<IntegerToText>(),
            ),
        )
    }
}

pub struct NoLabels {
    pub code: String,
}

impl SheetRecord for NoLabels {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("NoLabels").field(
                FieldDecl::scalar("code", ValueKind::Text, |n: &NoLabels| {
                    CellValue::from(&n.code)
                })
                .labels(Vec::<String>::new()),
            ),
        )
    }
}

pub struct Hollow;

impl SheetRecord for Hollow {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(SheetDecl::new("Hollow"))
    }
}

pub struct HollowHolder {
    pub hollow: Hollow,
}

impl SheetRecord for HollowHolder {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(SheetDecl::new("HollowHolder").field(FieldDecl::nested::<Hollow, _>(
            "hollow",
            |h: &HollowHolder| Some(&h.hollow),
        )))
    }
}

/// Nested field whose accessor was replaced by a scalar reader.
pub struct MisreadNested {
    pub mentor: Colleague,
}

impl SheetRecord for MisreadNested {
    fn sheet_decl() -> Option<SheetDecl<Self>> {
        Some(
            SheetDecl::new("MisreadNested").field(
                FieldDecl::nested::<Colleague, _>("mentor", |m: &MisreadNested| Some(&m.mentor))
                    .read(|m: &MisreadNested| CellValue::from(&m.mentor.name)),
            ),
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
