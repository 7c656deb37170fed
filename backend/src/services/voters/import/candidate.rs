use super::decode::{Cell, SheetRow};

/// The four administrative tables a voter row may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Constituency,
    Block,
    Booth,
    Part,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::Constituency,
        ReferenceKind::Block,
        ReferenceKind::Booth,
        ReferenceKind::Part,
    ];

    /// Spreadsheet column, also the `voters` column.
    pub fn column(self) -> &'static str {
        match self {
            ReferenceKind::Constituency => "constituency_id",
            ReferenceKind::Block => "block_id",
            ReferenceKind::Booth => "booth_id",
            ReferenceKind::Part => "part_id",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Constituency => "constituencies",
            ReferenceKind::Block => "blocks",
            ReferenceKind::Booth => "booths",
            ReferenceKind::Part => "parts",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A non-blank foreign identifier cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignId {
    Id(i64),
    /// The cell could not be read as a whole number; holds the raw text.
    Malformed(String),
}

impl ForeignId {
    fn from_cell(cell: &Cell) -> Self {
        match cell.to_integer() {
            Some(id) => ForeignId::Id(id),
            None => ForeignId::Malformed(cell.to_text()),
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            ForeignId::Id(id) => Some(*id),
            ForeignId::Malformed(_) => None,
        }
    }
}

/// A spreadsheet row read as a voter, before any validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub row_number: usize,
    pub voter_id: Option<String>,
    pub name: Option<String>,
    references: [Option<ForeignId>; 4],
    pub father_husband_name: Option<String>,
    pub photo: Option<String>,
    /// Raw age cell; checked by the validator.
    pub age: Option<Cell>,
    pub gender: Option<String>,
    pub house_no: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub polling_station: Option<String>,
    pub notes: Option<String>,
}

impl Candidate {
    pub fn from_row(row: &SheetRow) -> Self {
        let text = |column: &str| row.get(column).map(Cell::to_text);
        let references =
            ReferenceKind::ALL.map(|kind| row.get(kind.column()).map(ForeignId::from_cell));

        Self {
            row_number: row.row_number,
            voter_id: text("voter_id"),
            name: text("name"),
            references,
            father_husband_name: text("father_husband_name"),
            photo: text("photo"),
            age: row.get("age").cloned(),
            gender: text("gender"),
            house_no: text("house_no"),
            address: text("address"),
            phone: text("phone"),
            email: text("email"),
            polling_station: text("polling_station"),
            notes: text("notes"),
        }
    }

    pub fn reference(&self, kind: ReferenceKind) -> Option<&ForeignId> {
        self.references[kind.index()].as_ref()
    }
}
