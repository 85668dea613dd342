//! Entry/space domain model.
//!
//! # Responsibility
//! - Define flat row records read from the source tables.
//! - Define the graph nodes (`Entry`, `Space`) produced by the builder.
//!
//! # Invariants
//! - An entry is a note iff `parent_id == ROOT_PARENT_ID` at load time.
//! - Comments never own comments; only notes carry a `comments` list.
//! - `Space::notes` and `Entry::comments` hold arena handles, never owned
//!   entries.

/// Source-table identifier for notes and comments (`notes._id`).
pub type EntryId = i64;

/// Source-table identifier for spaces (`streams._id`).
pub type SpaceId = i64;

/// Sentinel `parent_id` marking a top-level note.
pub const ROOT_PARENT_ID: EntryId = -1;

/// Handle into the entry arena owned by `Hierarchy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryIndex(pub(crate) usize);

/// One row of `notes`, notes and comments undifferentiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    /// `notes._id`.
    pub id: EntryId,
    /// `notes.parent_id`; `ROOT_PARENT_ID` for top-level notes.
    pub parent_id: EntryId,
    /// `notes.created`, epoch milliseconds.
    pub created_at: i64,
    /// `notes.timestamp`, epoch milliseconds.
    pub modified_at: i64,
    /// `notes.text`.
    pub text: String,
}

impl NoteRow {
    /// Returns whether this row is a top-level note rather than a comment.
    pub fn is_note(&self) -> bool {
        self.parent_id == ROOT_PARENT_ID
    }
}

/// One row of `streams`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceRow {
    pub id: SpaceId,
    pub name: String,
}

/// One row of `notes_streams`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRow {
    pub note_id: EntryId,
    pub space_id: SpaceId,
}

/// A loaded note or comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub parent_id: EntryId,
    pub text: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub modified_at: i64,
    /// Oldest-first comment handles. Always empty for comments.
    pub comments: Vec<EntryIndex>,
}

impl Entry {
    pub fn is_note(&self) -> bool {
        self.parent_id == ROOT_PARENT_ID
    }
}

impl From<NoteRow> for Entry {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            parent_id: row.parent_id,
            text: row.text,
            created_at: row.created_at,
            modified_at: row.modified_at,
            comments: Vec::new(),
        }
    }
}

/// Named grouping of notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    /// Note handles in note load order.
    pub notes: Vec<EntryIndex>,
}

impl From<SpaceRow> for Space {
    fn from(row: SpaceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            notes: Vec::new(),
        }
    }
}
