//! Two-phase space → note → comment graph builder.
//!
//! # Responsibility
//! - Turn the three flat source row sets into one owned `Hierarchy`.
//!
//! # Invariants
//! - Phase 1 (load) puts every row into the arena and indexes notes and
//!   spaces by id before phase 2 (link) resolves any reference.
//! - Comments are stored oldest-first: each comment, visited in the
//!   newest-first fetch order, is prepended to its parent's list.
//! - A note appears at most once per space and once per linked space.
//! - Unresolvable parent or space ids are fatal; nothing is fabricated.

use crate::model::entry::{
    Entry, EntryId, EntryIndex, LinkRow, NoteRow, Space, SpaceId, SpaceRow,
};
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Data-integrity errors raised while linking source rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A comment references a parent id that is not a loaded note.
    MissingParentNote {
        comment_id: EntryId,
        parent_id: EntryId,
    },
    /// A link references a space id that is not defined.
    MissingSpace { note_id: EntryId, space_id: SpaceId },
    /// Two top-level notes share one id.
    DuplicateNoteId(EntryId),
    /// Two spaces share one id.
    DuplicateSpaceId(SpaceId),
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingParentNote {
                comment_id,
                parent_id,
            } => write!(
                f,
                "comment {comment_id} references missing parent note {parent_id}"
            ),
            Self::MissingSpace { note_id, space_id } => write!(
                f,
                "note {note_id} is linked to missing space {space_id}"
            ),
            Self::DuplicateNoteId(id) => write!(f, "duplicate note id {id}"),
            Self::DuplicateSpaceId(id) => write!(f, "duplicate space id {id}"),
        }
    }
}

impl Error for BuildError {}

/// Fully linked export graph.
///
/// Owns every entry in one arena; spaces and notes refer to entries through
/// `EntryIndex` handles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    entries: Vec<Entry>,
    notes: Vec<EntryIndex>,
    comment_count: usize,
    spaces: Vec<Space>,
}

impl Hierarchy {
    /// Spaces in source row order.
    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    /// Resolves one arena handle.
    ///
    /// Handles are only produced by the builder for this hierarchy, so
    /// lookups are always in bounds.
    pub fn entry(&self, index: EntryIndex) -> &Entry {
        &self.entries[index.0]
    }

    /// Top-level notes in fetch order, linked or not.
    pub fn notes(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.notes.iter().map(|index| self.entry(*index))
    }

    /// Notes of one space, in the space's order.
    pub fn space_notes<'a>(&'a self, space: &'a Space) -> impl Iterator<Item = &'a Entry> + 'a {
        space.notes.iter().map(|index| self.entry(*index))
    }

    /// Comments of one note, oldest first.
    pub fn comments<'a>(&'a self, note: &'a Entry) -> impl Iterator<Item = &'a Entry> + 'a {
        note.comments.iter().map(|index| self.entry(*index))
    }

    pub fn space_count(&self) -> usize {
        self.spaces.len()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn comment_count(&self) -> usize {
        self.comment_count
    }
}

/// Builds the export graph from the three source row sets.
///
/// `notes_raw` is expected newest-first (`created DESC`); the relative order
/// of every input is preserved in the output.
///
/// # Errors
/// - `MissingParentNote` when a comment's parent is not a loaded note.
/// - `MissingSpace` when a link names an unknown space id.
/// - `DuplicateNoteId` / `DuplicateSpaceId` when ids collide.
pub fn build_hierarchy(
    notes_raw: Vec<NoteRow>,
    spaces_raw: Vec<SpaceRow>,
    links_raw: &[LinkRow],
) -> Result<Hierarchy, BuildError> {
    let started_at = Instant::now();
    let loaded = LoadedRows::load(notes_raw, spaces_raw)?;
    let hierarchy = loaded.link(links_raw)?;
    info!(
        "event=hierarchy_build module=hierarchy status=ok spaces={} notes={} comments={} duration_ms={}",
        hierarchy.space_count(),
        hierarchy.note_count(),
        hierarchy.comment_count(),
        started_at.elapsed().as_millis()
    );
    Ok(hierarchy)
}

/// Phase 1 output: flat arena plus id indexes, no links yet.
struct LoadedRows {
    entries: Vec<Entry>,
    notes: Vec<EntryIndex>,
    comments: Vec<EntryIndex>,
    note_by_id: HashMap<EntryId, EntryIndex>,
    spaces: Vec<Space>,
    space_by_id: HashMap<SpaceId, usize>,
}

impl LoadedRows {
    fn load(notes_raw: Vec<NoteRow>, spaces_raw: Vec<SpaceRow>) -> Result<Self, BuildError> {
        let mut entries = Vec::with_capacity(notes_raw.len());
        let mut notes = Vec::new();
        let mut comments = Vec::new();
        let mut note_by_id = HashMap::new();

        for row in notes_raw {
            let index = EntryIndex(entries.len());
            if row.is_note() {
                if note_by_id.insert(row.id, index).is_some() {
                    return Err(BuildError::DuplicateNoteId(row.id));
                }
                notes.push(index);
            } else {
                comments.push(index);
            }
            entries.push(Entry::from(row));
        }

        let mut spaces = Vec::with_capacity(spaces_raw.len());
        let mut space_by_id = HashMap::new();
        for row in spaces_raw {
            if space_by_id.insert(row.id, spaces.len()).is_some() {
                return Err(BuildError::DuplicateSpaceId(row.id));
            }
            spaces.push(Space::from(row));
        }

        Ok(Self {
            entries,
            notes,
            comments,
            note_by_id,
            spaces,
            space_by_id,
        })
    }

    fn link(mut self, links_raw: &[LinkRow]) -> Result<Hierarchy, BuildError> {
        self.attach_comments()?;
        let spaces_by_note = self.resolve_links(links_raw)?;

        for note_index in &self.notes {
            let note_id = self.entries[note_index.0].id;
            if let Some(space_positions) = spaces_by_note.get(&note_id) {
                for position in space_positions {
                    self.spaces[*position].notes.push(*note_index);
                }
            }
        }

        Ok(Hierarchy {
            entries: self.entries,
            notes: self.notes,
            comment_count: self.comments.len(),
            spaces: self.spaces,
        })
    }

    fn attach_comments(&mut self) -> Result<(), BuildError> {
        let mut attached: HashMap<EntryIndex, Vec<EntryIndex>> = HashMap::new();
        for comment_index in &self.comments {
            let comment = &self.entries[comment_index.0];
            let parent_index =
                self.note_by_id
                    .get(&comment.parent_id)
                    .ok_or(BuildError::MissingParentNote {
                        comment_id: comment.id,
                        parent_id: comment.parent_id,
                    })?;
            attached.entry(*parent_index).or_default().push(*comment_index);
        }

        // Collected newest-first; reversing equals prepending one by one.
        for (parent_index, mut comment_indexes) in attached {
            comment_indexes.reverse();
            self.entries[parent_index.0].comments = comment_indexes;
        }
        Ok(())
    }

    fn resolve_links(
        &self,
        links_raw: &[LinkRow],
    ) -> Result<HashMap<EntryId, Vec<usize>>, BuildError> {
        let mut spaces_by_note: HashMap<EntryId, Vec<usize>> = HashMap::new();
        let mut seen = HashSet::new();
        let mut skipped = 0usize;

        for link in links_raw {
            let position =
                *self
                    .space_by_id
                    .get(&link.space_id)
                    .ok_or(BuildError::MissingSpace {
                        note_id: link.note_id,
                        space_id: link.space_id,
                    })?;
            if !self.note_by_id.contains_key(&link.note_id) {
                skipped += 1;
                continue;
            }
            if seen.insert((link.note_id, position)) {
                spaces_by_note.entry(link.note_id).or_default().push(position);
            }
        }

        if skipped > 0 {
            warn!(
                "event=hierarchy_link module=hierarchy status=skipped reason=unknown_note links={}",
                skipped
            );
        }
        Ok(spaces_by_note)
    }
}
