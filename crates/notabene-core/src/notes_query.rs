//! Parameters for the filtered note listing.
//!
//! Normalization happens here so that every storage backend sees the same
//! fallbacks: unknown sort fields become `updated_at`, unknown orders become
//! descending, blank searches are dropped and duplicate tag ids collapse.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::sort::SortOrder;

/// Sortable note fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteSortField {
    CreatedAt,
    #[default]
    UpdatedAt,
    /// Case-insensitive.
    Title,
}

impl NoteSortField {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("created_at") => NoteSortField::CreatedAt,
            Some("updated_at") => NoteSortField::UpdatedAt,
            Some("title") => NoteSortField::Title,
            _ => NoteSortField::default(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteSortField::CreatedAt => "created_at",
            NoteSortField::UpdatedAt => "updated_at",
            NoteSortField::Title => "title",
        }
    }
}

/// Listing request for notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteListQuery {
    /// Case-insensitive substring matched against title or content.
    pub search: Option<String>,
    /// Required tags; a note must carry all of them.
    pub tag_ids: BTreeSet<Uuid>,
    pub sort: NoteSortField,
    pub order: SortOrder,
    pub archived: bool,
}

impl Default for NoteListQuery {
    fn default() -> Self {
        Self {
            search: None,
            tag_ids: BTreeSet::new(),
            sort: NoteSortField::UpdatedAt,
            order: SortOrder::Desc,
            archived: false,
        }
    }
}

impl NoteListQuery {
    /// Build a query from raw request values.
    pub fn from_params(
        search: Option<&str>,
        tag_ids: impl IntoIterator<Item = Uuid>,
        sort: Option<&str>,
        order: Option<&str>,
        archived: bool,
    ) -> Self {
        Self {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            tag_ids: tag_ids.into_iter().collect(),
            sort: NoteSortField::parse(sort),
            order: SortOrder::parse_or(order, SortOrder::Desc),
            archived,
        }
    }

    pub fn with_tags(mut self, tag_ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.tag_ids.extend(tag_ids);
        self
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.search = Some(search.to_string());
        self
    }

    pub fn sorted_by(mut self, sort: NoteSortField, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let q = NoteListQuery::from_params(None, [], None, None, false);
        assert_eq!(q, NoteListQuery::default());
    }

    #[test]
    fn test_invalid_sort_field_falls_back_to_updated_at() {
        let q = NoteListQuery::from_params(None, [], Some("content; DROP TABLE"), None, false);
        assert_eq!(q.sort, NoteSortField::UpdatedAt);
    }

    #[test]
    fn test_unknown_order_defaults_to_desc() {
        let q = NoteListQuery::from_params(None, [], Some("title"), Some("up"), false);
        assert_eq!(q.sort, NoteSortField::Title);
        assert_eq!(q.order, SortOrder::Desc);

        let q = NoteListQuery::from_params(None, [], Some("title"), Some("asc"), false);
        assert_eq!(q.order, SortOrder::Asc);
    }

    #[test]
    fn test_blank_search_is_dropped() {
        let q = NoteListQuery::from_params(Some("   "), [], None, None, false);
        assert!(q.search.is_none());

        let q = NoteListQuery::from_params(Some("  rust "), [], None, None, false);
        assert_eq!(q.search.as_deref(), Some("rust"));
    }

    #[test]
    fn test_duplicate_tag_ids_collapse() {
        let id = Uuid::now_v7();
        let q = NoteListQuery::from_params(None, [id, id], None, None, false);
        assert_eq!(q.tag_ids.len(), 1);
    }
}
