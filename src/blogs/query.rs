use serde::Deserialize;

/// `GET /blogs` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub tag: Option<String>,
    pub sort: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogFilter {
    /// Exact match against one element of `tags`.
    pub tag: Option<String>,
    /// Case-insensitive literal substring of title or description.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
}

impl SortField {
    /// SQL sort key. Titles compare lowercased by code point, the same order
    /// the in-process store uses.
    pub fn order_expr(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => r#"lower(title) COLLATE "C""#,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlogSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl BlogSort {
    /// Parses `field:direction`, e.g. `title:asc`. Unknown fields fall back to
    /// `createdAt`, anything but `asc` sorts descending.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        let (field, direction) = raw.split_once(':').unwrap_or((raw, ""));
        let field = match field.trim() {
            "updatedAt" | "updated_at" => SortField::UpdatedAt,
            "title" => SortField::Title,
            _ => SortField::CreatedAt,
        };
        let direction = if direction.trim().eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        };
        Self { field, direction }
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

impl ListQuery {
    pub fn into_parts(self) -> (BlogFilter, BlogSort) {
        let sort = BlogSort::parse(self.sort.as_deref());
        let filter = BlogFilter {
            tag: non_blank(self.tag),
            search: non_blank(self.search),
        };
        (filter, sort)
    }
}
