//! Declarative column attributes and the ordered schema they form.

/// A single column's indexing and validation attributes. Built with the
/// chained `with_*` methods rather than public field construction, so a
/// schema reads as a short list of declarations at the call site.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub primary: bool,
    pub unique: bool,
    pub sortable: bool,
    pub nullable: bool,
    pub partial: bool,
    pub prefixed: bool,
    pub multiple: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary: false,
            unique: false,
            sortable: false,
            nullable: false,
            partial: false,
            prefixed: false,
            multiple: false,
            min: None,
            max: None,
        }
    }

    /// The implicit `_id` column: primary, never indexed.
    pub fn primary(name: impl Into<String>) -> Self {
        let mut c = Self::new(name);
        c.primary = true;
        c
    }

    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn with_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_partial(mut self) -> Self {
        self.partial = true;
        self
    }

    pub fn with_prefixed(mut self) -> Self {
        self.prefixed = true;
        self
    }

    pub fn with_multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }
}

/// An ordered list of columns plus a name and version, addressed by
/// column name. `_id` is implicit and is expected as the schema's first
/// [`Column::primary`] entry.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub version: u32,
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(name: impl Into<String>, version: u32, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            version,
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns that get a secondary index, i.e. every column but `_id`.
    pub fn indexed_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_requested_attributes_only() {
        let c = Column::new("name").with_unique().with_sortable().with_max(5.0);
        assert!(c.unique);
        assert!(c.sortable);
        assert!(!c.nullable);
        assert_eq!(c.max, Some(5.0));
        assert_eq!(c.min, None);
    }

    #[test]
    fn schema_looks_up_by_name() {
        let schema = Schema::new(
            "users",
            1,
            vec![Column::primary("_id"), Column::new("name").with_unique()],
        );
        assert!(schema.column("name").unwrap().unique);
        assert!(schema.column("missing").is_none());
        assert_eq!(schema.indexed_columns().count(), 1);
    }
}
