use crate::error::CoreError;

/// Ordered column names from row 1 of a sheet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderRow {
    names: Vec<String>,
}

impl HeaderRow {
    pub fn new(names: Vec<String>) -> Self {
        HeaderRow { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// 0-indexed position of the first column with this name
    pub fn index_of(&self, name: &str) -> Result<usize, CoreError> {
        column_index(&self.names, name)
    }

    /// Like [`HeaderRow::index_of`], but `None` both when no name is given
    /// and when the name is absent
    pub fn optional_index_of(&self, name: Option<&str>) -> Option<usize> {
        name.and_then(|name| self.names.iter().position(|n| n == name))
    }
}

impl From<Vec<String>> for HeaderRow {
    fn from(names: Vec<String>) -> Self {
        HeaderRow::new(names)
    }
}

/// 0-indexed position of the first header equal to `name`
pub fn column_index(headers: &[String], name: &str) -> Result<usize, CoreError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| CoreError::InvalidColumn(name.to_string()))
}
