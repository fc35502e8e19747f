//! News provider port.

use crate::domain::error::DataError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub query: String,
    pub language: String,
    pub sort_by: String,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    pub title: Option<String>,
}

pub trait NewsPort: Send + Sync {
    fn search(&self, query: &NewsQuery) -> Result<Vec<Headline>, DataError>;
}
