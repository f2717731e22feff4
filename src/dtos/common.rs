//! Common DTOs - Wrapper di risposta condivisi

use serde::Serialize;

/// Pagina di risultati con i metadati di navigazione
#[derive(Serialize, Debug)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        Self {
            items,
            total,
            page,
            limit,
            has_next: total > page.saturating_mul(limit),
            has_prev: page > 1,
        }
    }
}
