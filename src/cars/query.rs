//! Search/filter parameters for the public listing search.
//!
//! Raw query-string values arrive as [`SearchParams`] and are checked once
//! into a [`CarQuery`]. The same `CarQuery` drives both the SQL predicate
//! (`push_sql`) and the in-memory predicate (`matches` / `compare`), so the
//! two stores agree on what a search returns.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use utoipa::IntoParams;

use crate::cars::repo_types::Car;
use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 9;
pub const MAX_PAGE_SIZE: i64 = 50;

/// Query string of `GET /car/get`, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    /// Comma-separated; every listed tag must be present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    Title,
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "created_at" => Ok(SortKey::CreatedAt),
            "title" => Ok(SortKey::Title),
            other => Err(AppError::Validation(format!("Unsupported sort key: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(AppError::Validation(format!("Unsupported sort order: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarQuery {
    /// Lower-cased free-text term; `None` matches everything.
    pub term: Option<String>,
    /// Lower-cased required tags; empty means no tag filter.
    pub tags: Vec<String>,
    pub offer_only: bool,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: i64,
    pub start_index: i64,
}

impl Default for CarQuery {
    fn default() -> Self {
        Self {
            term: None,
            tags: Vec::new(),
            offer_only: false,
            sort: SortKey::default(),
            order: SortOrder::default(),
            limit: DEFAULT_PAGE_SIZE,
            start_index: 0,
        }
    }
}

impl TryFrom<SearchParams> for CarQuery {
    type Error = AppError;

    fn try_from(p: SearchParams) -> Result<Self, Self::Error> {
        let term = p
            .search_term
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        let mut tags: Vec<String> = Vec::new();
        for tag in p.tags.as_deref().unwrap_or_default().split(',') {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let sort = match p.sort.as_deref() {
            Some(s) if !s.is_empty() => s.parse()?,
            _ => SortKey::default(),
        };
        let order = match p.order.as_deref() {
            Some(s) if !s.is_empty() => s.parse()?,
            _ => SortOrder::default(),
        };

        let start_index = p.start_index.unwrap_or(0);
        if start_index < 0 {
            return Err(AppError::Validation("startIndex must not be negative".into()));
        }

        Ok(Self {
            term,
            tags,
            offer_only: p.offer.unwrap_or(false),
            sort,
            order,
            limit: p.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            start_index,
        })
    }
}

/// Escapes `LIKE` wildcards so the term is matched literally.
fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

impl CarQuery {
    /// One extra row is fetched so the caller can tell whether more exist.
    pub fn fetch_limit(&self) -> i64 {
        self.limit + 1
    }

    pub fn matches(&self, car: &Car) -> bool {
        if self.offer_only && !car.offer {
            return false;
        }
        if let Some(term) = &self.term {
            let hit = car.title.to_lowercase().contains(term)
                || car.description.to_lowercase().contains(term)
                || car.tags.iter().any(|t| t.to_lowercase().contains(term));
            if !hit {
                return false;
            }
        }
        self.tags
            .iter()
            .all(|wanted| car.tags.iter().any(|t| t.to_lowercase() == *wanted))
    }

    /// Ordering used by the in-memory store; mirrors the SQL `ORDER BY`.
    pub fn compare(&self, a: &Car, b: &Car) -> Ordering {
        let by_key = match self.sort {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        }
        .then_with(|| a.id.cmp(&b.id));
        match self.order {
            SortOrder::Asc => by_key,
            SortOrder::Desc => by_key.reverse(),
        }
    }

    /// Appends `WHERE`, `ORDER BY`, `LIMIT` and `OFFSET` to a `SELECT ... FROM cars`.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(term) = &self.term {
            let pattern = like_pattern(term);
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ")
                .push_bind(pattern)
                .push("))");
        }
        for tag in &self.tags {
            qb.push(" AND EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE lower(tag) = ")
                .push_bind(tag.clone())
                .push(")");
        }
        if self.offer_only {
            qb.push(" AND offer");
        }

        // Column names come from the enum, never from the request.
        let column = match self.sort {
            SortKey::CreatedAt => "created_at",
            SortKey::Title => "lower(title)",
        };
        let direction = match self.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        qb.push(format!(" ORDER BY {column} {direction}, id {direction}"));
        qb.push(" LIMIT ")
            .push_bind(self.fetch_limit())
            .push(" OFFSET ")
            .push_bind(self.start_index);
    }
}
