use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{Comment, Movie, Rating, Role, User},
};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

// Legacy clients send "all" for "no value".
const UNSET: &str = "all";

/// ListParams
///
/// Raw pagination/sorting/search query parameters shared by every list endpoint.
/// Nothing here is trusted until `validate` has checked it against the entity's allow-list.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Offset of the first item (default 0).
    pub start: Option<i64>,
    /// Page size, 1..=100 (default 10).
    pub limit: Option<i64>,
    /// Field to sort by; must be one of the entity's sortable fields.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default `desc`).
    pub order: Option<String>,
    /// Case-insensitive substring search.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// ListQuery
///
/// A validated listing request. `sort_by` always points into a static allow-list,
/// so it is safe to splice into SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub start: i64,
    pub limit: i64,
    pub sort_by: &'static str,
    pub order: SortOrder,
    pub search: Option<String>,
}

fn provided(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(UNSET))
}

impl ListParams {
    /// Checks every parameter against `T`'s sortable fields and fills in defaults.
    pub fn validate<T: Listable>(&self) -> Result<ListQuery> {
        let start = self.start.unwrap_or(0);
        if start < 0 {
            return Err(AppError::BadRequest("start must not be negative".into()));
        }

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }

        let sort_by = match provided(&self.sort_by) {
            None => "created_at",
            Some(field) => T::SORTABLE
                .iter()
                .copied()
                .find(|f| *f == field)
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "cannot sort by '{field}'; expected one of: {}",
                        T::SORTABLE.join(", ")
                    ))
                })?,
        };

        let order = match provided(&self.order).map(str::to_ascii_lowercase).as_deref() {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "order must be 'asc' or 'desc', got '{other}'"
                )));
            }
        };

        let search = provided(&self.search).map(str::to_string);

        Ok(ListQuery {
            start,
            limit,
            sort_by,
            order,
            search,
        })
    }
}

impl ListQuery {
    /// Sorts `items` by the requested field, ties broken by id ascending, and returns
    /// the total count together with the requested page.
    pub fn paginate<T: Listable>(&self, mut items: Vec<T>) -> (i64, Vec<T>) {
        items.sort_by(|a, b| {
            let primary = a.sort_key(self.sort_by).cmp(&b.sort_key(self.sort_by));
            let primary = match self.order {
                SortOrder::Asc => primary,
                SortOrder::Desc => primary.reverse(),
            };
            primary.then_with(|| a.id().cmp(&b.id()))
        });
        let total = items.len() as i64;
        let page = items
            .into_iter()
            .skip(self.start as usize)
            .take(self.limit as usize)
            .collect();
        (total, page)
    }

    /// Lowercased search needle, if any.
    pub fn needle(&self) -> Option<String> {
        self.search.as_ref().map(|s| s.to_lowercase())
    }
}

/// Extra filter for `GET /movies`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovieFilter {
    /// Release year; `all` or empty disables the filter.
    pub year: Option<String>,
}

impl MovieFilter {
    pub fn year(&self) -> Result<Option<i32>> {
        parse_filter("year", &self.year)
    }
}

/// Extra filter for the comment and rating listings.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovieIdFilter {
    /// Restrict to one movie; `all` or empty disables the filter.
    pub movie_id: Option<String>,
}

impl MovieIdFilter {
    pub fn movie_id(&self) -> Result<Option<Uuid>> {
        parse_filter("movie_id", &self.movie_id)
    }
}

fn parse_filter<T: std::str::FromStr>(name: &str, raw: &Option<String>) -> Result<Option<T>> {
    provided(raw)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| AppError::BadRequest(format!("invalid {name} '{value}'")))
        })
        .transpose()
}

/// Value a record exposes for one of its sortable fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Text(String),
    Int(i64),
    Time(DateTime<Utc>),
}

/// Listable
///
/// Explicit per-entity field list used for sort validation and in-memory ordering.
pub trait Listable {
    const SORTABLE: &'static [&'static str];

    fn id(&self) -> Uuid;

    fn sort_key(&self, field: &str) -> SortKey;
}

impl Listable for User {
    const SORTABLE: &'static [&'static str] = &["email", "created_at", "updated_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "email" => SortKey::Text(self.email.to_lowercase()),
            "updated_at" => SortKey::Time(self.updated_at),
            _ => SortKey::Time(self.created_at),
        }
    }
}

impl Listable for Role {
    const SORTABLE: &'static [&'static str] = &["name", "created_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "name" => SortKey::Text(self.name.to_lowercase()),
            _ => SortKey::Time(self.created_at),
        }
    }
}

impl Listable for Movie {
    const SORTABLE: &'static [&'static str] = &["title", "year", "created_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "title" => SortKey::Text(self.title.to_lowercase()),
            "year" => SortKey::Int(self.year as i64),
            _ => SortKey::Time(self.created_at),
        }
    }
}

impl Listable for Comment {
    const SORTABLE: &'static [&'static str] = &["created_at", "updated_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "updated_at" => SortKey::Time(self.updated_at),
            _ => SortKey::Time(self.created_at),
        }
    }
}

impl Listable for Rating {
    const SORTABLE: &'static [&'static str] = &["score", "created_at", "updated_at"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "score" => SortKey::Int(self.score as i64),
            "updated_at" => SortKey::Time(self.updated_at),
            _ => SortKey::Time(self.created_at),
        }
    }
}
