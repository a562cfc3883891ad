use chrono::Utc;
use movie_admin::{
    AppError,
    listing::{DEFAULT_LIMIT, ListParams, MovieFilter, MovieIdFilter, SortOrder},
    models::{Movie, Rating, User},
};
use uuid::Uuid;

fn params(pairs: &[(&str, &str)]) -> ListParams {
    let mut p = ListParams::default();
    for (key, value) in pairs {
        let value = Some(value.to_string());
        match *key {
            "start" => p.start = value.and_then(|v| v.parse().ok()),
            "limit" => p.limit = value.and_then(|v| v.parse().ok()),
            "sort_by" => p.sort_by = value,
            "order" => p.order = value,
            "search" => p.search = value,
            other => panic!("unknown parameter {other}"),
        }
    }
    p
}

#[test]
fn test_defaults() {
    let query = ListParams::default().validate::<Movie>().unwrap();
    assert_eq!(query.start, 0);
    assert_eq!(query.limit, DEFAULT_LIMIT);
    assert_eq!(query.sort_by, "created_at");
    assert_eq!(query.order, SortOrder::Desc);
    assert_eq!(query.search, None);
}

#[test]
fn test_all_means_unset() {
    let query = params(&[("sort_by", "all"), ("order", "all"), ("search", "all")])
        .validate::<Movie>()
        .unwrap();
    assert_eq!(query.sort_by, "created_at");
    assert_eq!(query.order, SortOrder::Desc);
    assert_eq!(query.search, None);

    let blank = params(&[("search", "   ")]).validate::<Movie>().unwrap();
    assert_eq!(blank.search, None);
}

#[test]
fn test_bounds_on_start_and_limit() {
    for bad in [
        params(&[("start", "-1")]),
        params(&[("limit", "0")]),
        params(&[("limit", "101")]),
    ] {
        assert!(matches!(
            bad.validate::<Movie>(),
            Err(AppError::BadRequest(_))
        ));
    }

    let max = params(&[("limit", "100")]).validate::<Movie>().unwrap();
    assert_eq!(max.limit, 100);
}

#[test]
fn test_sort_field_allow_list_is_per_entity() {
    assert_eq!(
        params(&[("sort_by", "year")])
            .validate::<Movie>()
            .unwrap()
            .sort_by,
        "year"
    );
    assert_eq!(
        params(&[("sort_by", "score")])
            .validate::<Rating>()
            .unwrap()
            .sort_by,
        "score"
    );

    // Valid elsewhere, not here.
    assert!(matches!(
        params(&[("sort_by", "score")]).validate::<Movie>(),
        Err(AppError::BadRequest(_))
    ));
    // Never sortable, and never spliced into SQL.
    assert!(matches!(
        params(&[("sort_by", "password_hash")]).validate::<User>(),
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        params(&[("sort_by", "title; DROP TABLE movies")]).validate::<Movie>(),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn test_order_is_case_insensitive() {
    let asc = params(&[("order", "ASC")]).validate::<Movie>().unwrap();
    assert_eq!(asc.order, SortOrder::Asc);
    assert_eq!(asc.order.as_sql(), "ASC");

    assert!(matches!(
        params(&[("order", "sideways")]).validate::<Movie>(),
        Err(AppError::BadRequest(_))
    ));
}

fn movie(title: &str, year: i32) -> Movie {
    Movie {
        id: Uuid::new_v4(),
        title: title.to_string(),
        year,
        ..Default::default()
    }
}

#[test]
fn test_paginate_pages_are_disjoint_and_contiguous() {
    // Same created_at everywhere: only the id tie-break orders them.
    let now = Utc::now();
    let movies: Vec<Movie> = (0..25)
        .map(|i| Movie {
            created_at: now,
            ..movie(&format!("Movie {i:02}"), 2000)
        })
        .collect();

    let first = params(&[("start", "0"), ("limit", "10")])
        .validate::<Movie>()
        .unwrap();
    let second = params(&[("start", "10"), ("limit", "10")])
        .validate::<Movie>()
        .unwrap();
    let everything = params(&[("limit", "100")]).validate::<Movie>().unwrap();

    let (total, page1) = first.paginate(movies.clone());
    let (_, page2) = second.paginate(movies.clone());
    let (_, all) = everything.paginate(movies);

    assert_eq!(total, 25);
    assert_eq!(page1.len(), 10);
    assert_eq!(page2.len(), 10);

    let ids = |v: &[Movie]| v.iter().map(|m| m.id).collect::<Vec<_>>();
    assert_eq!(ids(&page1), ids(&all[..10]));
    assert_eq!(ids(&page2), ids(&all[10..20]));
    assert!(ids(&page1).iter().all(|id| !ids(&page2).contains(id)));
}

#[test]
fn test_paginate_sorts_by_requested_field() {
    let movies = vec![movie("b", 1999), movie("C", 2010), movie("a", 2005)];

    let by_title = params(&[("sort_by", "title"), ("order", "asc")])
        .validate::<Movie>()
        .unwrap();
    let (_, sorted) = by_title.paginate(movies.clone());
    let titles: Vec<_> = sorted.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, ["a", "b", "C"]);

    let by_year = params(&[("sort_by", "year")]).validate::<Movie>().unwrap();
    let (_, sorted) = by_year.paginate(movies);
    let years: Vec<_> = sorted.iter().map(|m| m.year).collect();
    assert_eq!(years, [2010, 2005, 1999]);
}

#[test]
fn test_page_past_the_end_is_empty() {
    let query = params(&[("start", "50")]).validate::<Movie>().unwrap();
    let (total, page) = query.paginate(vec![movie("only", 2000)]);
    assert_eq!(total, 1);
    assert!(page.is_empty());
}

#[test]
fn test_extra_filters() {
    let year = |v: &str| MovieFilter {
        year: Some(v.to_string()),
    };
    assert_eq!(year("2020").year().unwrap(), Some(2020));
    assert_eq!(year("all").year().unwrap(), None);
    assert_eq!(MovieFilter::default().year().unwrap(), None);
    assert!(matches!(year("twenty").year(), Err(AppError::BadRequest(_))));

    let id = Uuid::new_v4();
    let filter = MovieIdFilter {
        movie_id: Some(id.to_string()),
    };
    assert_eq!(filter.movie_id().unwrap(), Some(id));
    let bad = MovieIdFilter {
        movie_id: Some("not-a-uuid".into()),
    };
    assert!(matches!(bad.movie_id(), Err(AppError::BadRequest(_))));
}
