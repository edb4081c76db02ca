use fd_discovery::{
    AttributeUniverse, DataFrameSource, DiscoveryConfig, DiscoveryRun, InMemoryTable,
    SqliteSource, Strategy, TabularDataSource, Value,
};
use polars::prelude::*;
use rusqlite::Connection;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const COLUMNS: [&str; 4] = ["movieid", "genre", "runtime", "role"];

/// A slice of the movie/genre/member relation with a NULL runtime
fn rows() -> Vec<(i64, &'static str, &'static str, Option<i64>, &'static str)> {
    vec![
        (1, "tt01", "Drama", Some(95), "actor"),
        (2, "tt01", "Crime", Some(95), "actor"),
        (3, "tt02", "Drama", Some(120), "actress"),
        (4, "tt03", "Comedy", None, "actor"),
        (5, "tt03", "Comedy", None, "actor"),
        (6, "tt04", "Crime", Some(120), "self"),
    ]
}

fn memory_source() -> Arc<dyn TabularDataSource> {
    let mut table = InMemoryTable::new(COLUMNS);
    for (nid, movie, genre, runtime, role) in rows() {
        table
            .push_row_with_id(
                fd_discovery::partition::RowId(nid),
                vec![movie.into(), genre.into(), Value::from(runtime), role.into()],
            )
            .unwrap();
    }
    Arc::new(table)
}

fn frame_source() -> Arc<dyn TabularDataSource> {
    let rows = rows();
    let frame = df! [
        "nid" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        "movieid" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        "genre" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        "runtime" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
        "role" => rows.iter().map(|r| r.4).collect::<Vec<_>>()
    ]
    .unwrap();
    Arc::new(DataFrameSource::new(frame, Some("nid")).unwrap())
}

fn sqlite_source() -> Arc<dyn TabularDataSource> {
    let db = Connection::open_in_memory().unwrap();
    db.execute(
        "CREATE TABLE normalization (\
         nid INTEGER PRIMARY KEY, movieid TEXT, genre TEXT, runtime INT, role TEXT)",
        [],
    )
    .unwrap();
    for (nid, movie, genre, runtime, role) in rows() {
        db.execute(
            "INSERT INTO normalization VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![nid, movie, genre, runtime, role],
        )
        .unwrap();
    }
    Arc::new(SqliteSource::from_connection(db, "normalization", Some("nid")).unwrap())
}

fn discover(source: Arc<dyn TabularDataSource>, strategy: Strategy) -> Vec<String> {
    let universe = AttributeUniverse::new(COLUMNS).unwrap();
    DiscoveryRun::new(
        source,
        universe,
        DiscoveryConfig::new(strategy).with_max_arity(3),
    )
    .unwrap()
    .run()
    .unwrap()
    .render()
}

#[test]
fn test_backends_agree() {
    let expected = discover(memory_source(), Strategy::Naive);
    assert!(!expected.is_empty());

    for strategy in [Strategy::Naive, Strategy::Refinement] {
        assert_eq!(discover(memory_source(), strategy), expected, "memory {}", strategy);
        assert_eq!(discover(frame_source(), strategy), expected, "polars {}", strategy);
        assert_eq!(discover(sqlite_source(), strategy), expected, "sqlite {}", strategy);
    }
}

#[test]
fn test_expected_dependencies() {
    let lines = discover(sqlite_source(), Strategy::Refinement);

    // movieid fixes runtime, NULL runtimes included
    assert!(lines.contains(&"movieid --> runtime".to_string()), "{:?}", lines);
    // tt01 has two genres
    assert!(!lines.contains(&"movieid --> genre".to_string()), "{:?}", lines);
    // neither genre nor runtime alone fixes the role
    assert!(lines.contains(&"genre, runtime --> role".to_string()), "{:?}", lines);
    assert!(!lines.iter().any(|l| l == "genre --> role" || l == "runtime --> role"));
}

#[test]
fn test_raw_naive_matches_raw_refinement_on_polars() {
    let universe = AttributeUniverse::new(COLUMNS).unwrap();
    let raw = |strategy| {
        DiscoveryRun::new(
            frame_source(),
            universe.clone(),
            DiscoveryConfig::new(strategy).with_max_arity(4),
        )
        .unwrap()
        .raw_dependencies()
        .unwrap()
    };

    assert_eq!(raw(Strategy::Naive), raw(Strategy::Refinement));
}

#[test]
fn test_csv_relation() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "nid,movieid,type,startyear").unwrap();
    writeln!(file, "1,tt01,movie,1994").unwrap();
    writeln!(file, "2,tt01,movie,1994").unwrap();
    writeln!(file, "3,tt02,short,1994").unwrap();
    writeln!(file, "4,tt03,movie,2001").unwrap();
    file.flush().unwrap();

    let source = DataFrameSource::from_csv(file.path(), Some("nid")).unwrap();
    assert_eq!(source.attribute_columns(), vec!["movieid", "type", "startyear"]);

    let universe = AttributeUniverse::new(source.attribute_columns()).unwrap();
    let report = DiscoveryRun::new(
        Arc::new(source),
        universe,
        DiscoveryConfig::new(Strategy::Refinement),
    )
    .unwrap()
    .run()
    .unwrap();

    let lines = report.render();
    assert!(lines.contains(&"movieid --> type".to_string()), "{:?}", lines);
    assert!(lines.contains(&"movieid --> startyear".to_string()), "{:?}", lines);
    assert!(!lines.contains(&"type --> startyear".to_string()), "{:?}", lines);
    assert!(lines.contains(&"type, startyear --> movieid".to_string()), "{:?}", lines);
}

fn empty_sqlite() -> SqliteSource {
    let db = Connection::open_in_memory().unwrap();
    db.execute("CREATE TABLE t (a INT, b INT)", []).unwrap();
    SqliteSource::from_connection(db, "t", None).unwrap()
}

fn empty_frame() -> DataFrameSource {
    let frame = df! [
        "a" => Vec::<i64>::new(),
        "b" => Vec::<String>::new()
    ]
    .unwrap();
    DataFrameSource::new(frame, None).unwrap()
}

#[test]
fn test_empty_relation_is_vacuous_on_every_backend() {
    let universe = AttributeUniverse::new(empty_sqlite().columns().unwrap()).unwrap();
    assert_eq!(empty_frame().attribute_columns(), vec!["a", "b"]);

    for strategy in [Strategy::Naive, Strategy::Refinement] {
        let sources: [Arc<dyn TabularDataSource>; 3] = [
            Arc::new(empty_sqlite()),
            Arc::new(empty_frame()),
            Arc::new(InMemoryTable::new(["a", "b"])),
        ];
        for source in sources {
            let described = source.describe();
            let config = DiscoveryConfig::new(strategy);
            let report = DiscoveryRun::new(source, universe.clone(), config)
                .unwrap()
                .run()
                .unwrap();

            assert_eq!(report.stats.row_count, 0);
            assert_eq!(
                report.render(),
                vec!["a --> b", "b --> a"],
                "{} on {}",
                strategy,
                described
            );
        }
    }
}

#[test]
fn test_missing_column_is_reported() {
    let universe = AttributeUniverse::new(["movieid", "director"]).unwrap();
    for source in [memory_source(), frame_source(), sqlite_source()] {
        let config = DiscoveryConfig::new(Strategy::Naive);
        let err = DiscoveryRun::new(source, universe.clone(), config)
            .unwrap()
            .run()
            .unwrap_err();
        assert!(
            matches!(err, fd_discovery::FdError::UnknownAttribute(ref name) if name == "director"),
            "{}",
            err
        );
    }

    // the refinement path reads partitions, not grouped counts
    for source in [memory_source(), frame_source(), sqlite_source()] {
        let config = DiscoveryConfig::new(Strategy::Refinement);
        let err = DiscoveryRun::new(source, universe.clone(), config)
            .unwrap()
            .run()
            .unwrap_err();
        assert!(matches!(err, fd_discovery::FdError::UnknownAttribute(_)), "{}", err);
    }
}

#[test]
fn test_text_row_id_keeps_strategies_in_agreement() {
    let frame = df! [
        "code" => ["r1", "r2", "r3"],
        "a" => [1i64, 1, 2],
        "b" => [10i64, 20, 30]
    ]
    .unwrap();
    let source: Arc<dyn TabularDataSource> =
        Arc::new(DataFrameSource::new(frame, Some("code")).unwrap());
    let universe = AttributeUniverse::new(["a", "b"]).unwrap();

    for strategy in [Strategy::Naive, Strategy::Refinement] {
        let config = DiscoveryConfig::new(strategy);
        let lines = DiscoveryRun::new(Arc::clone(&source), universe.clone(), config)
            .unwrap()
            .run()
            .unwrap()
            .render();
        assert_eq!(lines, vec!["b --> a"], "{}", strategy);
    }
}
