// Multi-thread stress: tables and their indexes must stay mutually
// consistent under concurrent row operations from many threads.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use tabula_core::{Column, Database, IndexerKind, Table, TabularType, Value};

const THREADS: usize = 8;
const KEYS_PER_THREAD: i32 = 50;

fn stress_columns() -> Vec<Column> {
    vec![
        Column::new("id", TabularType::Int32, Value::Int32(0), IndexerKind::Hash).unwrap(),
        Column::new(
            "score",
            TabularType::Float64,
            Value::Float64(0.0),
            IndexerKind::BPlusTree,
        )
        .unwrap(),
        Column::new("tag", TabularType::String, Value::from(""), IndexerKind::None).unwrap(),
    ]
}

fn row(id: i32, score: f64, tag: &str) -> HashMap<String, Value> {
    HashMap::from([
        ("id".to_string(), Value::Int32(id)),
        ("score".to_string(), Value::Float64(score)),
        ("tag".to_string(), Value::from(tag)),
    ])
}

/// Observable form of invariants 1-3: every stored row is reachable
/// through each of its indexed values, every query hit carries the queried
/// value, and every reported position materializes.
fn assert_index_consistency(table: &Table) {
    let all = table.scan().unwrap();
    assert_eq!(all.len(), table.row_count());

    for snapshot in &all {
        let id_hits = table.find("id", &snapshot.values[0]).unwrap();
        assert!(
            id_hits.iter().any(|hit| hit.position == snapshot.position),
            "row {} unreachable through its id",
            snapshot.position
        );
        for hit in &id_hits {
            assert_eq!(hit.values[0], snapshot.values[0]);
        }

        let score_hits = table.find("score", &snapshot.values[1]).unwrap();
        assert!(
            score_hits.iter().any(|hit| hit.position == snapshot.position),
            "row {} unreachable through its score",
            snapshot.position
        );
        for hit in &score_hits {
            assert_eq!(hit.values[1], snapshot.values[1]);
        }
    }
}

#[test]
fn concurrent_inserts_land_exactly_once() {
    let db = Database::new();
    db.create_table("stress", stress_columns()).unwrap();
    let table = db.get_table("stress").unwrap();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let table = Arc::clone(&table);
            scope.spawn(move || {
                for k in 0..KEYS_PER_THREAD {
                    let id = t as i32 * 1_000 + k;
                    table
                        .insert_row(&row(id, id as f64 / 2.0, "bulk"))
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(table.row_count(), THREADS * KEYS_PER_THREAD as usize);
    for t in 0..THREADS {
        for k in 0..KEYS_PER_THREAD {
            let id = t as i32 * 1_000 + k;
            let hits = table.find("id", &Value::Int32(id)).unwrap();
            assert_eq!(hits.len(), 1, "id {id}");
        }
    }
    assert_index_consistency(&table);
}

#[test]
fn concurrent_mixed_cycles_keep_indexes_aligned() {
    let db = Database::new();
    db.create_table("stress", stress_columns()).unwrap();
    let table = db.get_table("stress").unwrap();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let table = Arc::clone(&table);
            scope.spawn(move || {
                for k in 0..KEYS_PER_THREAD {
                    let id = t as i32 * 1_000 + k;
                    table.insert_row(&row(id, id as f64, "cycle")).unwrap();

                    let hits = table.find("id", &Value::Int32(id)).unwrap();
                    assert!(!hits.is_empty(), "freshly inserted id {id} not found");

                    // Positions shift under concurrent deletes, so the
                    // looked-up position may be stale by the time it is
                    // used; any outcome must still leave the table
                    // consistent.
                    let position = hits[0].position;
                    let _ = table.update_row(
                        position,
                        &HashMap::from([("score".to_string(), Value::Float64(id as f64 + 0.5))]),
                    );

                    if k % 2 == 0 {
                        let _ = table.delete_row(position);
                    }
                }
            });
        }
    });

    assert_index_consistency(&table);
}

#[test]
fn concurrent_readers_see_whole_rows() {
    let db = Database::new();
    db.create_table("stress", stress_columns()).unwrap();
    let table = db.get_table("stress").unwrap();

    thread::scope(|scope| {
        for t in 0..4 {
            let table = Arc::clone(&table);
            scope.spawn(move || {
                for k in 0..KEYS_PER_THREAD {
                    let id = t * 1_000 + k;
                    // Tag and id move together; a torn row would break the
                    // pairing below.
                    table
                        .insert_row(&row(id, 1.0, &format!("tag-{id}")))
                        .unwrap();
                }
            });
        }
        for _ in 0..4 {
            let table = Arc::clone(&table);
            scope.spawn(move || {
                for _ in 0..200 {
                    for snapshot in table.scan().unwrap() {
                        let Value::Int32(id) = snapshot.values[0] else {
                            panic!("wrong id variant");
                        };
                        assert_eq!(snapshot.values[2], Value::from(format!("tag-{id}").as_str()));
                    }
                }
            });
        }
    });

    assert_index_consistency(&table);
}

#[test]
fn concurrent_table_creation_has_one_winner() {
    let db = Arc::new(Database::new());
    let successes: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let db = Arc::clone(&db);
                scope.spawn(move || db.create_table("contested", stress_columns()).is_ok())
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap() as usize)
            .sum()
    });

    assert_eq!(successes, 1);
    assert!(db.table_exists("contested"));
}
