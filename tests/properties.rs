use std::sync::{Arc, Mutex};
use std::time::Duration;

use plug_watch::queue::DEFAULT_QUEUE_CAPACITY;
use plug_watch::{DbManager, PlugMetrics, StoreError};
use r2d2_sqlite::SqliteConnectionManager;

const MINUTE_MS: i64 = 60_000;

fn power(active_power: f64) -> PlugMetrics {
    PlugMetrics {
        voltage: 230.0,
        current: active_power / 230.0,
        active_power,
        apparent_power: active_power,
        reactive_power: 0.0,
        power_factor: 1.0,
    }
}

#[tokio::test]
async fn side_effects_follow_submission_order() {
    let db = DbManager::open_in_memory().unwrap();
    let finished = Arc::new(Mutex::new(vec![]));

    let mut tickets = vec![];
    for i in 0..12i64 {
        let finished = finished.clone();
        let ticket = db
            .queue()
            .enqueue(move |gateway| {
                //Early operations are the slow ones
                std::thread::sleep(Duration::from_millis(((12 - i) * 2) as u64));
                gateway.query("SELECT ?1", [i], |row| row.get::<_, i64>(0))?;
                finished.lock().unwrap().push(i);
                Ok(i)
            })
            .unwrap();
        tickets.push(ticket);
    }

    let mut resolved = vec![];
    for ticket in tickets {
        resolved.push(ticket.wait().await.unwrap());
    }

    let expected: Vec<i64> = (0..12).collect();
    assert_eq!(resolved, expected);
    assert_eq!(*finished.lock().unwrap(), expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn store_never_sees_two_statements_at_once() {
    let db = DbManager::with_capacity(SqliteConnectionManager::memory(), 256).unwrap();
    let db = Arc::new(db);
    let stats = db.execution_stats();

    let mut producers = vec![];
    for producer in 0..8 {
        let db = db.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..10 {
                let name = format!("plug-{}", producer);
                db.add_result(&name, power(i as f64), Some(i)).await.unwrap();
            }
            db.get_plugs().await.unwrap();
        }));
    }

    for producer in producers {
        producer.await.unwrap();
    }

    assert!(stats.total_executions() > 80);
    assert_eq!(stats.peak_in_flight(), 1);
    assert_eq!(stats.in_flight(), 0);
}

#[tokio::test]
async fn plug_names_are_registered_once() {
    let db = DbManager::open_in_memory().unwrap();

    let first = db.add_result("deviceA", power(1.0), None).await.unwrap();
    let second = db.add_result("deviceA", power(2.0), None).await.unwrap();

    assert_eq!(first.plug_id, second.plug_id);

    let plugs = db.get_plugs().await.unwrap();
    assert_eq!(plugs.iter().filter(|plug| plug.plug_name == "deviceA").count(), 1);
}

#[tokio::test]
async fn thirty_third_operation_is_rejected() {
    let db = DbManager::open_in_memory().unwrap();
    let (release, gate) = std::sync::mpsc::channel::<()>();
    let gate = Arc::new(Mutex::new(gate));

    let mut tickets = vec![];
    for _ in 0..DEFAULT_QUEUE_CAPACITY {
        let gate = gate.clone();
        tickets.push(
            db.queue()
                .enqueue(move |_| {
                    //Blocks until the sender is dropped
                    let _ = gate.lock().unwrap().recv();
                    Ok(())
                })
                .unwrap(),
        );
    }

    let rejected = db.add_result("late", power(1.0), None).await;
    assert!(matches!(rejected, Err(StoreError::QueueFull { capacity: 32 })));

    drop(release);
    for ticket in tickets {
        ticket.wait().await.unwrap();
    }

    //Nothing from the rejected call reached the store
    assert!(db.get_plugs().await.unwrap().is_empty());
}

#[tokio::test]
async fn bucket_average_is_inserted_then_updated_in_place() {
    let db = DbManager::open_in_memory().unwrap();

    let added = db.add_result("A", power(10.0), Some(0)).await.unwrap();
    db.add_result("A", power(20.0), Some(30_000)).await.unwrap();

    let report = db.average_plug_results_at(MINUTE_MS, 59_999).await.unwrap();
    assert_eq!((report.bucket_start_ms, report.bucket_end_ms), (0, MINUTE_MS));
    assert_eq!((report.inserted, report.updated), (1, 0));

    let averages = db
        .get_plug_averages(added.plug_id, Some(MINUTE_MS), None, None)
        .await
        .unwrap();
    assert_eq!(averages.len(), 1);
    assert_eq!(averages[0].bucket_start_ms, 0);
    assert_eq!(averages[0].metrics.active_power, 15.0);
    let average_id = averages[0].average_id;

    db.add_result("A", power(30.0), Some(45_000)).await.unwrap();

    let report = db.average_plug_results_at(MINUTE_MS, 59_999).await.unwrap();
    assert_eq!((report.inserted, report.updated), (0, 1));

    let averages = db
        .get_plug_averages(added.plug_id, Some(MINUTE_MS), None, None)
        .await
        .unwrap();
    assert_eq!(averages.len(), 1);
    assert_eq!(averages[0].average_id, average_id);
    assert_eq!(averages[0].metrics.active_power, 20.0);
}

#[tokio::test]
async fn result_range_includes_both_ends() {
    let db = DbManager::open_in_memory().unwrap();

    let mut plug_id = 0;
    for timestamp_ms in [999, 1000, 1500, 2000, 2001] {
        plug_id = db
            .add_result("A", power(1.0), Some(timestamp_ms))
            .await
            .unwrap()
            .plug_id;
    }

    let timestamps: Vec<i64> = db
        .get_plug_results(plug_id, Some(1000), Some(2000))
        .await
        .unwrap()
        .iter()
        .map(|sample| sample.timestamp_ms)
        .collect();
    assert_eq!(timestamps, vec![1000, 1500, 2000]);

    let everything = db.get_plug_results(plug_id, None, None).await.unwrap();
    assert_eq!(everything.len(), 5);
}

#[tokio::test]
async fn failed_operation_does_not_stall_later_ones() {
    let db = DbManager::open_in_memory().unwrap();

    let failing = db
        .queue()
        .enqueue(|gateway| gateway.execute("UPDATE nowhere SET x = 1", []))
        .unwrap();
    let later = db.add_result("A", power(5.0), Some(1));

    let (failed, added) = tokio::join!(failing.wait(), later);

    assert!(matches!(failed, Err(StoreError::Statement(_))));
    assert!(added.is_ok());
}
