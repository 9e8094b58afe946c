use chemviz_core::history::{
    HistoryEntry, HistoryItem, HistoryStore, InMemoryHistoryStore, HISTORY_LIMIT,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;

fn entry(filename: &str, uploaded_at: DateTime<Utc>) -> HistoryEntry {
    HistoryEntry {
        filename: filename.to_string(),
        uploaded_at,
        total_count: 3,
        avg_flowrate: 10.0,
        avg_pressure: 2.5,
        avg_temperature: 80.25,
    }
}

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 4, 13, 5, 0).unwrap()
}

#[tokio::test]
async fn keeps_the_five_most_recent_entries() {
    let store = InMemoryHistoryStore::new();
    for idx in 0..8 {
        store
            .append(entry(&format!("upload_{idx}.csv"), base() + Duration::minutes(idx)))
            .await
            .unwrap();
    }

    assert_eq!(store.count().await.unwrap(), HISTORY_LIMIT);

    let filenames: Vec<String> = store
        .list_recent(HISTORY_LIMIT)
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.entry.filename)
        .collect();
    assert_eq!(
        filenames,
        [
            "upload_7.csv",
            "upload_6.csv",
            "upload_5.csv",
            "upload_4.csv",
            "upload_3.csv"
        ]
    );
}

#[tokio::test]
async fn equal_timestamps_fall_back_to_insertion_order() {
    let store = InMemoryHistoryStore::new();
    for idx in 0..7 {
        store
            .append(entry(&format!("same_{idx}.csv"), base()))
            .await
            .unwrap();
    }

    let sequences: Vec<i64> = store
        .list_recent(HISTORY_LIMIT)
        .await
        .unwrap()
        .iter()
        .map(|record| record.sequence)
        .collect();
    assert_eq!(sequences, [7, 6, 5, 4, 3]);
}

#[tokio::test]
async fn new_entry_survives_its_own_insertion() {
    let store = InMemoryHistoryStore::new();
    for idx in 0..HISTORY_LIMIT as i64 {
        store
            .append(entry(&format!("recent_{idx}.csv"), base() + Duration::hours(idx)))
            .await
            .unwrap();
    }

    let late = store
        .append(entry("late_clock.csv", base() - Duration::days(1)))
        .await
        .unwrap();
    assert_eq!(late.entry.uploaded_at, base() + Duration::hours(4));

    let recent = store.list_recent(1).await.unwrap();
    assert_eq!(recent[0].entry.filename, "late_clock.csv");
    assert_eq!(store.count().await.unwrap(), HISTORY_LIMIT);
}

#[tokio::test]
async fn list_recent_is_capped() {
    let store = InMemoryHistoryStore::new();
    assert!(store.list_recent(HISTORY_LIMIT).await.unwrap().is_empty());

    for idx in 0..3 {
        store
            .append(entry(&format!("f{idx}.csv"), base() + Duration::seconds(idx)))
            .await
            .unwrap();
    }
    assert_eq!(store.list_recent(2).await.unwrap().len(), 2);
    assert_eq!(store.list_recent(100).await.unwrap().len(), 3);
    assert!(store.list_recent(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn history_item_formats_date_in_display_timezone() {
    let store = InMemoryHistoryStore::new();
    let record = store.append(entry("plant.csv", base())).await.unwrap();

    let utc = HistoryItem::from_record(&record, Tz::UTC);
    assert_eq!(utc.filename, "plant.csv");
    assert_eq!(utc.total, 3);
    assert_eq!(utc.avg_temp, 80.25);
    assert_eq!(utc.date, "Mar 04, 13:05");

    let kolkata = HistoryItem::from_record(&record, Tz::Asia__Kolkata);
    assert_eq!(kolkata.date, "Mar 04, 18:35");

    let json = serde_json::to_value(&utc).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "filename": "plant.csv",
            "total": 3,
            "avg_temp": 80.25,
            "date": "Mar 04, 13:05"
        })
    );
}
