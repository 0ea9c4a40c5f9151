use std::collections::BTreeSet;

use price_watch::model::UserId;
use price_watch::repository::error::DatabaseError;

mod common;

use common::dec;
use common::product;

const LINK: &str = "https://www.amazon.it/dp/B071S3PX1Q";
const OTHER: &str = "https://www.amazon.de/dp/B000000002";

macro_rules! db_test {
    ($name:ident, |$db:ident| $body:block) => {
        #[tokio::test]
        async fn $name() {
            let ($db, db_path) = common::setup_db().await;
            $body
            common::teardown_db(db_path).await;
        }
    };
}

db_test!(insert_and_get, |db| {
    assert!(db.record.get(LINK).await.unwrap().is_none());

    db.record.insert(&product(LINK, "12.30"), UserId(7)).await.unwrap();

    let record = db.record.get(LINK).await.unwrap().expect("Record not found");
    assert_eq!(record.link(), LINK);
    assert_eq!(record.product.price, dec("12.30"));
    assert_eq!(record.subscribers, BTreeSet::from([UserId(7)]));
});

db_test!(insert_duplicate_fails, |db| {
    db.record.insert(&product(LINK, "1"), UserId(1)).await.unwrap();

    let result = db.record.insert(&product(LINK, "2"), UserId(2)).await;
    assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));

    let record = db.record.get(LINK).await.unwrap().unwrap();
    assert_eq!(record.product.price, dec("1"));
    assert_eq!(record.subscribers, BTreeSet::from([UserId(1)]));
});

db_test!(update_missing_record_fails, |db| {
    let result = db.record.update_product(&product(LINK, "1"), Some(UserId(1))).await;
    assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    assert_eq!(db.record.count().await.unwrap(), 0);
});

db_test!(update_adds_subscriber_once, |db| {
    db.record.insert(&product(LINK, "1"), UserId(1)).await.unwrap();

    db.record.update_product(&product(LINK, "2"), Some(UserId(2))).await.unwrap();
    db.record.update_product(&product(LINK, "3"), Some(UserId(2))).await.unwrap();
    db.record.update_product(&product(LINK, "4"), Some(UserId(1))).await.unwrap();

    let record = db.record.get(LINK).await.unwrap().unwrap();
    assert_eq!(record.product.price, dec("4"));
    assert_eq!(record.subscribers, BTreeSet::from([UserId(1), UserId(2)]));
});

db_test!(update_without_subscriber_keeps_subscribers, |db| {
    db.record.insert(&product(LINK, "1"), UserId(1)).await.unwrap();
    db.record.update_product(&product(LINK, "1"), Some(UserId(2))).await.unwrap();

    let mut changed = product(LINK, "0.99");
    changed.title = "Renamed".to_string();
    db.record.update_product(&changed, None).await.unwrap();

    let record = db.record.get(LINK).await.unwrap().unwrap();
    assert_eq!(record.product, changed);
    assert_eq!(record.subscribers, BTreeSet::from([UserId(1), UserId(2)]));
});

db_test!(remove_subscriber, |db| {
    db.record.insert(&product(LINK, "1"), UserId(1)).await.unwrap();
    db.record.update_product(&product(LINK, "1"), Some(UserId(2))).await.unwrap();

    db.record.remove_subscriber(LINK, UserId(1)).await.unwrap();
    let record = db.record.get(LINK).await.unwrap().unwrap();
    assert_eq!(record.subscribers, BTreeSet::from([UserId(2)]));

    db.record.remove_subscriber(LINK, UserId(2)).await.unwrap();
    assert!(db.record.get(LINK).await.unwrap().is_none());
    assert_eq!(db.record.count().await.unwrap(), 0);
});

db_test!(remove_non_member_fails, |db| {
    db.record.insert(&product(LINK, "1"), UserId(1)).await.unwrap();

    assert!(matches!(
        db.record.remove_subscriber(LINK, UserId(9)).await,
        Err(DatabaseError::NotFound { .. })
    ));
    assert!(matches!(
        db.record.remove_subscriber(OTHER, UserId(1)).await,
        Err(DatabaseError::NotFound { .. })
    ));

    let record = db.record.get(LINK).await.unwrap().unwrap();
    assert_eq!(record.subscribers, BTreeSet::from([UserId(1)]));
});

db_test!(select_all_and_by_subscriber, |db| {
    db.record.insert(&product(OTHER, "5"), UserId(1)).await.unwrap();
    db.record.insert(&product(LINK, "6"), UserId(2)).await.unwrap();
    db.record.update_product(&product(LINK, "6"), Some(UserId(1))).await.unwrap();

    let all = db.record.select_all().await.unwrap();
    let links: Vec<&str> = all.iter().map(|r| r.link()).collect();
    assert_eq!(links, vec![OTHER, LINK]);
    assert_eq!(db.record.count().await.unwrap(), 2);

    assert_eq!(db.record.select_by_subscriber(UserId(1)).await.unwrap().len(), 2);
    let only = db.record.select_by_subscriber(UserId(2)).await.unwrap();
    assert_eq!(only.len(), 1);
    assert_eq!(only[0].link(), LINK);
    assert!(db.record.select_by_subscriber(UserId(3)).await.unwrap().is_empty());
});

db_test!(select_all_skips_undecodable_rows, |db| {
    db.record.insert(&product(LINK, "1"), UserId(1)).await.unwrap();
    sqlx::query("INSERT INTO records (link, data) VALUES (?, ?)")
        .bind(OTHER)
        .bind(b"not json".to_vec())
        .execute(db.pool())
        .await
        .unwrap();

    let all = db.record.select_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].link(), LINK);
    assert_eq!(db.record.count().await.unwrap(), 2);
});

db_test!(concurrent_updates_all_land, |db| {
    db.record.insert(&product(LINK, "1"), UserId(0)).await.unwrap();

    let mut handles = Vec::new();
    for i in 1..=20 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.record
                .update_product(&product(LINK, "1"), Some(UserId(i)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let record = db.record.get(LINK).await.unwrap().unwrap();
    assert_eq!(record.subscribers.len(), 21);
});

db_test!(delete_all_tables, |db| {
    db.record.insert(&product(LINK, "1"), UserId(1)).await.unwrap();
    db.record.insert(&product(OTHER, "1"), UserId(1)).await.unwrap();

    db.delete_all_tables().await.unwrap();
    assert_eq!(db.record.count().await.unwrap(), 0);
});
