use source_bound::SourceBound;

use crate::commons::*;

#[test]
fn test_source_bound_json() {
    let bound = SourceBound::new(SOURCE1, WORKER1);
    assert_eq!(
        bound.to_string(),
        r#"{"source":"mysql-replica-1","worker":"dm-worker-1"}"#
    );

    let decoded = SourceBound::decode(bound.to_json().as_bytes()).unwrap();
    assert_eq!(decoded, bound);
}

#[tokio::test]
async fn test_bind_rebind_and_unbind() {
    let (kv, store) = new_store();

    // scheduler binds source1 to worker1, then moves it to worker2
    let rev1 = store.put_source_bound(&SourceBound::new(SOURCE1, WORKER1)).await.unwrap();
    let outcome = store.replace_source_bound(SOURCE1, WORKER1, WORKER2).await.unwrap();
    assert!(outcome.succeeded);
    let rev2 = outcome.revision;
    assert!(rev2 > rev1);

    let (bounds, rev) = store.get_source_bound("").await.unwrap();
    assert_eq!(rev, rev2);
    assert_eq!(bounds.len(), 1);
    assert_eq!(bounds[WORKER2].source_id, SOURCE1);

    // worker1 is still remembered as the last owner of source1
    let (last, _) = store.get_last_source_bounds().await.unwrap();
    assert_eq!(last[WORKER1].source_id, SOURCE1);
    assert_eq!(last[WORKER2].source_id, SOURCE1);

    let rev3 = store.delete_source_bound(WORKER2).await.unwrap();
    assert_eq!(rev3, kv.current_revision());
    let (bounds, _) = store.get_source_bound("").await.unwrap();
    assert!(bounds.is_empty());
}

#[tokio::test]
async fn test_concurrent_bind_if_unbound_has_one_winner() {
    let (_, store) = new_store();

    let tasks: Vec<_> = [SOURCE1, SOURCE2]
        .into_iter()
        .map(|source| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .bind_if_unbound(&SourceBound::new(source, WORKER1))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        if task.await.unwrap().succeeded {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let (bounds, _) = store.get_source_bound(WORKER1).await.unwrap();
    assert_eq!(bounds.len(), 1);
}
