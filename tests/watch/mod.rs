use source_bound::Error;
use source_bound::SourceBound;
use source_bound::StoreError;
use tokio_util::sync::CancellationToken;

use crate::commons::*;

/// Worker resumes after a restart: read its binding, then watch from the
/// revision after the read so no change is missed or seen twice.
#[tokio::test]
async fn test_watch_resumes_after_read() {
    let (_, store) = new_store();

    let rev1 = store.put_source_bound(&SourceBound::new(SOURCE1, WORKER1)).await.unwrap();
    let (bounds, read_rev) = store.get_source_bound(WORKER1).await.unwrap();
    assert_eq!(bounds[WORKER1].revision, rev1);

    let cancel = CancellationToken::new();
    let mut watch = store.spawn_source_bound_watch(cancel.clone(), WORKER1, read_rev + 1);

    let rev2 = store.put_source_bound(&SourceBound::new(SOURCE2, WORKER1)).await.unwrap();
    let rev3 = store.delete_source_bound(WORKER1).await.unwrap();

    let got = next_within(&mut watch.bounds).await.unwrap();
    assert_eq!((got.source_id.as_str(), got.revision, got.is_deleted), (SOURCE2, rev2, false));

    let got = next_within(&mut watch.bounds).await.unwrap();
    assert_eq!(got.worker_id, WORKER1);
    assert!(got.is_deleted);
    assert_eq!(got.revision, rev3);

    cancel.cancel();
    watch.handle.await.unwrap();
    assert!(watch.errors.recv().await.is_none());
}

#[tokio::test]
async fn test_watch_revisions_strictly_increase() {
    let (_, store) = new_store();
    let cancel = CancellationToken::new();
    let mut watch = store.spawn_source_bound_watch(cancel.clone(), "", 1);

    for i in 0..20 {
        let worker = format!("dm-worker-{}", i % 3);
        store
            .put_source_bound(&SourceBound::new(format!("source-{i}"), worker))
            .await
            .unwrap();
    }

    let mut last = 0;
    for _ in 0..20 {
        let got = next_within(&mut watch.bounds).await.unwrap();
        assert!(got.revision > last);
        last = got.revision;
    }

    cancel.cancel();
    watch.handle.await.unwrap();
}

#[tokio::test]
async fn test_watch_from_compacted_revision() {
    let (kv, store) = new_store();
    let rev1 = store.put_source_bound(&SourceBound::new(SOURCE1, WORKER1)).await.unwrap();
    let rev2 = store.put_source_bound(&SourceBound::new(SOURCE2, WORKER1)).await.unwrap();
    kv.compact(rev2).unwrap();

    let mut watch = store.spawn_source_bound_watch(CancellationToken::new(), WORKER1, rev1);
    watch.handle.await.unwrap();

    let err = watch.errors.recv().await.unwrap();
    assert!(matches!(err, Error::Transport(StoreError::Compacted { .. })));

    // watching again from the compaction point succeeds
    let cancel = CancellationToken::new();
    let mut watch = store.spawn_source_bound_watch(cancel.clone(), WORKER1, rev2);
    let got = next_within(&mut watch.bounds).await.unwrap();
    assert_eq!(got.revision, rev2);
    cancel.cancel();
}
