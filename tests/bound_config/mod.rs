use source_bound::SourceBound;
use source_bound::SourceConfig;

use crate::commons::*;

#[tokio::test]
async fn test_worker_start_up_resolves_bound_config() {
    let (_, store) = new_store();
    let config = SourceConfig::new(SOURCE1).with_field("enable-gtid", true);

    store.put_source_config(&config).await.unwrap();
    let rev = store.put_source_bound(&SourceBound::new(SOURCE1, WORKER1)).await.unwrap();

    let (bound, cfg, read_rev) = store.get_source_bound_config(WORKER1).await.unwrap();
    assert_eq!(bound.source_id, SOURCE1);
    assert_eq!(bound.revision, rev);
    assert_eq!(cfg, Some(config));
    assert_eq!(read_rev, rev);

    // a worker with nothing bound resolves to an empty bound
    let (bound, cfg, _) = store.get_source_bound_config(WORKER2).await.unwrap();
    assert!(bound.is_empty());
    assert!(cfg.is_none());
}

#[tokio::test]
async fn test_bound_to_unconfigured_source() {
    let (_, store) = new_store();
    store.put_source_config(&SourceConfig::new(SOURCE1)).await.unwrap();
    store.put_source_bound(&SourceBound::new(SOURCE2, WORKER1)).await.unwrap();

    let err = store.get_source_bound_config(WORKER1).await.unwrap_err();
    assert!(err.is_config_missing());

    store.delete_source_config(SOURCE1).await.unwrap();
    let (configs, _) = store.get_source_config("").await.unwrap();
    assert!(configs.is_empty());
}
