use super::*;
use crate::DecodeError;

#[test]
fn test_source_bound_json() {
    let b1 = SourceBound::new("mysql-replica-1", "dm-worker-1");

    let j = b1.to_json();
    assert_eq!(j, r#"{"source":"mysql-replica-1","worker":"dm-worker-1"}"#);
    assert_eq!(j, b1.to_string());
    assert_eq!(b1.encode(), j.as_bytes());

    let b2 = SourceBound::decode(j.as_bytes()).unwrap();
    assert_eq!(b2, b1);
}

#[test]
fn test_encoding_ignores_tombstone_and_revision() {
    let mut bound = SourceBound::new("mysql-replica-1", "dm-worker-1");
    bound.is_deleted = true;
    bound.revision = 42;

    let decoded = SourceBound::decode(&bound.encode()).unwrap();
    assert!(!decoded.is_deleted);
    assert_eq!(decoded.revision, 0);
    assert_eq!(decoded, SourceBound::new("mysql-replica-1", "dm-worker-1"));
}

#[test]
fn test_encoding_escapes_special_characters() {
    let bound = SourceBound::new("src \"quoted\"", "worker/\u{e9}");

    let decoded = SourceBound::decode(&bound.encode()).unwrap();
    assert_eq!(decoded, bound);
}

#[test]
fn test_decode_rejects_missing_field() {
    let err = SourceBound::decode(br#"{"source":"mysql-replica-1"}"#).unwrap_err();
    match err {
        DecodeError::SourceBound { raw, .. } => {
            assert_eq!(raw, r#"{"source":"mysql-replica-1"}"#);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_decode_rejects_wrong_shape() {
    assert!(SourceBound::decode(b"not json").is_err());
    assert!(SourceBound::decode(br#"["mysql-replica-1","dm-worker-1"]"#).is_err());
    assert!(SourceBound::decode(br#"{"source":1,"worker":"dm-worker-1"}"#).is_err());
    assert!(SourceBound::decode(b"").is_err());
}

#[test]
fn test_is_empty() {
    assert!(SourceBound::default().is_empty());
    assert!(!SourceBound::new("mysql-replica-1", "dm-worker-1").is_empty());
}

#[test]
fn test_tombstone_has_no_source() {
    let tomb = SourceBound::tombstone("dm-worker-1".to_string(), 7);

    assert!(tomb.is_deleted);
    assert_eq!(tomb.revision, 7);
    assert_eq!(tomb.worker_id, "dm-worker-1");
    assert!(tomb.source_id.is_empty());
}
