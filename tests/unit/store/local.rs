use super::*;
use crate::store::{read_blob, stream_from_bytes};
use bytes::Bytes;

#[tokio::test]
async fn write_then_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalByteStore::open(dir.path()).await.unwrap();
    let id = ContentHash::of(b"frame data");

    assert!(!store.exists(&id).await.unwrap());
    let n = store
        .write(&id, stream_from_bytes(Bytes::from_static(b"frame data")))
        .await
        .unwrap();
    assert_eq!(n, 10);
    assert!(store.exists(&id).await.unwrap());

    let blob = read_blob(&store, &id).await.unwrap();
    assert_eq!(&blob.bytes[..], b"frame data");
    let path = blob.path.unwrap();
    assert!(path.starts_with(dir.path().join("objects")));
    assert!(path.ends_with(id.as_str()));
}

#[tokio::test]
async fn layout_is_sharded_by_key_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalByteStore::open(dir.path()).await.unwrap();
    let id = ContentHash::from_hex("abcdef0123");
    let path = store.local_path(&id).unwrap();
    assert_eq!(
        path,
        dir.path().join("objects").join("ab").join("cd").join("abcdef0123")
    );
}

#[tokio::test]
async fn overwrite_replaces_payload_and_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalByteStore::open(dir.path()).await.unwrap();
    let id = ContentHash::from_hex("abcd1234");

    store
        .write(&id, stream_from_bytes(Bytes::from_static(b"one")))
        .await
        .unwrap();
    store
        .write(&id, stream_from_bytes(Bytes::from_static(b"two!")))
        .await
        .unwrap();

    let blob = read_blob(&store, &id).await.unwrap();
    assert_eq!(&blob.bytes[..], b"two!");

    let shard = store.local_path(&id).unwrap();
    let siblings: Vec<_> = std::fs::read_dir(shard.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(siblings.len(), 1);
}

#[tokio::test]
async fn missing_payload_is_store_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalByteStore::open(dir.path()).await.unwrap();
    let err = match store.read_stream(&ContentHash::from_hex("ffff0000")).await {
        Ok(_) => panic!("expected missing payload"),
        Err(e) => e,
    };
    assert!(err.is_store_not_ready());
}

#[tokio::test]
async fn open_rejects_file_root() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();
    let err = LocalByteStore::open(&file).await.unwrap_err();
    assert!(err.is_store_not_ready());
}
