use super::*;

fn entry(id: &str, name: &str) -> CatalogEntry {
    CatalogEntry {
        id: ContentHash::from_hex(id),
        name: name.to_string(),
        kind: MediaKind::Image,
        mime: "image/png".to_string(),
        size_bytes: 42,
        thumbnail_png: None,
    }
}

#[tokio::test]
async fn add_get_delete_list() {
    let catalog = MemoryCatalog::new();
    catalog.add(entry("bb", "second.png")).await.unwrap();
    catalog.add(entry("aa", "first.png")).await.unwrap();

    let got = catalog.get(&ContentHash::from_hex("aa")).await.unwrap();
    assert_eq!(got.unwrap().name, "first.png");

    let names: Vec<String> = catalog
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["first.png", "second.png"]);

    assert!(catalog.delete(&ContentHash::from_hex("aa")).await.unwrap());
    assert!(!catalog.delete(&ContentHash::from_hex("aa")).await.unwrap());
    assert!(catalog.get(&ContentHash::from_hex("aa")).await.unwrap().is_none());
}

#[tokio::test]
async fn add_replaces_existing_entry() {
    let catalog = MemoryCatalog::new();
    catalog.add(entry("aa", "old")).await.unwrap();
    catalog.add(entry("aa", "new")).await.unwrap();
    let all = catalog.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "new");
}

#[tokio::test]
async fn json_catalog_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let catalog = JsonCatalog::open(dir.path()).await.unwrap();
        let mut with_thumb = entry("aa", "clip.mp4");
        with_thumb.thumbnail_png = Some(Bytes::from_static(b"\x89PNG fake"));
        catalog.add(with_thumb).await.unwrap();
        catalog.add(entry("bb", "still.png")).await.unwrap();
    }

    let reopened = JsonCatalog::open(dir.path()).await.unwrap();
    let all = reopened.list_all().await.unwrap();
    assert_eq!(all.len(), 2);
    let aa = reopened
        .get(&ContentHash::from_hex("aa"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(aa.name, "clip.mp4");
    assert_eq!(aa.thumbnail_png.as_deref(), Some(&b"\x89PNG fake"[..]));
    assert!(all[1].thumbnail_png.is_none());
}

#[tokio::test]
async fn json_catalog_delete_removes_thumbnail() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = JsonCatalog::open(dir.path()).await.unwrap();
    let mut e = entry("cc", "x.mp4");
    e.thumbnail_png = Some(Bytes::from_static(b"png"));
    catalog.add(e).await.unwrap();
    assert!(dir.path().join("cc.png").exists());

    assert!(catalog.delete(&ContentHash::from_hex("cc")).await.unwrap());
    assert!(!dir.path().join("cc.png").exists());
    assert!(!catalog.delete(&ContentHash::from_hex("cc")).await.unwrap());

    let reopened = JsonCatalog::open(dir.path()).await.unwrap();
    assert!(reopened.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn json_catalog_rejects_unsafe_ids() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = JsonCatalog::open(dir.path()).await.unwrap();
    let err = catalog.add(entry("../up", "bad")).await.unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}
