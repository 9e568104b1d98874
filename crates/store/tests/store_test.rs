use store::{
    DocumentIndex, IndexDocument, IndexHandle, MetadataPatch, NewProduct, ProductStore, SearchIndex,
    SearchRequest, SortDirective, SortField, DEFAULT_WRITER_HEAP,
};
use tempfile::tempdir;

fn seed(store: &ProductStore) -> Vec<i64> {
    let mut phone = NewProduct::new("iPhone 15 (128GB, Blue)", "Apple iPhone 15 with A16 Bionic chip", 69999.0, 79999.0);
    phone.metadata = Some(MetadataPatch {
        model: Some("iPhone 15".into()),
        color: Some("Blue".into()),
        category: Some("Smartphone".into()),
        ..Default::default()
    });
    let budget = NewProduct::new("Redmi 13C", "Entry level mobile with big battery", 8999.0, 11999.0);
    let kettle = NewProduct::new("Electric Kettle", "1.5L stainless steel", 999.0, 1499.0);

    store
        .transaction(|uow| {
            Ok(vec![
                uow.insert_product(&phone)?,
                uow.insert_product(&budget)?,
                uow.insert_product(&kettle)?,
            ])
        })
        .unwrap()
}

#[tokio::test]
async fn test_store_products_into_live_index() {
    let tmp = tempdir().unwrap();
    let store = ProductStore::open(tmp.path()).unwrap();
    let ids = seed(&store);

    let index = DocumentIndex::open(&tmp.path().join("search_index"), DEFAULT_WRITER_HEAP).unwrap();
    let docs: Vec<IndexDocument> = store.all().unwrap().iter().map(IndexDocument::from).collect();
    index.upsert(&docs).await.unwrap();
    assert_eq!(index.count(), 3);

    // "phone" reaches the Redmi through the synonym table and the iPhone through its category
    let request = SearchRequest::new("phone", 10).with_sort(Some(SortDirective::asc(SortField::Price)));
    let hits = index.search(&request).await.unwrap();
    let found: Vec<i64> = hits.iter().filter_map(|h| h.id.as_i64()).collect();
    assert_eq!(found, vec![ids[1], ids[0]]);

    // Index ids resolve back through the repository
    let products = store.in_bulk(&found).unwrap();
    assert_eq!(products[&ids[0]].title, "iPhone 15 (128GB, Blue)");
}

#[tokio::test]
async fn test_handle_resolves_directory_index() {
    let tmp = tempdir().unwrap();
    let handle = IndexHandle::directory(tmp.path().join("search_index"), DEFAULT_WRITER_HEAP);

    let index = handle.resolve().await.expect("index should open");
    let store = ProductStore::open_in_memory().unwrap();
    seed(&store);
    let docs: Vec<IndexDocument> = store.all().unwrap().iter().map(IndexDocument::from).collect();
    index.upsert(&docs).await.unwrap();
    drop(index);

    handle.recreate().await.unwrap();
    let index = handle.resolve().await.unwrap();
    assert!(index.search(&SearchRequest::new("kettle", 10)).await.unwrap().is_empty());
}
