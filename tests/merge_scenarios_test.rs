use std::sync::Arc;

use docmerge::memory::MemoryDocumentStore;
use docmerge::params::{DELETE_FIELD, MERGE, MERGE_QUERY, OVERWRITE_MULTIVALUES};
use docmerge::{AddCommand, DeleteCommand, Document, DocumentStore, FieldOption, StoredFields};
use docmerge::{MergeProcessorFactory, Params, Schema, UpdateSink};

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder("id")
            .add_field("title", FieldOption::single())
            .add_field("status", FieldOption::single())
            .add_field("tags", FieldOption::multi())
            .add_field("text", FieldOption::multi())
            .add_field("title_sort", FieldOption::single())
            .add_copy_field("title", "text")
            .add_copy_field("title", "title_sort")
            .build()
            .unwrap(),
    )
}

/// A store holding `{id:"1", title:"Old", tags:["a","b"]}`.
fn seeded_store() -> docmerge::Result<Arc<MemoryDocumentStore>> {
    let store = Arc::new(MemoryDocumentStore::new(schema()));
    store.write(
        Document::builder()
            .add_field("id", "1")
            .add_field("title", "Old")
            .add_field("tags", vec!["a", "b"])
            .build(),
    )?;
    Ok(store)
}

/// The merge stage in front of the store itself.
fn chain(store: &Arc<MemoryDocumentStore>, params: &Params) -> docmerge::Result<Arc<dyn UpdateSink>> {
    MergeProcessorFactory::create(params, store.schema().clone(), store.clone(), store.clone())
}

fn texts<'a>(fields: &'a StoredFields, name: &'a str) -> Vec<&'a str> {
    fields.values(name).filter_map(|v| v.as_text()).collect()
}

fn incoming() -> Document {
    Document::builder()
        .add_field("id", "1")
        .add_field("title", "New")
        .add_field("tags", vec!["c"])
        .build()
}

#[test]
fn test_merge_overwrites_multi_valued_by_default() -> docmerge::Result<()> {
    let store = seeded_store()?;
    let chain = chain(&store, &Params::new().add(MERGE, "true"))?;

    chain.process_add(AddCommand::new(incoming()))?;

    let stored = store.get_by_id("1").unwrap();
    assert_eq!(texts(&stored, "title"), vec!["New"]);
    assert_eq!(texts(&stored, "tags"), vec!["c"]);
    assert_eq!(store.len(), 1);
    Ok(())
}

#[test]
fn test_merge_appends_multi_valued_when_not_overwriting() -> docmerge::Result<()> {
    let store = seeded_store()?;
    let params = Params::new()
        .add(MERGE, "true")
        .add(OVERWRITE_MULTIVALUES, "false");
    let chain = chain(&store, &params)?;

    chain.process_add(AddCommand::new(incoming()))?;

    let stored = store.get_by_id("1").unwrap();
    assert_eq!(texts(&stored, "title"), vec!["New"]);
    assert_eq!(texts(&stored, "tags"), vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn test_copy_fields_are_recomputed_not_duplicated() -> docmerge::Result<()> {
    let store = seeded_store()?;
    let chain = chain(&store, &Params::new().add(MERGE, "true"))?;

    // Touch an unrelated field: the stored copy targets must not be carried
    // into the merge, or the single-valued `title_sort` would get two values.
    chain.process_add(AddCommand::new(
        Document::builder()
            .add_field("id", "1")
            .add_field("status", "live")
            .build(),
    ))?;

    let stored = store.get_by_id("1").unwrap();
    assert_eq!(texts(&stored, "text"), vec!["Old"]);
    assert_eq!(texts(&stored, "title_sort"), vec!["Old"]);
    assert_eq!(texts(&stored, "status"), vec!["live"]);
    Ok(())
}

#[test]
fn test_merge_disabled_replaces_whole_document() -> docmerge::Result<()> {
    let store = seeded_store()?;
    let chain = chain(&store, &Params::new())?;

    chain.process_add(AddCommand::new(
        Document::builder()
            .add_field("id", "1")
            .add_field("status", "live")
            .build(),
    ))?;

    let stored = store.get_by_id("1").unwrap();
    assert!(!stored.contains("title"));
    assert!(!stored.contains("tags"));
    Ok(())
}

#[test]
fn test_field_delete_by_id_re_adds_document() -> docmerge::Result<()> {
    let store = seeded_store()?;
    let params = Params::new()
        .add(MERGE, "true")
        .add(DELETE_FIELD, "title,tags");
    let chain = chain(&store, &params)?;

    chain.process_delete(DeleteCommand::by_id("1"))?;

    // The document is still there, with only its identifier left.
    let stored = store.get_by_id("1").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(texts(&stored, "id"), vec!["1"]);
    Ok(())
}

#[test]
fn test_field_delete_by_query_and_id_together() -> docmerge::Result<()> {
    let store = seeded_store()?;
    for id in ["2", "3"] {
        store.write(
            Document::builder()
                .add_field("id", id)
                .add_field("status", "draft")
                .add_field("tags", vec!["x"])
                .build(),
        )?;
    }

    let params = Params::new()
        .add(MERGE, "true")
        .add(DELETE_FIELD, "tags")
        .add(DELETE_FIELD, "status");
    let chain = chain(&store, &params)?;

    chain.process_delete(DeleteCommand {
        id: Some("1".into()),
        query: Some("status:draft".into()),
    })?;

    assert_eq!(store.len(), 3);
    for id in ["1", "2", "3"] {
        let stored = store.get_by_id(id).unwrap();
        assert!(!stored.contains("tags"), "tags left on {id}");
        assert!(!stored.contains("status"), "status left on {id}");
    }
    assert_eq!(texts(&store.get_by_id("1").unwrap(), "title"), vec!["Old"]);
    Ok(())
}

#[test]
fn test_bulk_merge_keeps_each_identifier() -> docmerge::Result<()> {
    let store = seeded_store()?;
    store.write(
        Document::builder()
            .add_field("id", "2")
            .add_field("title", "Second")
            .add_field("tags", vec!["z"])
            .build(),
    )?;
    store.write(
        Document::builder()
            .add_field("id", "3")
            .add_field("title", "Untouched")
            .build(),
    )?;

    let params = Params::new()
        .add(MERGE, "true")
        .add(MERGE_QUERY, "tags:*");
    let chain = chain(&store, &params)?;

    chain.process_add(AddCommand::new(
        Document::builder()
            .add_field("id", "ignored")
            .add_field("status", "archived")
            .build(),
    ))?;

    assert_eq!(store.len(), 3);
    assert!(store.get_by_id("ignored").is_none());

    let first = store.get_by_id("1").unwrap();
    assert_eq!(texts(&first, "title"), vec!["Old"]);
    assert_eq!(texts(&first, "tags"), vec!["a", "b"]);
    assert_eq!(texts(&first, "status"), vec!["archived"]);

    let second = store.get_by_id("2").unwrap();
    assert_eq!(texts(&second, "title"), vec!["Second"]);
    assert_eq!(texts(&second, "status"), vec!["archived"]);

    assert!(!store.get_by_id("3").unwrap().contains("status"));
    Ok(())
}

#[test]
fn test_plain_delete_passes_through_when_disabled() -> docmerge::Result<()> {
    let store = seeded_store()?;
    let chain = chain(&store, &Params::new().add(DELETE_FIELD, "title"))?;

    chain.process_delete(DeleteCommand::by_id("1"))?;

    assert!(store.is_empty());
    Ok(())
}

#[test]
fn test_bulk_failure_keeps_earlier_writes() -> docmerge::Result<()> {
    let store = seeded_store()?;
    store.write(
        Document::builder()
            .add_field("id", "2")
            .add_field("status", "draft")
            .build(),
    )?;
    store.write(
        Document::builder()
            .add_field("id", "3")
            .add_field("status", "draft")
            .add_field("title", "Third")
            .build(),
    )?;

    let params = Params::new()
        .add(MERGE, "true")
        .add(MERGE_QUERY, "status:draft");
    let chain = chain(&store, &params)?;

    // `title_sort` is a single-valued copy target of `title`. Document 2 has
    // no title, so the merge is accepted; document 3 ends up with two
    // `title_sort` values and the store rejects it.
    let err = chain
        .process_add(AddCommand::new(
            Document::builder()
                .add_field("tags", vec!["new"])
                .add_field("title_sort", "T")
                .build(),
        ))
        .unwrap_err();
    assert_eq!(err.kind(), docmerge::ErrorKind::Write);

    // No rollback: the first match stays merged.
    assert_eq!(texts(&store.get_by_id("2").unwrap(), "tags"), vec!["new"]);
    assert!(!store.get_by_id("3").unwrap().contains("tags"));
    Ok(())
}

#[test]
fn test_query_failure_surfaces_as_lookup_error() -> docmerge::Result<()> {
    let store = seeded_store()?;
    let params = Params::new()
        .add(MERGE, "true")
        .add(DELETE_FIELD, "title");
    let chain = chain(&store, &params)?;

    let err = chain
        .process_delete(DeleteCommand::by_query("title:\"unterminated"))
        .unwrap_err();
    assert_eq!(err.kind(), docmerge::ErrorKind::Lookup);
    assert_eq!(texts(&store.get_by_id("1").unwrap(), "title"), vec!["Old"]);
    Ok(())
}

#[test]
fn test_store_query_order_is_write_order() -> docmerge::Result<()> {
    let store = seeded_store()?;
    store.write(Document::builder().add_field("id", "2").build())?;

    let hits = store.query("*:*")?;
    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    Ok(())
}
