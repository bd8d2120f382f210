mod support;

use std::sync::atomic::Ordering;

use quire::application::articles::{CreateArticleCommand, UpdateArticleInfoCommand};
use quire::application::error::AppError;
use quire::application::pagination::PageRequest;
use quire::cache::{CacheNamespace, KeyValueCache};
use quire::domain::types::ArticleState;

use support::Harness;

fn draft(category_id: i64, title: &str, weight: i64) -> CreateArticleCommand {
    CreateArticleCommand {
        weight,
        category_id,
        title: title.to_string(),
        preview: format!("{title} preview"),
        content: format!("{title} body"),
        picture: String::new(),
        sentence: String::new(),
    }
}

fn retitle(id: i64, category_id: i64) -> UpdateArticleInfoCommand {
    UpdateArticleInfoCommand {
        id,
        category_id,
        title: "Moved".to_string(),
        preview: "p".to_string(),
        content: "c".to_string(),
    }
}

async fn category_counts(harness: &Harness) -> Vec<(String, i64)> {
    harness
        .app
        .categories
        .list(PageRequest::unpaged())
        .await
        .expect("categories")
        .items
        .into_iter()
        .map(|category| (category.name, category.article_count))
        .collect()
}

#[tokio::test]
async fn missing_category_leaves_no_article_behind() {
    let harness = Harness::new();

    let err = harness
        .app
        .articles
        .create(draft(404, "Orphan", 0))
        .await
        .expect_err("unknown category");

    assert!(matches!(err, AppError::NotFound { entity: "category" }));
    assert_eq!(harness.store.article_rows(), 0);
}

#[tokio::test]
async fn creating_an_article_refreshes_counts() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");

    let empty = articles
        .list_by_category(go, PageRequest::new(1, 10))
        .await
        .expect("empty listing");
    assert_eq!(empty.total, 0);
    let categories = harness
        .app
        .categories
        .list(PageRequest::unpaged())
        .await
        .expect("categories");
    assert_eq!(categories.items[0].article_count, 0);

    articles.create(draft(go, "Hello", 0)).await.expect("create");

    let listing = articles
        .list_by_category(go, PageRequest::new(1, 10))
        .await
        .expect("listing");
    assert_eq!(listing.total, 1);
    assert_eq!(listing.items[0].title, "Hello");
    assert_eq!(listing.items[0].category_name, "Go");
    assert_eq!(
        harness.store.category_row(go).expect("row").article_count,
        1
    );

    let categories = harness
        .app
        .categories
        .list(PageRequest::unpaged())
        .await
        .expect("categories");
    assert_eq!(categories.items[0].article_count, 1);
}

#[tokio::test]
async fn counts_are_cached_between_writes() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");
    articles.create(draft(go, "One", 0)).await.expect("create");

    articles.list(PageRequest::new(1, 5)).await.expect("listing");
    articles.list(PageRequest::new(2, 5)).await.expect("listing");
    assert_eq!(harness.store.count_loads.load(Ordering::SeqCst), 1);

    articles.create(draft(go, "Two", 0)).await.expect("create");
    let listing = articles.list(PageRequest::new(1, 5)).await.expect("listing");
    assert_eq!(listing.total, 2);
    assert_eq!(harness.store.count_loads.load(Ordering::SeqCst), 2);
    assert_eq!(listing.items[0].title, "Two");
}

#[tokio::test]
async fn deleted_articles_disappear_everywhere() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");
    let article = articles.create(draft(go, "Gone", 3)).await.expect("create");

    articles.get(article.id).await.expect("visible");
    articles.list_home().await.expect("home");
    articles.delete(article.id).await.expect("delete");

    assert!(matches!(
        articles.get(article.id).await,
        Err(AppError::NotFound { entity: "article" })
    ));
    assert_eq!(
        harness.store.article_row(article.id).expect("row kept").state,
        ArticleState::Deleted
    );
    assert_eq!(
        harness.store.category_row(go).expect("row").article_count,
        0
    );
    let listing = articles
        .list_by_category(go, PageRequest::unpaged())
        .await
        .expect("listing");
    assert_eq!(listing.total, 0);
    assert!(listing.items.is_empty());
    assert!(articles.list_home().await.expect("home").is_empty());
}

#[tokio::test]
async fn reading_counts_a_view_without_evicting() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");
    let article = articles.create(draft(go, "Viewed", 0)).await.expect("create");

    let first = articles.get(article.id).await.expect("first view");
    let second = articles.get(article.id).await.expect("second view");

    assert_eq!(first.category_name, "Go");
    assert_eq!(second.article.views, 0);
    assert_eq!(harness.store.article_row(article.id).expect("row").views, 2);
    assert_eq!(harness.store.article_loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn edits_are_visible_to_the_next_read() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");
    let rust = harness.store.seed_category("Rust");
    let article = articles.create(draft(go, "Draft", 0)).await.expect("create");
    articles.get(article.id).await.expect("warm cache");

    articles
        .update_info(UpdateArticleInfoCommand {
            id: article.id,
            category_id: rust,
            title: "Final".to_string(),
            preview: "p".to_string(),
            content: "c".to_string(),
        })
        .await
        .expect("update");
    articles.update_weight(article.id, 9).await.expect("weight");

    let view = articles.get(article.id).await.expect("reread");
    assert_eq!(view.article.title, "Final");
    assert_eq!(view.article.weight, 9);
    assert_eq!(view.category_name, "Rust");

    assert!(matches!(
        articles.update_weight(article.id, -1).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn home_list_keeps_weighted_articles_heaviest_first() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");
    articles.create(draft(go, "Light", 1)).await.expect("create");
    articles.create(draft(go, "Plain", 0)).await.expect("create");
    articles.create(draft(go, "Heavy", 5)).await.expect("create");

    let titles: Vec<_> = articles
        .list_home()
        .await
        .expect("home")
        .into_iter()
        .map(|summary| summary.title)
        .collect();
    assert_eq!(titles, ["Heavy", "Light"]);
}

#[tokio::test]
async fn unknown_category_renders_an_empty_name() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");
    let article = articles.create(draft(go, "Orphaned", 0)).await.expect("create");

    harness.app.categories.delete(go).await.expect("delete category");

    let view = articles.get(article.id).await.expect("article still readable");
    assert_eq!(view.category_name, "");
}

#[tokio::test]
async fn moving_an_article_carries_its_counts() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");
    let rust = harness.store.seed_category("Rust");
    let article = articles.create(draft(go, "Wanderer", 0)).await.expect("create");

    let before = articles
        .list_by_category(go, PageRequest::unpaged())
        .await
        .expect("go listing");
    assert_eq!(before.total, 1);
    let before = articles
        .list_by_category(rust, PageRequest::unpaged())
        .await
        .expect("rust listing");
    assert_eq!(before.total, 0);
    assert_eq!(
        category_counts(&harness).await,
        [("Go".to_string(), 1), ("Rust".to_string(), 0)]
    );

    articles
        .update_info(retitle(article.id, rust))
        .await
        .expect("move");

    let go_listing = articles
        .list_by_category(go, PageRequest::unpaged())
        .await
        .expect("go listing");
    assert!(go_listing.items.is_empty());
    assert_eq!(go_listing.total, 0);

    let rust_listing = articles
        .list_by_category(rust, PageRequest::unpaged())
        .await
        .expect("rust listing");
    assert_eq!(rust_listing.items.len(), 1);
    assert_eq!(rust_listing.total, 1);
    assert_eq!(rust_listing.items[0].category_name, "Rust");

    assert_eq!(harness.store.category_row(go).expect("row").article_count, 0);
    assert_eq!(
        harness.store.category_row(rust).expect("row").article_count,
        1
    );
    assert_eq!(
        category_counts(&harness).await,
        [("Go".to_string(), 0), ("Rust".to_string(), 1)]
    );
}

#[tokio::test]
async fn moving_to_a_missing_category_changes_nothing() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");
    let article = articles.create(draft(go, "Stays", 0)).await.expect("create");

    assert!(matches!(
        articles.update_info(retitle(article.id, 404)).await,
        Err(AppError::NotFound { entity: "category" })
    ));

    let row = harness.store.article_row(article.id).expect("row");
    assert_eq!(row.category_id, go);
    assert_eq!(row.title, "Stays");
    assert_eq!(harness.store.category_row(go).expect("row").article_count, 1);
}

#[tokio::test]
async fn deleting_twice_does_not_decrement_again() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");
    let first = articles.create(draft(go, "First", 0)).await.expect("create");
    articles.create(draft(go, "Second", 0)).await.expect("create");

    let stale = harness.store.article_row(first.id).expect("row");
    articles.delete(first.id).await.expect("delete");

    // A racing reader may put the pre-delete row back before its load finished.
    let key = CacheNamespace::articles().id(first.id);
    harness
        .cache
        .set(&key, serde_json::to_vec(&stale).expect("encode"), None)
        .await
        .expect("reinstall");

    assert!(matches!(
        articles.delete(first.id).await,
        Err(AppError::NotFound { entity: "article" })
    ));
    assert_eq!(harness.store.category_row(go).expect("row").article_count, 1);
    assert!(!harness.cache.inner().contains_key(&key));
    assert!(matches!(
        articles.get(first.id).await,
        Err(AppError::NotFound { entity: "article" })
    ));
}

#[tokio::test]
async fn article_writes_without_the_cache_keep_totals_right() {
    let harness = Harness::new();
    let articles = &harness.app.articles;
    let go = harness.store.seed_category("Go");

    harness.cache.fail(true);
    let kept = articles.create(draft(go, "Kept", 0)).await.expect("create");
    let gone = articles.create(draft(go, "Gone", 0)).await.expect("create");
    articles.delete(gone.id).await.expect("delete");

    let listing = articles.list(PageRequest::unpaged()).await.expect("listing");
    assert_eq!(listing.total, 1);
    assert_eq!(listing.items[0].id, kept.id);
    let in_go = articles
        .list_by_category(go, PageRequest::unpaged())
        .await
        .expect("go listing");
    assert_eq!(in_go.total, 1);
    assert_eq!(category_counts(&harness).await, [("Go".to_string(), 1)]);

    articles.list(PageRequest::unpaged()).await.expect("listing");
    assert_eq!(harness.store.count_loads.load(Ordering::SeqCst), 3);

    harness.cache.fail(false);
    assert!(harness.cache.inner().is_empty());
    let listing = articles.list(PageRequest::unpaged()).await.expect("listing");
    assert_eq!(listing.total, 1);
    assert_eq!(
        articles
            .list_by_category(go, PageRequest::unpaged())
            .await
            .expect("go listing")
            .total,
        1
    );
}
