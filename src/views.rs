//! Article view log and the category ranking built from it.
//!
//! Views are append-only events: recording one is fire-and-forget and never
//! bothers the user with failures.

use indexmap::IndexMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::session::Session;
use crate::store::{NewRow, RemoteStore, Table};
use crate::toggle::ToggleError;

/// A category together with how many of the subject's views it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

pub struct ArticleViews {
    store: Arc<dyn RemoteStore>,
    session: Session,
}

impl ArticleViews {
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self { store, session }
    }

    /// Append a view row in the background.
    ///
    /// Returns `None` when nobody is signed in; otherwise the handle of the
    /// spawned write, which callers are free to drop.
    pub fn record_view(&self, article_id: &str, category: &str) -> Option<JoinHandle<()>> {
        let subject = self.session.subject()?;
        let store = Arc::clone(&self.store);
        let row = NewRow::new(subject.id, article_id).with_category(category);
        Some(tokio::spawn(async move {
            let article = row.key.clone();
            if let Err(e) = store.insert(Table::ArticleViews, row).await {
                tracing::warn!(article = %article, error = %e, "Failed to record article view");
            }
        }))
    }

    /// Categories ordered by descending view count. Ties keep the order in
    /// which the categories first appear in the subject's view rows.
    pub async fn get_top_categories(&self, limit: Option<usize>) -> Result<Vec<String>, ToggleError> {
        Ok(self
            .category_counts()
            .await?
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|c| c.category)
            .collect())
    }

    pub async fn category_counts(&self) -> Result<Vec<CategoryCount>, ToggleError> {
        let Some(subject) = self.session.subject() else {
            return Ok(Vec::new());
        };
        let categories = self
            .store
            .select_view_categories(&subject.id)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to load article views"))?;
        Ok(rank_categories(categories))
    }
}

/// Count occurrences and sort by count, stable on first appearance.
pub fn rank_categories<I>(categories: I) -> Vec<CategoryCount>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for category in categories {
        *counts.entry(category.into()).or_insert(0) += 1;
    }
    let mut ranked: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    // `sort_by` is stable, which is what keeps first-seen order for ties.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MockRemoteStore, SqliteStore};

    #[test]
    fn ranks_by_count() {
        let ranked = rank_categories(["a", "b", "a", "c", "b", "a"]);
        let names: Vec<_> = ranked.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        let counts: Vec<_> = ranked.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![3, 2, 1]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let ranked = rank_categories(["z", "m", "a", "m", "z", "a", "q"]);
        let names: Vec<_> = ranked.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["z", "m", "a", "q"]);
        assert!(rank_categories(Vec::<String>::new()).is_empty());
    }

    #[tokio::test]
    async fn record_then_rank() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let views = ArticleViews::new(store, Session::signed_in("u1"));
        for (article, category) in [
            ("1", "a"),
            ("2", "b"),
            ("3", "a"),
            ("4", "c"),
            ("5", "b"),
            ("6", "a"),
        ] {
            views.record_view(article, category).unwrap().await.unwrap();
        }
        assert_eq!(views.get_top_categories(None).await.unwrap(), vec!["a", "b", "c"]);
        assert_eq!(views.get_top_categories(Some(2)).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn signed_out_views_do_nothing() {
        let store = Arc::new(MockRemoteStore::new());
        let views = ArticleViews::new(store, Session::anonymous());
        assert!(views.record_view("1", "a").is_none());
        assert!(views.get_top_categories(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_view_write_is_swallowed() {
        let mut store = MockRemoteStore::new();
        store
            .expect_insert()
            .times(1)
            .returning(|_, _| Err(crate::store::StoreError::Remote("down".into())));
        let views = ArticleViews::new(Arc::new(store), Session::signed_in("u1"));
        views.record_view("1", "a").unwrap().await.unwrap();
    }
}
