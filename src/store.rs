use log::{debug, info};

use crate::{
    api::{CatchesApi, Error},
    charts::{self, ChartData, ChartKind},
    filter,
    models::{Catch, CatchDraft},
    page,
};

/// Everything the table renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView<'a> {
    pub rows: &'a [Catch],
    pub page: usize,
    pub page_count: usize,
    pub filtered_total: usize,
    pub total: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

/// The locally cached record set for one user, plus its derived view state.
///
/// The full set is only ever replaced wholesale by a completed refresh; the
/// filtered subset is recomputed from it and the current keyword after every
/// mutation and never edited directly. All methods take `&mut self`, so the
/// store is owned by a single logical thread of control.
#[derive(Debug)]
pub struct CatchStore<A> {
    api: A,
    all: Vec<Catch>,
    filtered: Vec<Catch>,
    keyword: String,
    current_page: usize,
    issued_refreshes: u64,
}

impl<A: CatchesApi> CatchStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            all: Vec::new(),
            filtered: Vec::new(),
            keyword: String::new(),
            current_page: 1,
            issued_refreshes: 0,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Replace the full set with the backend's current records. On failure
    /// the cached state is left exactly as it was. With `keep_page` the
    /// current page survives (clamped to the new page count); otherwise the
    /// view resets to page 1.
    pub async fn refresh(&mut self, keep_page: bool) -> Result<(), Error> {
        self.issued_refreshes += 1;
        let seq = self.issued_refreshes;
        debug!("issuing refresh #{seq}");

        let catches = self.api.catches().await?;
        self.apply_refresh(seq, catches, keep_page);

        Ok(())
    }

    /// Submit a new catch, then reload. The table resets to page 1 so the
    /// newest entry is visible.
    pub async fn create(&mut self, draft: CatchDraft) -> Result<(), Error> {
        let draft = draft.with_defaults();
        self.api.log_catch(&draft).await?;
        self.refresh(false).await
    }

    /// Replace the fields of an existing catch, then reload in place.
    pub async fn update(&mut self, id: i64, draft: CatchDraft) -> Result<(), Error> {
        let draft = draft.with_defaults();
        self.api.edit_catch(id, &draft).await?;
        self.refresh(true).await
    }

    /// Delete a catch, then reload in place; the current page is clamped if
    /// the last row of the final page went away.
    pub async fn delete(&mut self, id: i64) -> Result<(), Error> {
        self.api.delete_catch(id).await?;
        self.refresh(true).await
    }

    /// Change the active search keyword and jump back to page 1.
    pub fn set_keyword(&mut self, keyword: &str) {
        self.keyword = keyword.to_string();
        self.rebuild(false);
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn all(&self) -> &[Catch] {
        &self.all
    }

    pub fn filtered(&self) -> &[Catch] {
        &self.filtered
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        page::count(&self.filtered)
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.page_count()
    }

    /// Move one page forward. A no-op on the last page (and when there are
    /// no pages at all); returns whether the page changed.
    pub fn next_page(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.current_page += 1;
        true
    }

    /// Move one page back. A no-op on page 1; returns whether the page
    /// changed.
    pub fn prev_page(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.current_page -= 1;
        true
    }

    /// Jump to a specific page; out-of-range requests are rejected.
    pub fn set_page(&mut self, target: usize) -> bool {
        if target == 0 || target > self.page_count() {
            return false;
        }
        self.current_page = target;
        true
    }

    pub fn view(&self) -> TableView<'_> {
        TableView {
            rows: page::slice(&self.filtered, self.current_page),
            page: self.current_page,
            page_count: self.page_count(),
            filtered_total: self.filtered.len(),
            total: self.all.len(),
            has_prev: self.has_prev(),
            has_next: self.has_next(),
        }
    }

    /// Chart summary over the full set, recomputed on demand. Search and
    /// pagination never affect charts.
    pub fn chart(&self, kind: ChartKind) -> ChartData {
        charts::build(kind, &self.all)
    }

    // Only the most recently issued refresh may land; anything older is a
    // stale in-flight fetch and is dropped.
    fn apply_refresh(&mut self, seq: u64, catches: Vec<Catch>, keep_page: bool) {
        if seq < self.issued_refreshes {
            debug!(
                "discarding refresh #{seq}, #{} was issued later",
                self.issued_refreshes
            );
            return;
        }

        info!("loaded {} catches", catches.len());
        self.all = catches;
        self.rebuild(keep_page);
    }

    fn rebuild(&mut self, keep_page: bool) {
        self.filtered = filter::apply(&self.all, &self.keyword);

        let page_count = self.page_count();
        self.current_page = if keep_page {
            self.current_page.clamp(1, page_count.max(1))
        } else {
            1
        };
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    };

    use async_trait::async_trait;

    use super::*;

    /// In-memory stand-in for the backend.
    #[derive(Clone, Default)]
    struct FakeApi {
        catches: Arc<Mutex<Vec<Catch>>>,
        next_id: Arc<Mutex<i64>>,
        broken: Arc<AtomicBool>,
    }

    impl FakeApi {
        fn failure(&self) -> Option<Error> {
            self.broken.load(Ordering::Relaxed).then(|| Error::Validation {
                reason: "backend down".to_string(),
            })
        }
    }

    #[async_trait]
    impl CatchesApi for FakeApi {
        async fn catches(&self) -> Result<Vec<Catch>, Error> {
            match self.failure() {
                Some(error) => Err(error),
                None => Ok(self.catches.lock().unwrap().clone()),
            }
        }

        async fn log_catch(&self, draft: &CatchDraft) -> Result<(), Error> {
            if let Some(error) = self.failure() {
                return Err(error);
            }

            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            self.catches.lock().unwrap().push(Catch {
                id: *next_id,
                user_id: Some("tester".to_string()),
                date: draft.date.clone(),
                time: draft.time.clone(),
                location: draft.location.clone(),
                species: draft.species.clone(),
                bait: draft.bait.clone(),
                length_in: draft.length_in,
                weight_lbs: draft.weight_lbs,
                temperature: draft.temperature,
            });
            Ok(())
        }

        async fn edit_catch(&self, id: i64, draft: &CatchDraft) -> Result<(), Error> {
            if let Some(error) = self.failure() {
                return Err(error);
            }

            let mut catches = self.catches.lock().unwrap();
            match catches.iter_mut().find(|catch| catch.id == id) {
                Some(catch) => {
                    catch.date = draft.date.clone();
                    catch.time = draft.time.clone();
                    catch.species = draft.species.clone();
                    Ok(())
                }
                None => Err(Error::NotFound { id }),
            }
        }

        async fn delete_catch(&self, id: i64) -> Result<(), Error> {
            if let Some(error) = self.failure() {
                return Err(error);
            }

            let mut catches = self.catches.lock().unwrap();
            let before = catches.len();
            catches.retain(|catch| catch.id != id);
            if catches.len() == before {
                return Err(Error::NotFound { id });
            }
            Ok(())
        }

        async fn ping(&self) -> Result<bool, Error> {
            Ok(!self.broken.load(Ordering::Relaxed))
        }
    }

    fn draft(species: &str, date: &str) -> CatchDraft {
        CatchDraft {
            date: Some(date.to_string()),
            time: Some("08:00".to_string()),
            species: Some(species.to_string()),
            ..CatchDraft::default()
        }
    }

    async fn seeded_store(count: usize) -> CatchStore<FakeApi> {
        let api = FakeApi::default();
        let mut store = CatchStore::new(api);

        for index in 0..count {
            let day = index % 28 + 1;
            store
                .create(draft("Bass", &format!("2024-03-{day:02}")))
                .await
                .unwrap();
        }

        store
    }

    #[tokio::test]
    async fn refresh_replaces_the_full_set_wholesale() {
        let mut store = seeded_store(3).await;
        store.api().catches.lock().unwrap().clear();

        store.refresh(false).await.unwrap();

        assert!(store.all().is_empty());
        assert!(store.filtered().is_empty());
        assert_eq!(store.page_count(), 0);
    }

    #[tokio::test]
    async fn failed_refresh_leaves_the_cache_untouched() {
        let mut store = seeded_store(3).await;
        let before = store.all().to_vec();

        store.api().broken.store(true, Ordering::Relaxed);
        let result = store.refresh(false).await;

        assert!(result.is_err());
        assert_eq!(store.all(), before);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_the_cache_untouched() {
        let mut store = seeded_store(2).await;
        let before = store.all().to_vec();

        let result = store.delete(999).await;

        assert!(matches!(result, Err(Error::NotFound { id: 999 })));
        assert_eq!(store.all(), before);
    }

    #[tokio::test]
    async fn stale_refresh_results_are_discarded() {
        let mut store = seeded_store(2).await;
        let current = store.all().to_vec();

        // a fetch that was issued before the latest one comes back late
        store.issued_refreshes = 7;
        store.apply_refresh(6, Vec::new(), false);

        assert_eq!(store.all(), current);
    }

    #[tokio::test]
    async fn keyword_survives_a_refresh() {
        let mut store = seeded_store(0).await;
        store.create(draft("Bass", "2024-03-01")).await.unwrap();
        store.create(draft("Trout", "2024-03-02")).await.unwrap();

        store.set_keyword("trout");
        store.refresh(false).await.unwrap();

        assert_eq!(store.filtered().len(), 1);
        assert_eq!(store.filtered()[0].species.as_deref(), Some("Trout"));
    }

    #[tokio::test]
    async fn create_resets_to_page_one() {
        let mut store = seeded_store(30).await;
        assert!(store.next_page());
        assert_eq!(store.current_page(), 2);

        store.create(draft("Bass", "2024-03-05")).await.unwrap();

        assert_eq!(store.current_page(), 1);
        assert_eq!(store.page_count(), 2);
    }

    #[tokio::test]
    async fn delete_clamps_the_current_page() {
        let mut store = seeded_store(26).await;
        assert!(store.next_page());
        assert_eq!(store.current_page(), 2);

        let last_row_id = store.view().rows[0].id;
        store.delete(last_row_id).await.unwrap();

        assert_eq!(store.page_count(), 1);
        assert_eq!(store.current_page(), 1);
        assert!(store.all().iter().all(|catch| catch.id != last_row_id));
    }

    #[tokio::test]
    async fn update_keeps_the_current_page() {
        let mut store = seeded_store(30).await;
        assert!(store.next_page());
        let id = store.view().rows[0].id;

        store.update(id, draft("Pike", "2024-03-03")).await.unwrap();

        assert_eq!(store.current_page(), 2);
        let edited = store.all().iter().find(|catch| catch.id == id).unwrap();
        assert_eq!(edited.species.as_deref(), Some("Pike"));
    }

    #[tokio::test]
    async fn navigation_is_a_noop_at_the_bounds() {
        let mut store = seeded_store(30).await;

        assert!(!store.prev_page());
        assert!(store.next_page());
        assert!(!store.next_page());
        assert_eq!(store.current_page(), 2);

        assert!(!store.set_page(0));
        assert!(!store.set_page(3));
        assert!(store.set_page(1));
    }

    #[tokio::test]
    async fn empty_subset_is_a_degenerate_view_not_an_error() {
        let mut store = seeded_store(5).await;
        store.set_keyword("no-such-fish");

        let view = store.view();
        assert_eq!(view.page_count, 0);
        assert!(view.rows.is_empty());
        assert!(!view.has_prev);
        assert!(!view.has_next);
        assert!(!store.next_page());
        assert!(!store.prev_page());
    }

    #[tokio::test]
    async fn page_slices_partition_the_filtered_set() {
        let mut store = seeded_store(60).await;

        let mut seen = Vec::new();
        loop {
            seen.extend(store.view().rows.iter().map(|catch| catch.id));
            if !store.next_page() {
                break;
            }
        }

        assert_eq!(seen.len(), store.filtered().len());
        let mut deduped = seen.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), seen.len());
    }

    #[tokio::test]
    async fn charts_ignore_search_and_pagination() {
        let mut store = seeded_store(0).await;
        store.create(draft("Bass", "2024-03-01")).await.unwrap();
        store.create(draft("Trout", "2024-03-02")).await.unwrap();
        store.set_keyword("bass");

        let ChartData::Counts(series) = store.chart(ChartKind::SpeciesCounts) else {
            panic!("species counts should be a count series");
        };

        assert_eq!(series.labels.len(), 2);
    }
}
