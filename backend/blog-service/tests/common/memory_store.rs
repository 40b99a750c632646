//! In-memory `LinkStore` / `UserDirectory` with injectable faults.
//!
//! Transactions work on a private copy of the data and publish it on commit,
//! replacing whatever the shared copy holds. The store is single-writer only:
//! overlapping transactions are not isolated from each other, so concurrent
//! cascades are exercised against PostgreSQL instead.
//! `detach_on_begin` stands in for another writer committing between a
//! concurrent-mode fan-out and its final transaction.

use async_trait::async_trait;
use blog_service::models::{Category, CategoryListQuery, CategoryPage, PostCategory, User};
use blog_service::store::{LinkStore, LinkTransaction, StoreError, StoreResult, UserDirectory};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Data {
    categories: HashMap<Uuid, Category>,
    posts: HashSet<Uuid>,
    links: BTreeSet<(Uuid, Uuid)>,
    users: HashMap<Uuid, User>,
}

impl Data {
    fn posts_in(&self, category_id: Uuid) -> Vec<Uuid> {
        self.links
            .iter()
            .filter(|(_, category)| *category == category_id)
            .map(|(post, _)| *post)
            .collect()
    }

    fn link_count(&self, post_id: Uuid) -> i64 {
        self.links.iter().filter(|(post, _)| *post == post_id).count() as i64
    }

    fn move_link(&mut self, post_id: Uuid, from: Uuid, to: Uuid) -> StoreResult<u64> {
        if !self.links.contains(&(post_id, from)) {
            return Ok(0);
        }
        if !self.categories.contains_key(&to) {
            return Err(StoreError::Conflict(format!("category {} does not exist", to)));
        }
        if self.links.contains(&(post_id, to)) {
            return Err(StoreError::Conflict(format!(
                "post {} is already linked to {}",
                post_id, to
            )));
        }
        self.links.remove(&(post_id, from));
        self.links.insert((post_id, to));
        Ok(1)
    }

    fn unlinked(&self, post_ids: &[Uuid]) -> Vec<Uuid> {
        post_ids
            .iter()
            .copied()
            .filter(|id| self.posts.contains(id) && self.link_count(*id) == 0)
            .collect()
    }

    fn delete_links_for(&mut self, category_id: Uuid) -> u64 {
        let before = self.links.len();
        self.links.retain(|(_, category)| *category != category_id);
        (before - self.links.len()) as u64
    }
}

#[derive(Debug, Default)]
struct Faults {
    failing_posts: HashSet<Uuid>,
    fail_category_delete: bool,
    detach_on_begin: Vec<(Uuid, Uuid)>,
}

#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<Mutex<Data>>,
    faults: Arc<Mutex<Faults>>,
    fallback_name: String,
    list_calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new(fallback_name: &str) -> Self {
        Self {
            data: Arc::new(Mutex::new(Data::default())),
            faults: Arc::new(Mutex::new(Faults::default())),
            fallback_name: fallback_name.to_string(),
            list_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn add_category(&self, category: Category) -> Uuid {
        let id = category.id;
        self.data.lock().unwrap().categories.insert(id, category);
        id
    }

    pub fn add_user(&self, user: User) -> Uuid {
        let id = user.id;
        self.data.lock().unwrap().users.insert(id, user);
        id
    }

    /// Create a post linked to each of `categories`.
    pub fn add_post(&self, categories: &[Uuid]) -> Uuid {
        let post_id = Uuid::new_v4();
        let mut data = self.data.lock().unwrap();
        data.posts.insert(post_id);
        for category_id in categories {
            data.links.insert((post_id, *category_id));
        }
        post_id
    }

    pub fn fail_updates_for(&self, post_id: Uuid) {
        self.faults.lock().unwrap().failing_posts.insert(post_id);
    }

    pub fn fail_category_delete(&self) {
        self.faults.lock().unwrap().fail_category_delete = true;
    }

    /// Drop the `(post_id, category_id)` link right before the next
    /// transaction starts.
    pub fn detach_on_begin(&self, post_id: Uuid, category_id: Uuid) {
        self.faults
            .lock()
            .unwrap()
            .detach_on_begin
            .push((post_id, category_id));
    }

    pub fn has_category(&self, category_id: Uuid) -> bool {
        self.data.lock().unwrap().categories.contains_key(&category_id)
    }

    pub fn categories_of(&self, post_id: Uuid) -> BTreeSet<Uuid> {
        self.data
            .lock()
            .unwrap()
            .links
            .iter()
            .filter(|(post, _)| *post == post_id)
            .map(|(_, category)| *category)
            .collect()
    }

    pub fn links(&self) -> Vec<PostCategory> {
        self.data
            .lock()
            .unwrap()
            .links
            .iter()
            .map(|(post_id, category_id)| PostCategory {
                post_id: *post_id,
                category_id: *category_id,
            })
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_update(&self, post_id: Uuid) -> StoreResult<()> {
        if self.faults.lock().unwrap().failing_posts.contains(&post_id) {
            return Err(StoreError::Unavailable(format!(
                "injected failure for post {}",
                post_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn find_category_by_id(&self, category_id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.data.lock().unwrap().categories.get(&category_id).cloned())
    }

    async fn find_fallback_category(&self) -> StoreResult<Option<Category>> {
        let wanted = self.fallback_name.to_lowercase();
        Ok(self
            .data
            .lock()
            .unwrap()
            .categories
            .values()
            .find(|c| c.name.to_lowercase() == wanted)
            .cloned())
    }

    async fn find_post_ids_linked_to_category(&self, category_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self.data.lock().unwrap().posts_in(category_id))
    }

    async fn count_links_for_post(&self, post_id: Uuid) -> StoreResult<i64> {
        Ok(self.data.lock().unwrap().link_count(post_id))
    }

    async fn update_link(
        &self,
        post_id: Uuid,
        from_category: Uuid,
        to_category: Uuid,
    ) -> StoreResult<u64> {
        self.check_update(post_id)?;
        self.data
            .lock()
            .unwrap()
            .move_link(post_id, from_category, to_category)
    }

    async fn list_categories(&self, query: &CategoryListQuery) -> StoreResult<CategoryPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let data = self.data.lock().unwrap();

        let mut matching: Vec<Category> = data
            .categories
            .values()
            .filter(|c| match &query.search {
                Some(search) => c.name.to_lowercase().contains(search),
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));

        let categories_count = matching.len() as i64;
        let categories = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();

        Ok(CategoryPage {
            categories,
            categories_count,
        })
    }

    async fn begin(&self) -> StoreResult<Box<dyn LinkTransaction>> {
        let detached: Vec<(Uuid, Uuid)> =
            self.faults.lock().unwrap().detach_on_begin.drain(..).collect();
        let working = {
            let mut data = self.data.lock().unwrap();
            for link in &detached {
                data.links.remove(link);
            }
            data.clone()
        };
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            working,
        }))
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.data.lock().unwrap().users.get(&user_id).cloned())
    }
}

pub struct MemoryTransaction {
    store: MemoryStore,
    working: Data,
}

#[async_trait]
impl LinkTransaction for MemoryTransaction {
    async fn lock_category(&mut self, category_id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.working.categories.get(&category_id).cloned())
    }

    async fn find_post_ids_linked_to_category(
        &mut self,
        category_id: Uuid,
    ) -> StoreResult<Vec<Uuid>> {
        Ok(self.working.posts_in(category_id))
    }

    async fn lock_posts(&mut self, _post_ids: &[Uuid]) -> StoreResult<()> {
        Ok(())
    }

    async fn find_unlinked_posts(&mut self, post_ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        Ok(self.working.unlinked(post_ids))
    }

    async fn count_links_for_post(&mut self, post_id: Uuid) -> StoreResult<i64> {
        Ok(self.working.link_count(post_id))
    }

    async fn update_link(
        &mut self,
        post_id: Uuid,
        from_category: Uuid,
        to_category: Uuid,
    ) -> StoreResult<u64> {
        self.store.check_update(post_id)?;
        self.working.move_link(post_id, from_category, to_category)
    }

    async fn delete_links_for_category(&mut self, category_id: Uuid) -> StoreResult<u64> {
        Ok(self.working.delete_links_for(category_id))
    }

    async fn delete_category(&mut self, category_id: Uuid) -> StoreResult<bool> {
        if self.store.faults.lock().unwrap().fail_category_delete {
            return Err(StoreError::Unavailable("injected category delete failure".into()));
        }
        if self.working.posts_in(category_id).is_empty() {
            Ok(self.working.categories.remove(&category_id).is_some())
        } else {
            Err(StoreError::Conflict(format!(
                "category {} is still referenced by posts",
                category_id
            )))
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction { store, working } = *self;
        *store.data.lock().unwrap() = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
