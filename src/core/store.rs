//! Append-only store of every item fetched from the server

use crate::domain::{Interaction, Post, PostId};

/// A post together with the fetch batch it arrived in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPost {
    pub post: Post,
    pub batch: usize,
}

/// Ordered collection of all loaded items ("all loaded items").
///
/// Items keep server order and are never reordered or replaced. The only
/// in-place mutation is [`PostBatchStore::record_interaction`]. Memory is
/// bounded by [`PostBatchStore::evict_oldest_batches`], which drops whole
/// batches from the head while keeping the server offset intact.
#[derive(Debug, Clone, Default)]
pub struct PostBatchStore {
    items: Vec<StoredPost>,
    next_batch: usize,
    evicted: usize,
    server_total: Option<usize>,
}

impl PostBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fetched page as a new batch. Returns the batch index.
    pub fn append_batch(&mut self, posts: Vec<Post>, server_total: Option<usize>) -> usize {
        let batch = self.next_batch;
        self.next_batch += 1;
        self.items
            .extend(posts.into_iter().map(|post| StoredPost { post, batch }));
        if server_total.is_some() {
            self.server_total = server_total;
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items ever appended, including evicted ones.
    /// This is the offset of the next server page.
    pub fn server_offset(&self) -> usize {
        self.evicted + self.items.len()
    }

    pub fn evicted(&self) -> usize {
        self.evicted
    }

    pub fn batch_count(&self) -> usize {
        self.next_batch
    }

    pub fn server_total(&self) -> Option<usize> {
        self.server_total
    }

    pub fn iter(&self) -> impl Iterator<Item = &Post> + '_ {
        self.items.iter().map(|stored| &stored.post)
    }

    pub fn stored(&self) -> &[StoredPost] {
        &self.items
    }

    pub fn get(&self, id: &PostId) -> Option<&Post> {
        self.iter().find(|post| &post.id == id)
    }

    /// Narrow channel for interaction counters. Returns `false` if the item is not loaded.
    pub fn record_interaction(&mut self, id: &PostId, interaction: Interaction) -> bool {
        match self.items.iter_mut().find(|stored| &stored.post.id == id) {
            Some(stored) => {
                stored.post.apply_interaction(interaction);
                true
            }
            None => false,
        }
    }

    /// Batch indices must never decrease along the store
    pub fn is_well_ordered(&self) -> bool {
        self.items.windows(2).all(|w| w[0].batch <= w[1].batch)
            && self.items.last().map_or(true, |last| last.batch < self.next_batch)
    }

    /// Drop whole batches from the head until at most `capacity` items remain.
    ///
    /// Returns the evicted posts in store order.
    pub fn evict_oldest_batches(&mut self, capacity: usize) -> Vec<Post> {
        if self.items.len() <= capacity {
            return Vec::new();
        }

        let overflow = self.items.len() - capacity;
        let boundary_batch = self.items[overflow - 1].batch;
        let cut = self
            .items
            .iter()
            .position(|stored| stored.batch > boundary_batch)
            .unwrap_or(self.items.len());

        let evicted: Vec<Post> = self
            .items
            .drain(..cut)
            .map(|stored| stored.post)
            .collect();
        self.evicted += evicted.len();
        tracing::debug!(
            evicted = evicted.len(),
            remaining = self.items.len(),
            "evicted oldest batches"
        );
        evicted
    }

    /// Forget everything, as for a brand new session
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_posts;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_append_keeps_server_order_and_batches() {
        let mut store = PostBatchStore::new();
        let posts = make_posts(5);
        assert_eq!(store.append_batch(posts[..3].to_vec(), Some(5)), 0);
        assert_eq!(store.append_batch(posts[3..].to_vec(), None), 1);

        let ids: Vec<_> = store.iter().map(|p| p.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["post-1", "post-2", "post-3", "post-4", "post-5"]);
        assert_eq!(store.stored()[3].batch, 1);
        assert_eq!(store.server_total(), Some(5));
        assert_eq!(store.server_offset(), 5);
        assert!(store.is_well_ordered());
    }

    #[test]
    fn test_record_interaction_only_touches_counters() {
        let mut store = PostBatchStore::new();
        store.append_batch(make_posts(2), None);
        let id = PostId::from("post-2");
        let before = store.get(&id).cloned().expect("loaded");

        assert!(store.record_interaction(&id, Interaction::Like));
        assert!(!store.record_interaction(&PostId::from("missing"), Interaction::Like));

        let after = store.get(&id).expect("loaded");
        assert_eq!(after.likes, before.likes + 1);
        assert_eq!(after.title, before.title);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_evict_drops_whole_batches() {
        let mut store = PostBatchStore::new();
        let posts = make_posts(9);
        store.append_batch(posts[..3].to_vec(), None);
        store.append_batch(posts[3..6].to_vec(), None);
        store.append_batch(posts[6..].to_vec(), None);

        // 9 items, capacity 5: batch 0 alone is not enough, so batches 0 and 1 go
        let evicted = store.evict_oldest_batches(5);
        assert_eq!(evicted.len(), 6);
        assert_eq!(store.len(), 3);
        assert_eq!(store.evicted(), 6);
        assert_eq!(store.server_offset(), 9);
        assert_eq!(store.stored()[0].batch, 2);
    }

    #[test]
    fn test_evict_is_noop_under_capacity() {
        let mut store = PostBatchStore::new();
        store.append_batch(make_posts(4), None);
        assert!(store.evict_oldest_batches(4).is_empty());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_clear() {
        let mut store = PostBatchStore::new();
        store.append_batch(make_posts(4), Some(10));
        store.evict_oldest_batches(0);
        store.clear();
        assert_eq!(store.server_offset(), 0);
        assert_eq!(store.batch_count(), 0);
        assert_eq!(store.server_total(), None);
    }
}
