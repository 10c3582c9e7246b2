//! History Components
//!
//! Per-agent record of what was shown, read and authored, split into epochs
//! at every reset so repeated trials can be compared.

use feed_events::{Post, PostId};

fn insert_sorted(ids: &mut Vec<PostId>, id: PostId) {
    if let Err(pos) = ids.binary_search(&id) {
        ids.insert(pos, id);
    }
}

/// One segment of an agent's history, bounded by resets
#[derive(Debug, Clone, Default)]
pub struct Epoch {
    read: Vec<Post>,
    /// Sorted, deduplicated ids of `read`
    read_ids: Vec<PostId>,
    shown: Vec<Post>,
    /// Sorted ids of posts this agent wrote
    authored: Vec<PostId>,
    /// Opinion at the end of every tick
    opinions: Vec<f64>,
    engagement_total: f64,
}

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&mut self, post: Post, engagement: f64) {
        insert_sorted(&mut self.read_ids, post.id());
        self.read.push(post);
        self.engagement_total += engagement;
    }

    pub fn record_shown<'a>(&mut self, posts: impl IntoIterator<Item = &'a Post>) {
        self.shown.extend(posts.into_iter().cloned());
    }

    pub fn record_authored(&mut self, id: PostId) {
        insert_sorted(&mut self.authored, id);
    }

    pub fn has_read(&self, id: PostId) -> bool {
        self.read_ids.binary_search(&id).is_ok()
    }

    pub fn has_authored(&self, id: PostId) -> bool {
        self.authored.binary_search(&id).is_ok()
    }

    pub fn read(&self) -> &[Post] {
        &self.read
    }

    pub fn shown(&self) -> &[Post] {
        &self.shown
    }

    pub fn authored(&self) -> &[PostId] {
        &self.authored
    }

    pub fn opinions(&self) -> &[f64] {
        &self.opinions
    }

    pub fn engagement_total(&self) -> f64 {
        self.engagement_total
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_empty()
            && self.shown.is_empty()
            && self.authored.is_empty()
            && self.opinions.is_empty()
    }
}

/// All epochs of one agent plus a running tick counter
#[derive(Debug, Clone)]
pub struct History {
    epochs: Vec<Epoch>,
    /// Ticks recorded across every epoch
    time_index: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// A history with its first epoch already open.
    pub fn new() -> Self {
        Self {
            epochs: vec![Epoch::new()],
            time_index: 0,
        }
    }

    /// Closes the current epoch and opens an empty one.
    pub fn new_epoch(&mut self) {
        self.epochs.push(Epoch::new());
    }

    /// Records the end of a tick.
    pub fn store_data(&mut self, opinion: f64) {
        self.current_mut().opinions.push(opinion);
        self.time_index += 1;
    }

    pub fn current(&self) -> &Epoch {
        // never empty: created with one epoch, only ever appended to
        &self.epochs[self.epochs.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut Epoch {
        let last = self.epochs.len() - 1;
        &mut self.epochs[last]
    }

    pub fn epoch(&self, index: usize) -> Option<&Epoch> {
        self.epochs.get(index)
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn epoch_count(&self) -> usize {
        self.epochs.len()
    }

    pub fn time_index(&self) -> u64 {
        self.time_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: u64) -> Post {
        Post::new(PostId(id), 0.5, 0.5).unwrap()
    }

    #[test]
    fn test_read_index_is_sorted_and_unique() {
        let mut epoch = Epoch::new();
        for id in [9, 3, 7, 3, 1] {
            epoch.record_read(post(id), 0.1);
        }

        assert_eq!(epoch.read().len(), 5);
        assert_eq!(epoch.read_ids, vec![PostId(1), PostId(3), PostId(7), PostId(9)]);
        assert!(epoch.has_read(PostId(7)));
        assert!(!epoch.has_read(PostId(2)));
        assert!((epoch.engagement_total() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_authored_lookup() {
        let mut epoch = Epoch::new();
        epoch.record_authored(PostId(12));
        epoch.record_authored(PostId(4));

        assert!(epoch.has_authored(PostId(4)));
        assert!(!epoch.has_authored(PostId(5)));
        assert_eq!(epoch.authored(), &[PostId(4), PostId(12)]);
    }

    #[test]
    fn test_new_epoch_starts_empty() {
        let mut history = History::new();
        history.current_mut().record_read(post(1), 0.2);
        history.current_mut().record_shown([&post(2), &post(3)]);
        history.store_data(0.6);

        history.new_epoch();

        assert_eq!(history.epoch_count(), 2);
        assert!(history.current().is_empty());
        assert_eq!(history.epoch(0).unwrap().shown().len(), 2);
        assert_eq!(history.epoch(0).unwrap().opinions(), &[0.6]);
        assert_eq!(history.time_index(), 1);
    }
}
