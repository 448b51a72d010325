use crate::{error::Error, util::Sequence};

#[derive(Eq, PartialEq, Debug)]
pub enum ResourceState {
    Empty,
    Loading,
    Resolved,
    Rejected,
}

/// Identifies one issued fetch.  A result is applied only while its ticket is
/// the pending one, so answers for a superseded key, or for a fetch that was
/// re-issued in the meantime, are dropped.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Ticket<K> {
    pub key: K,
    seq: u64,
}

/// Remote value keyed by a (possibly absent) key.  Fetching is left to the
/// caller: `set_key` and `refetch` hand out a `Ticket` to fetch for, and the
/// outcome is fed back through `update`.  No fetch is issued while the key is
/// absent.
#[derive(Debug)]
pub struct Resource<K, V> {
    key: Option<K>,
    value: Option<V>,
    error: Option<Error>,
    pending: Option<Ticket<K>>,
    sequence: Sequence<u64>,
}

impl<K: Clone + PartialEq, V> Resource<K, V> {
    pub fn new() -> Self {
        Self {
            key: None,
            value: None,
            error: None,
            pending: None,
            sequence: Sequence::default(),
        }
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn state(&self) -> ResourceState {
        if self.loading() {
            ResourceState::Loading
        } else if self.error.is_some() {
            ResourceState::Rejected
        } else if self.value.is_some() {
            ResourceState::Resolved
        } else {
            ResourceState::Empty
        }
    }

    pub fn is_pending(&self, ticket: &Ticket<K>) -> bool {
        matches!(&self.pending, Some(pending) if pending == ticket)
    }

    /// Point the resource at `key`.  A different key supersedes everything
    /// known about the previous one, including in-flight fetches.  Returns the
    /// ticket to fetch for, if any.
    pub fn set_key(&mut self, key: Option<K>) -> Option<Ticket<K>> {
        if self.key == key {
            return None;
        }
        self.key = key;
        self.value = None;
        self.error = None;
        self.pending = None;
        self.fetch()
    }

    /// Fetch the current key again.  The current value stays visible until
    /// the new result arrives.
    pub fn refetch(&mut self) -> Option<Ticket<K>> {
        self.fetch()
    }

    fn fetch(&mut self) -> Option<Ticket<K>> {
        let key = self.key.clone()?;
        let ticket = Ticket {
            key,
            seq: self.sequence.advance(),
        };
        self.pending.replace(ticket.clone());
        Some(ticket)
    }

    /// Apply a fetch result.  Returns `true` if it was applied, `false` if the
    /// ticket was stale.
    pub fn update(&mut self, (ticket, result): (Ticket<K>, Result<V, Error>)) -> bool {
        if !self.is_pending(&ticket) {
            return false;
        }
        self.pending = None;
        match result {
            Ok(value) => {
                self.value.replace(value);
                self.error = None;
            }
            Err(err) => {
                self.error.replace(err);
            }
        }
        true
    }
}

impl<K: Clone + PartialEq, V> Default for Resource<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_issues_no_fetch() {
        let mut names: Resource<String, u32> = Resource::new();
        assert_eq!(names.set_key(None), None);
        assert_eq!(names.refetch(), None);
        assert_eq!(names.state(), ResourceState::Empty);
    }

    #[test]
    fn resolves_and_reports_state() {
        let mut res: Resource<String, u32> = Resource::new();
        let ticket = res.set_key(Some("a".into())).unwrap();
        assert!(res.loading());
        assert_eq!(res.state(), ResourceState::Loading);
        assert!(res.update((ticket, Ok(1))));
        assert_eq!(res.value(), Some(&1));
        assert_eq!(res.state(), ResourceState::Resolved);
    }

    #[test]
    fn same_key_is_not_refetched() {
        let mut res: Resource<String, u32> = Resource::new();
        assert!(res.set_key(Some("a".into())).is_some());
        assert!(res.set_key(Some("a".into())).is_none());
    }

    #[test]
    fn late_result_for_old_key_is_dropped() {
        let mut res: Resource<String, u32> = Resource::new();
        let first = res.set_key(Some("k1".into())).unwrap();
        let second = res.set_key(Some("k2".into())).unwrap();
        assert!(res.update((second, Ok(2))));
        assert!(!res.update((first, Ok(1))));
        assert_eq!(res.value(), Some(&2));
        assert_eq!(res.key(), Some(&"k2".to_string()));
    }

    #[test]
    fn refetch_supersedes_earlier_fetch_of_same_key() {
        let mut res: Resource<String, u32> = Resource::new();
        let first = res.set_key(Some("k".into())).unwrap();
        let second = res.refetch().unwrap();
        assert_ne!(first, second);
        assert!(!res.update((first, Ok(1))));
        assert!(res.loading());
        assert!(res.update((second, Ok(2))));
        assert_eq!(res.value(), Some(&2));
    }

    #[test]
    fn error_is_captured_and_cleared_by_success() {
        let mut res: Resource<String, u32> = Resource::new();
        let ticket = res.set_key(Some("k".into())).unwrap();
        assert!(res.update((ticket, Ok(1))));

        let ticket = res.refetch().unwrap();
        assert_eq!(res.value(), Some(&1));
        assert!(res.update((ticket, Err(Error::ServerError { status: 500 }))));
        assert_eq!(res.state(), ResourceState::Rejected);
        assert!(matches!(res.error(), Some(Error::ServerError { status: 500 })));

        let ticket = res.refetch().unwrap();
        assert!(res.update((ticket, Ok(3))));
        assert!(res.error().is_none());
        assert_eq!(res.value(), Some(&3));
    }

    #[test]
    fn key_change_drops_previous_value() {
        let mut res: Resource<String, u32> = Resource::new();
        let ticket = res.set_key(Some("a".into())).unwrap();
        res.update((ticket, Ok(1)));
        res.set_key(None);
        assert_eq!(res.value(), None);
        assert!(!res.loading());
    }
}
