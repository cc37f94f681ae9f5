//! Bookkeeping for computes that are currently running.

use hashbrown::HashMap;
use std::hash::Hash;
use tokio::sync::broadcast;

pub(crate) type ResultSender<V, E> = broadcast::Sender<Result<V, E>>;
pub(crate) type ResultReceiver<V, E> = broadcast::Receiver<Result<V, E>>;

struct Flight<V, E> {
    id: u64,
    sender: ResultSender<V, E>,
}

/// Outcome of [`InFlight::join_or_lead`].
pub(crate) enum Joined<V, E> {
    /// Another caller is already computing this key.
    Waiter(ResultReceiver<V, E>),
    /// The caller must compute the key and publish through the sender.
    Leader { id: u64, sender: ResultSender<V, E> },
}

/// Map from key to the broadcast channel of the compute running for it.
///
/// Every flight carries a unique id so a finishing compute only removes its
/// own entry, never one registered after an invalidation.
pub(crate) struct InFlight<K, V, E> {
    flights: HashMap<K, Flight<V, E>>,
    next_id: u64,
}

impl<K: Hash + Eq, V, E> InFlight<K, V, E> {
    pub(crate) fn new() -> Self {
        Self {
            flights: HashMap::new(),
            next_id: 0,
        }
    }

    /// Removes the flight for `key` if it is still the one identified by `id`.
    pub(crate) fn finish(&mut self, key: &K, id: u64) {
        if self.flights.get(key).is_some_and(|flight| flight.id == id) {
            self.flights.remove(key);
        }
    }

    /// Forgets every flight. Running computes still deliver to the callers
    /// that already joined them.
    pub(crate) fn clear(&mut self) {
        self.flights.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.flights.len()
    }
}

impl<K, V, E> InFlight<K, V, E>
where
    K: Hash + Eq,
    V: Clone,
    E: Clone,
{
    /// Subscribes to the running compute for `key`, or registers the caller as
    /// its leader.
    pub(crate) fn join_or_lead(&mut self, key: K) -> Joined<V, E> {
        if let Some(flight) = self.flights.get(&key) {
            return Joined::Waiter(flight.sender.subscribe());
        }

        // One result per flight, so a single slot is enough.
        let (sender, _) = broadcast::channel(1);
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.flights.insert(
            key,
            Flight {
                id,
                sender: sender.clone(),
            },
        );
        Joined::Leader { id, sender }
    }
}
