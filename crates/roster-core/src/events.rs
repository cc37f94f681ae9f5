//! Event plumbing shared by the retry policy and the cache regions.
//!
//! Both crates describe what happened as an enum implementing
//! [`RosterEvent`], and user callbacks only care about one variant at a
//! time. [`EventListeners::on`] pairs a selector that extracts a variant's
//! payload with a callback that receives just that payload:
//!
//! ```
//! use roster_core::{EventListeners, RosterEvent};
//! use std::time::Instant;
//!
//! #[derive(Debug)]
//! enum Lookup {
//!     Hit { region: String, at: Instant },
//!     Miss { region: String, at: Instant },
//! }
//!
//! impl RosterEvent for Lookup {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             Lookup::Hit { .. } => "hit",
//!             Lookup::Miss { .. } => "miss",
//!         }
//!     }
//!     fn timestamp(&self) -> Instant {
//!         match self {
//!             Lookup::Hit { at, .. } | Lookup::Miss { at, .. } => *at,
//!         }
//!     }
//!     fn source(&self) -> &str {
//!         match self {
//!             Lookup::Hit { region, .. } | Lookup::Miss { region, .. } => region,
//!         }
//!     }
//! }
//!
//! let mut listeners = EventListeners::new();
//! listeners.on(
//!     |event: &Lookup| match event {
//!         Lookup::Miss { region, .. } => Some(region.clone()),
//!         _ => None,
//!     },
//!     |region| println!("miss in {region}"),
//! );
//! listeners.emit(&Lookup::Miss { region: "employeesAll".into(), at: Instant::now() });
//! ```

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// An observable occurrence inside a retry policy or cache region.
pub trait RosterEvent: Send + Sync + fmt::Debug {
    /// Short, stable name of the event kind (e.g. `"hit"`, `"retry"`).
    fn event_type(&self) -> &'static str;

    /// When the event was recorded.
    fn timestamp(&self) -> Instant;

    /// Name of the retry policy or cache region that emitted the event.
    fn source(&self) -> &str;
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Callbacks registered for one event family, called in registration order.
pub struct EventListeners<E> {
    callbacks: Vec<Callback<E>>,
}

impl<E: RosterEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Registers a callback that sees every event.
    pub fn add<F>(&mut self, f: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(f));
    }

    /// Registers `f` for the events `select` picks out.
    ///
    /// `select` returns the payload `f` should receive, or `None` to skip
    /// the event.
    pub fn on<T, S, F>(&mut self, select: S, f: F)
    where
        S: Fn(&E) -> Option<T> + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.add(move |event| {
            if let Some(payload) = select(event) {
                f(payload);
            }
        });
    }

    /// Delivers `event` to every callback and returns how many of them
    /// panicked. A panicking callback does not stop delivery to the rest.
    pub fn emit(&self, event: &E) -> usize {
        let mut panicked = 0;
        for callback in &self.callbacks {
            let callback: &(dyn Fn(&E) + Send + Sync) = callback.as_ref();
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                panicked += 1;
            }
        }
        panicked
    }

    /// Like [`emit`](Self::emit), but only builds the event when at least one
    /// callback is registered.
    pub fn emit_with(&self, make: impl FnOnce() -> E) -> usize {
        if self.callbacks.is_empty() {
            return 0;
        }
        self.emit(&make())
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
}

impl<E> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<E: RosterEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.callbacks.len())
            .finish()
    }
}
