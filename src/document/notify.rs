//! Change notification and edit batching.

use super::{Document, State};
use crate::model::ItemId;

/// Structural or data change reported to subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Values of `first..=last` (siblings) changed.
    DataChanged { first: ItemId, last: ItemId },
    RowsInserted { parent: ItemId, first: usize, last: usize },
    RowsRemoved { parent: ItemId, first: usize, last: usize },
    /// Link tables were rebuilt.
    LinksChanged,
    /// The whole document was replaced.
    Reset,
}

/// Handle returned by [`Document::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

type Observer = Box<dyn FnMut(&ChangeEvent)>;

/// Refreshes postponed while a batch is open.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct Pending {
    pub header: bool,
    pub links: bool,
    pub footer: bool,
}

#[derive(Default)]
pub(super) struct Notifier {
    observers: Vec<(SubscriptionId, Observer)>,
    next_id: usize,
    depth: u32,
    pub pending: Pending,
    /// Root rows touched during the batch.
    touched: Option<(usize, usize)>,
}

impl Notifier {
    fn touch(&mut self, first: usize, last: usize) {
        self.touched = Some(match self.touched {
            Some((a, b)) => (a.min(first), b.max(last)),
            None => (first, last),
        });
    }

    fn dispatch(&mut self, ev: &ChangeEvent) {
        for (_, f) in &mut self.observers {
            f(ev);
        }
    }

    #[inline]
    pub fn batching(&self) -> bool {
        self.depth > 0
    }
}

impl Document {
    /// Register a change callback.
    pub fn subscribe(&mut self, f: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.notify.next_id);
        self.notify.next_id += 1;
        self.notify.observers.push((id, Box::new(f)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.notify.observers.len();
        self.notify.observers.retain(|(i, _)| *i != id);
        before != self.notify.observers.len()
    }

    /// Root rows an event affects.
    fn root_rows(&self, ev: &ChangeEvent) -> Option<(usize, usize)> {
        let root = self.root();
        let row_of = |id: ItemId| self.top_level(id).map(|t| self.tree.row(t));
        match ev {
            ChangeEvent::DataChanged { first, last } => Some((row_of(*first)?, row_of(*last)?)),
            ChangeEvent::RowsInserted { parent, first, last }
            | ChangeEvent::RowsRemoved { parent, first, last } => {
                if *parent == root {
                    Some((*first, *last))
                } else {
                    let r = row_of(*parent)?;
                    Some((r, r))
                }
            }
            ChangeEvent::LinksChanged | ChangeEvent::Reset => None,
        }
    }

    pub(crate) fn emit(&mut self, ev: ChangeEvent) {
        if self.state == State::Loading {
            return;
        }
        if self.notify.batching() {
            if let Some((a, b)) = self.root_rows(&ev) {
                self.notify.touch(a, b);
            }
            return;
        }
        self.notify.dispatch(&ev);
    }

    pub fn is_batching(&self) -> bool {
        self.notify.batching()
    }

    /// Start suppressing notifications and deferring refreshes. Batches nest.
    pub fn begin_batch(&mut self) {
        self.notify.depth += 1;
    }

    /// Close a batch. The outermost close runs the deferred refreshes and
    /// emits one `DataChanged` over the touched root rows.
    pub fn end_batch(&mut self) {
        match self.notify.depth {
            0 => return,
            1 => {}
            _ => {
                self.notify.depth -= 1;
                return;
            }
        }

        let pending = std::mem::take(&mut self.notify.pending);
        if pending.header {
            self.refresh_header();
        }
        if pending.links {
            self.refresh_links();
        }
        if pending.footer {
            self.refresh_footer();
        }
        self.notify.depth = 0;

        if let Some((a, b)) = self.notify.touched.take() {
            let root = self.root();
            if let (Some(first), Some(last)) = (self.tree.child(root, a), self.tree.child(root, b)) {
                self.notify.dispatch(&ChangeEvent::DataChanged { first, last });
            }
        }
    }

    /// Run `f` inside a batch.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_batch();
        let r = f(self);
        self.end_batch();
        r
    }

    /// Link values changed: rebuild link tables and footer roots.
    pub(crate) fn links_changed(&mut self) {
        if self.state == State::Loading {
            return;
        }
        if self.notify.batching() {
            self.notify.pending.links = true;
            self.notify.pending.footer = true;
            return;
        }
        self.refresh_links();
        self.refresh_footer();
        self.emit(ChangeEvent::LinksChanged);
    }

    /// Block list changed: also refresh the header tables.
    pub(crate) fn blocks_changed(&mut self) {
        if self.state == State::Loading {
            return;
        }
        self.update_header();
        self.links_changed();
    }
}
