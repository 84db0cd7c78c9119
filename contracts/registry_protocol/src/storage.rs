//! # Storage
//!
//! The registry persists as six whole-collection documents. This module
//! names them; the file I/O lives with whoever owns the data directory.
//!
//! | Collection      | File                 | Record type          |
//! |-----------------|----------------------|----------------------|
//! | `Projects`      | `projects.json`      | `Project`            |
//! | `Stakeholders`  | `stakeholders.json`  | `Stakeholder`        |
//! | `MrvData`       | `mrv-data.json`      | `MrvData`            |
//! | `Credits`       | `credits.json`       | `CreditBatch`        |
//! | `Transactions`  | `transactions.json`  | `TransitionRecord`   |
//! | `Notifications` | `notifications.json` | `Notification`       |
//!
//! Every mutation on [`crate::Registry`] marks the collections it touched;
//! callers persist exactly those after the operation returns `Ok`.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Projects,
    Stakeholders,
    MrvData,
    Credits,
    Transactions,
    Notifications,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Stakeholders => "stakeholders",
            Self::MrvData => "mrv-data",
            Self::Credits => "credits",
            Self::Transactions => "transactions",
            Self::Notifications => "notifications",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.name())
    }
}

/// Set of collections modified since the last [`DirtySet::take`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet(BTreeSet<Collection>);

impl DirtySet {
    pub fn mark(&mut self, collection: Collection) {
        self.0.insert(collection);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drain the set, in a stable order.
    pub fn take(&mut self) -> Vec<Collection> {
        std::mem::take(&mut self.0).into_iter().collect()
    }
}
