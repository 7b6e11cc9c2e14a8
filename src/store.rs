//! In-memory persistence with an explicit unit of work.
//!
//! Writers call [`InvoiceBook::begin`], stage changes on the returned
//! [`UnitOfWork`] and publish them with [`UnitOfWork::commit`]. Dropping the
//! unit of work (or calling [`UnitOfWork::rollback`]) discards everything it
//! staged. Only one unit of work is open at a time; reads on the book block
//! until it is committed or dropped.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use log::debug;

use crate::error::StoreError;
use crate::input::{InvoiceDraft, InvoicePatch};
use crate::model::{Invoice, User};

pub type UserId = u64;
pub type InvoiceId = u64;

#[derive(Debug, Clone)]
struct StoredInvoice {
    owner: UserId,
    invoice: Invoice,
}

#[derive(Debug, Clone, Default)]
struct BookState {
    users: BTreeMap<UserId, User>,
    invoices: BTreeMap<InvoiceId, StoredInvoice>,
    next_user_id: UserId,
    next_invoice_id: InvoiceId,
}

impl BookState {
    fn owned(&self, owner: UserId, id: InvoiceId) -> Result<&StoredInvoice, StoreError> {
        self.invoices
            .get(&id)
            .filter(|stored| stored.owner == owner)
            .ok_or(StoreError::InvoiceNotFound(id))
    }

    fn invoices_for(&self, owner: UserId) -> Vec<(InvoiceId, Invoice)> {
        self.invoices
            .iter()
            .rev()
            .filter(|(_, stored)| stored.owner == owner)
            .map(|(id, stored)| (*id, stored.invoice.clone()))
            .collect()
    }
}

/// Users and their invoices.
#[derive(Debug, Default)]
pub struct InvoiceBook {
    state: Mutex<BookState>,
    /// Last issued invoice number. Numbers taken by a rolled-back unit of
    /// work are not reused; rejected drafts never take one.
    sequence: AtomicU64,
}

impl InvoiceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue numbering after `last_number` (e.g. `12` → next is `INV-00013`).
    pub fn with_last_number(last_number: u64) -> Self {
        Self {
            state: Mutex::default(),
            sequence: AtomicU64::new(last_number),
        }
    }

    /// Start a unit of work. It holds the book lock until it is committed,
    /// rolled back or dropped: other threads block on every book method
    /// meanwhile, and the owning thread must read through the
    /// [`UnitOfWork`] since calling the book's own readers would deadlock.
    pub fn begin(&self) -> UnitOfWork<'_> {
        let guard = self.lock();
        let staged = guard.clone();
        UnitOfWork {
            guard,
            staged,
            sequence: &self.sequence,
        }
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.lock().users.get(&id).cloned()
    }

    pub fn invoice(&self, owner: UserId, id: InvoiceId) -> Result<Invoice, StoreError> {
        self.lock().owned(owner, id).map(|stored| stored.invoice.clone())
    }

    /// All invoices of `owner`, newest first.
    pub fn invoices_for(&self, owner: UserId) -> Vec<(InvoiceId, Invoice)> {
        self.lock().invoices_for(owner)
    }

    fn lock(&self) -> MutexGuard<'_, BookState> {
        // A panic in another writer never leaves a half-applied state: staged
        // changes are only swapped in whole by `commit`.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Staged changes against an [`InvoiceBook`].
pub struct UnitOfWork<'a> {
    guard: MutexGuard<'a, BookState>,
    staged: BookState,
    sequence: &'a AtomicU64,
}

impl UnitOfWork<'_> {
    pub fn add_user(&mut self, user: User) -> UserId {
        self.staged.next_user_id += 1;
        let id = self.staged.next_user_id;
        self.staged.users.insert(id, user);
        id
    }

    /// Remove a user together with every invoice they own.
    pub fn delete_user(&mut self, id: UserId) -> Result<(), StoreError> {
        self.staged.users.remove(&id).ok_or(StoreError::UserNotFound(id))?;
        self.staged.invoices.retain(|_, stored| stored.owner != id);
        Ok(())
    }

    /// Validate `draft`, assign the next invoice number and stage it.
    pub fn create_invoice(
        &mut self,
        owner: UserId,
        draft: InvoiceDraft,
        today: NaiveDate,
    ) -> Result<InvoiceId, StoreError> {
        if !self.staged.users.contains_key(&owner) {
            return Err(StoreError::UserNotFound(owner));
        }

        let mut invoice = draft.into_invoice(String::new(), today)?;
        let number = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        invoice.invoice_number = format!("INV-{number:05}");

        self.staged.next_invoice_id += 1;
        let id = self.staged.next_invoice_id;
        debug!("staged invoice {} (id {id}) for user {owner}", invoice.invoice_number);
        self.staged.invoices.insert(id, StoredInvoice { owner, invoice });
        Ok(id)
    }

    pub fn update_invoice(
        &mut self,
        owner: UserId,
        id: InvoiceId,
        patch: InvoicePatch,
    ) -> Result<(), StoreError> {
        self.staged.owned(owner, id)?;
        if let Some(stored) = self.staged.invoices.get_mut(&id) {
            patch.apply(&mut stored.invoice)?;
        }
        Ok(())
    }

    pub fn delete_invoice(&mut self, owner: UserId, id: InvoiceId) -> Result<(), StoreError> {
        self.staged.owned(owner, id)?;
        self.staged.invoices.remove(&id);
        Ok(())
    }

    /// Read through the staged state.
    pub fn invoice(&self, owner: UserId, id: InvoiceId) -> Result<&Invoice, StoreError> {
        self.staged.owned(owner, id).map(|stored| &stored.invoice)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.staged.users.get(&id)
    }

    /// Staged invoices of `owner`, newest first.
    pub fn invoices_for(&self, owner: UserId) -> Vec<(InvoiceId, Invoice)> {
        self.staged.invoices_for(owner)
    }

    pub fn commit(mut self) {
        debug!(
            "committing {} users, {} invoices",
            self.staged.users.len(),
            self.staged.invoices.len()
        );
        *self.guard = std::mem::take(&mut self.staged);
    }

    pub fn rollback(self) {}
}
