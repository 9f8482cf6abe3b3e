//! Contact book: CRUD, search, pagination and bulk import.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{FinanceError, Result};
use crate::loans::rewrite_creation_entry;
use crate::metrics::MetricsCollector;
use crate::models::{Contact, ContactPage, NewContact};
use crate::repository;
use crate::utils::PhoneNormalizer;
use crate::validation::InputValidator;

/// Maximum number of rows returned by [`ContactService::search`]
pub const SEARCH_LIMIT: usize = 100;
/// Contacts inserted per unit of work during an import
pub const IMPORT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct ContactService {
    db: Database,
    metrics: MetricsCollector,
    phones: PhoneNormalizer,
}

impl ContactService {
    pub fn new(db: Database, metrics: MetricsCollector) -> Result<Self> {
        Ok(Self { db, metrics, phones: PhoneNormalizer::new()? })
    }

    fn validate(contact: &NewContact) -> Result<()> {
        InputValidator::validate_contact_name(&contact.name)?;
        if let Some(phone) = contact.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            InputValidator::validate_phone(phone)?;
        }
        Ok(())
    }

    fn cleaned(contact: &NewContact) -> NewContact {
        NewContact {
            name: InputValidator::sanitize_text(&contact.name),
            phone: contact.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    pub fn add(&self, contact: &NewContact) -> Result<Contact> {
        self.metrics.track("contact.add", || {
            Self::validate(contact)?;
            let conn = self.db.get_connection()?;
            let created = repository::contacts::insert(&conn, &Self::cleaned(contact))?;
            info!(contact_id = created.id, "Contact added");
            Ok(created)
        })
    }

    pub fn get(&self, id: i64) -> Result<Contact> {
        let conn = self.db.get_connection()?;
        repository::contacts::get(&conn, id)?.ok_or(FinanceError::ContactNotFound(id))
    }

    /// All contacts ordered by name
    pub fn list(&self) -> Result<Vec<Contact>> {
        let conn = self.db.get_connection()?;
        repository::contacts::list(&conn)
    }

    /// Save new details for a contact; a new name is carried into the
    /// creation entries of its loans
    pub fn update(&self, contact: &Contact) -> Result<Contact> {
        self.metrics.track("contact.update", || {
            let cleaned = Self::cleaned(&NewContact { name: contact.name.clone(), phone: contact.phone.clone() });
            Self::validate(&cleaned)?;
            let updated = Contact { id: contact.id, name: cleaned.name, phone: cleaned.phone };

            self.db.unit_of_work("contact.update", |conn| {
                let previous =
                    repository::contacts::get(conn, contact.id)?.ok_or(FinanceError::ContactNotFound(contact.id))?;
                repository::contacts::update(conn, &updated)?;

                // loan creation entries are described by contact name
                if previous.name != updated.name {
                    for loan in repository::loans::by_contact(conn, contact.id)? {
                        if !rewrite_creation_entry(conn, &loan, &previous.name, &loan, &updated.name)? {
                            warn!(loan_id = loan.id, "No creation entry to rename for loan");
                        }
                    }
                }
                Ok(())
            })?;
            info!(contact_id = contact.id, "Contact updated");
            Ok(updated)
        })
    }

    /// Remove a contact that no loan refers to
    pub fn remove(&self, id: i64) -> Result<()> {
        self.metrics.track("contact.remove", || {
            self.db.unit_of_work("contact.remove", |conn| {
                if repository::contacts::get(conn, id)?.is_none() {
                    return Err(FinanceError::ContactNotFound(id));
                }
                let loans = repository::loans::count_for_contact(conn, id)?;
                if loans > 0 {
                    warn!(contact_id = id, loans, "Refusing to remove contact with loans");
                    return Err(FinanceError::ContactInUse(id));
                }
                repository::contacts::delete(conn, id)?;
                info!(contact_id = id, "Contact removed");
                Ok(())
            })
        })
    }

    /// Name or phone search, prefix matches on the name first
    pub fn search(&self, term: &str) -> Result<Vec<Contact>> {
        let conn = self.db.get_connection()?;
        let found = repository::contacts::search(&conn, term, SEARCH_LIMIT)?;
        debug!(term, found = found.len(), "Contact search");
        Ok(found)
    }

    /// Zero-based page of contacts, case-insensitively ordered by name
    pub fn page(&self, page: usize, page_size: usize) -> Result<ContactPage> {
        InputValidator::validate_page_size(page_size)?;
        let conn = self.db.get_connection()?;
        let contacts = repository::contacts::page(&conn, page.saturating_mul(page_size), page_size)?;
        let total = repository::contacts::count(&conn)?;
        Ok(ContactPage { contacts, total })
    }

    /// Import contacts whose normalized phone number is not stored yet.
    ///
    /// Candidates without a phone number, or with one already present (in
    /// the store or earlier in the same import), are skipped. Returns the
    /// number of contacts added.
    pub fn import(&self, candidates: &[NewContact]) -> Result<usize> {
        self.metrics.track("contact.import", || {
            let mut known: HashSet<String> = {
                let conn = self.db.get_connection()?;
                repository::contacts::phones(&conn)?.iter().map(|p| self.phones.normalize(p)).collect()
            };

            let fresh: Vec<NewContact> = candidates
                .iter()
                .filter_map(|candidate| {
                    let phone = self.phones.normalize(candidate.phone.as_deref()?);
                    let name = InputValidator::sanitize_text(&candidate.name);
                    if phone.is_empty() || name.is_empty() || !known.insert(phone.clone()) {
                        return None;
                    }
                    Some(NewContact { name, phone: Some(phone) })
                })
                .collect();

            for batch in fresh.chunks(IMPORT_BATCH_SIZE) {
                self.db.unit_of_work("contact.import_batch", |conn| {
                    for contact in batch {
                        repository::contacts::insert(conn, contact)?;
                    }
                    Ok(())
                })?;
                debug!(batch = batch.len(), "Imported contact batch");
            }

            info!(candidates = candidates.len(), imported = fresh.len(), "Contact import finished");
            Ok(fresh.len())
        })
    }
}
