//! Emergency contact management.
//!
//! The "at most one primary contact" rule lives here, not in the store. Promoting a
//! contact is two separate writes (clear every other flag, then set the target), so a
//! failure or a second writer between the two can leave zero or several primaries.
//! Toggles issued through one [`ContactManager`] are serialised; toggles from other
//! processes sharing the same database are not.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{emergency_contact, prelude::*};
use crate::error::{ContactError, StoreError};
use crate::store::{ContactStore, NewContact};

/// Submitted "Add Contact" form.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub relationship: Option<Relationship>,
}

impl ContactForm {
    fn validate(self) -> Result<NewContact, ContactError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ContactError::MissingField("name"));
        }
        let phone = self.phone.trim();
        if phone.is_empty() {
            return Err(ContactError::MissingField("phone"));
        }
        // The form posts an empty string when the optional field is left blank
        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Ok(NewContact {
            name: name.to_string(),
            phone: phone.to_string(),
            email,
            relationship: self.relationship.unwrap_or_default(),
        })
    }
}

pub struct ContactManager {
    store: Arc<dyn ContactStore>,
    primary_toggle: Mutex<()>,
}

impl ContactManager {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self {
            store,
            primary_toggle: Mutex::new(()),
        }
    }

    /// Primary contact first, then newest first.
    pub async fn list_contacts(&self) -> Result<Vec<emergency_contact::Model>, StoreError> {
        self.store.list_contacts().await
    }

    pub async fn add_contact(
        &self,
        form: ContactForm,
    ) -> Result<emergency_contact::Model, ContactError> {
        let contact = self.store.insert_contact(form.validate()?).await?;
        info!("Created emergency contact: {}", contact.id);
        metrics::gauge!("helmet_contacts_total").increment(1.0);
        Ok(contact)
    }

    pub async fn delete_contact(&self, id: Uuid) -> Result<(), ContactError> {
        if !self.store.delete_contact(id).await? {
            return Err(ContactError::NotFound(id));
        }
        info!("Deleted emergency contact: {}", id);
        metrics::gauge!("helmet_contacts_total").decrement(1.0);
        Ok(())
    }

    /// Toggles the primary flag on `id` and returns its new value.
    ///
    /// Promoting clears the flag everywhere else first. Demoting never promotes
    /// another contact.
    pub async fn set_primary(&self, id: Uuid) -> Result<bool, ContactError> {
        let _guard = self.primary_toggle.lock().await;

        let contact = self
            .store
            .find_contact(id)
            .await?
            .ok_or(ContactError::NotFound(id))?;
        let promote = !contact.is_primary;

        if promote {
            // Phase one. Nothing has changed yet if this fails.
            self.store.clear_primary_except(id).await?;
        }

        // Phase two. A failure here after a successful phase one leaves no primary.
        match self.store.set_primary_flag(id, promote).await {
            Ok(true) => {
                info!("Contact {} primary={}", id, promote);
                Ok(promote)
            }
            // Deleted between the read and the write
            Ok(false) => Err(ContactError::NotFound(id)),
            Err(e) => {
                if promote {
                    warn!("Primary flag cleared but contact {} not promoted: {}", id, e);
                }
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::testing::{new_contact, test_store, UnreachableStore};

    async fn manager() -> ContactManager {
        ContactManager::new(Arc::new(test_store().await))
    }

    async fn add(manager: &ContactManager, name: &str) -> emergency_contact::Model {
        let form = ContactForm {
            name: name.to_string(),
            phone: "555-0100".to_string(),
            ..Default::default()
        };
        manager.add_contact(form).await.unwrap()
    }

    async fn primaries(manager: &ContactManager) -> Vec<Uuid> {
        manager
            .list_contacts()
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.is_primary)
            .map(|c| c.id)
            .collect()
    }

    #[tokio::test]
    async fn add_requires_name_and_phone() {
        let manager = manager().await;

        let missing_name = ContactForm {
            name: "  ".to_string(),
            phone: "555".to_string(),
            ..Default::default()
        };
        let missing_phone = ContactForm {
            name: "Ada".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            manager.add_contact(missing_name).await,
            Err(ContactError::MissingField("name"))
        ));
        assert!(matches!(
            manager.add_contact(missing_phone).await,
            Err(ContactError::MissingField("phone"))
        ));
        assert!(manager.list_contacts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_defaults_relationship_and_drops_blank_email() {
        let manager = manager().await;
        let form = ContactForm {
            name: "Grace".to_string(),
            phone: "555-0199".to_string(),
            email: Some(String::new()),
            relationship: None,
        };

        let contact = manager.add_contact(form).await.unwrap();

        assert_eq!(contact.relationship, Relationship::Family);
        assert_eq!(contact.email, None);
        assert!(!contact.is_primary);
    }

    #[tokio::test]
    async fn list_puts_primary_first_then_newest() {
        let manager = manager().await;
        let a = add(&manager, "A").await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let b = add(&manager, "B").await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let c = add(&manager, "C").await;

        manager.set_primary(a.id).await.unwrap();

        let order: Vec<Uuid> = manager
            .list_contacts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(order, vec![a.id, c.id, b.id]);
    }

    #[tokio::test]
    async fn promoting_leaves_exactly_one_primary() {
        let mut rng = StdRng::seed_from_u64(7);

        for size in 1..=6 {
            let manager = manager().await;
            let mut ids = Vec::new();
            for i in 0..size {
                ids.push(add(&manager, &format!("contact-{i}")).await.id);
            }

            let previous = ids[rng.random_range(0..size)];
            manager.set_primary(previous).await.unwrap();

            let target = ids[rng.random_range(0..size)];
            let expected = if target == previous {
                // Toggling the current primary demotes it
                vec![]
            } else {
                vec![target]
            };
            manager.set_primary(target).await.unwrap();

            assert_eq!(primaries(&manager).await, expected, "size {size}");
        }
    }

    #[tokio::test]
    async fn toggling_primary_off_promotes_nobody() {
        let manager = manager().await;
        let a = add(&manager, "A").await;
        add(&manager, "B").await;

        assert!(manager.set_primary(a.id).await.unwrap());
        assert!(!manager.set_primary(a.id).await.unwrap());

        assert!(primaries(&manager).await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_promotions_keep_a_single_primary() {
        let manager = Arc::new(manager().await);
        let a = add(&manager, "A").await;
        let b = add(&manager, "B").await;

        let (ra, rb) = tokio::join!(manager.set_primary(a.id), manager.set_primary(b.id));
        ra.unwrap();
        rb.unwrap();

        assert_eq!(primaries(&manager).await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_contact_is_not_found() {
        let manager = manager().await;
        let id = Uuid::new_v4();

        assert!(matches!(
            manager.set_primary(id).await,
            Err(ContactError::NotFound(_))
        ));
        assert!(matches!(
            manager.delete_contact(id).await,
            Err(ContactError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_from_list() {
        let store = Arc::new(test_store().await);
        let manager = ContactManager::new(store.clone());
        let kept = store.insert_contact(new_contact("Kept")).await.unwrap();
        let gone = store.insert_contact(new_contact("Gone")).await.unwrap();

        manager.delete_contact(gone.id).await.unwrap();

        let ids: Vec<Uuid> = manager
            .list_contacts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![kept.id]);
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let manager = ContactManager::new(Arc::new(UnreachableStore::default()));

        assert!(manager.list_contacts().await.is_err());
        assert!(matches!(
            manager.set_primary(Uuid::new_v4()).await,
            Err(ContactError::Store(_))
        ));
    }
}
