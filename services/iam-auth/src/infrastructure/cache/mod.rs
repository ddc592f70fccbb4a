mod pending_registration_store;

pub use pending_registration_store::{PENDING_PREFIX, PendingRegistrationStore};
