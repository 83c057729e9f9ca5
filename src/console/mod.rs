//! Presentation state held per operator: list controls, the status-change
//! dialog, the verification wizard, slot forms and toasts.

pub mod confirm;
pub mod fairing;
pub mod list;
pub mod notify;
pub mod session;
pub mod slots;
pub mod wizard;

pub use confirm::{ConfirmError, ConfirmView, Target};
pub use list::{ListCommand, ListPage, ListView};
pub use notify::{Notification, Notifier};
pub use session::{ConsoleSession, Page, SessionRegistry};
pub use wizard::{DocumentsForm, WizardError, WizardView};

use std::collections::BTreeMap;

/// Field name to messages, as rendered next to form inputs.
pub type FieldErrors = BTreeMap<String, Vec<String>>;
