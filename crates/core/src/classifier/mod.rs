//! External classifier adapter.
//!
//! [`ClassifierInvoker`] runs the configured executable against a local image
//! and turns its output into a [`ResolvedVerdict`] or an
//! [`InvocationFailure`]. Output scraping lives in [`extract_verdict`] and
//! label mapping in [`Verdict::resolve`].

mod error;
mod invoker;
mod label;
mod verdict;

pub use error::InvocationFailure;
pub use invoker::{Classifier, ClassifierInvoker};
pub use label::{ClassificationLabel, LabelPresentation, Severity, presentation_table};
pub use verdict::{
    EDIBLE_DETAILS, GENERIC_DETAILS, NOT_A_MUSHROOM_DETAILS, POISONOUS_DETAILS, ResolvedVerdict,
    UnknownClass, Verdict, default_details, extract_verdict, interpret, normalize_confidence,
};
