//! Stage wrappers.
//!
//! | Constructor | Stage | Stores | Ends the chain |
//! |---|---|---|---|
//! | [`compute`] / [`compute_anonymous`] | [`Compute`] | result under its name | no |
//! | [`respond`] | [`Respond`] | response | yes |
//! | [`respond_if`] | [`RespondIf`] | response, when `Some` | when `Some` |
//! | [`validate`] / [`validate_fn`] | [`Validate`] | nothing | no |
//! | [`promote`] | [`Promote`] | fields into the body | no |
//! | [`import`] | [`Import`] | a request property as a result | no |

mod bridge;
mod compute;
mod respond;
mod validate;

pub use bridge::{Import, Promote};
pub use compute::Compute;
pub use respond::{Respond, RespondIf};
pub use validate::Validate;

use crate::computation::Computation;
use crate::response::ResponseDescriptor;
use crate::view::MergedView;
use serde_json::Value;

pub fn compute(name: impl Into<String>, computation: Computation<Value>) -> Compute {
    Compute::named(name, computation)
}

pub fn compute_anonymous(computation: Computation<Value>) -> Compute {
    Compute::anonymous(computation)
}

pub fn respond(computation: Computation<ResponseDescriptor>) -> Respond {
    Respond::new(computation)
}

pub fn respond_if(computation: Computation<Option<ResponseDescriptor>>) -> RespondIf {
    RespondIf::new(computation)
}

pub fn validate(name: impl Into<String>, predicate: Computation<bool>) -> Validate {
    Validate::new(name, predicate)
}

pub fn validate_fn<F>(name: impl Into<String>, predicate: F) -> Validate
where
    F: Fn(&MergedView) -> bool + Send + Sync + 'static,
{
    Validate::from_fn(name, predicate)
}

pub fn promote<I, S>(name: impl Into<String>, fields: I) -> Promote
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Promote::new(name, fields)
}

pub fn import(name: impl Into<String>) -> Import {
    Import::new(name)
}
