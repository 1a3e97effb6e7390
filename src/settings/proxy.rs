//! The per-field value cell.
//!
//! Every materialized field is a [`ProxyValue`]: a tagged cell that is
//! either unset, holds a direct value, or forwards reads to the
//! same-named field of another instance. "Unset" is a real state, not a
//! null value; a cell with a declared default materializes it on read
//! and still remembers that nothing was explicitly assigned.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::instance::Inner;
use super::metadata::FieldMetadata;
use super::value::Value;

enum State {
    Unset,
    Direct(Value),
    Proxied { target: Weak<RefCell<Inner>>, field: String },
}

/// One step of reading a cell. Proxy links are followed by the caller so
/// no instance stays borrowed across the hop.
pub(crate) enum Resolution {
    Found(Value),
    Forward(Weak<RefCell<Inner>>, String),
    Unset,
}

pub(crate) struct ProxyValue {
    meta: Rc<FieldMetadata>,
    state: State,
}

impl ProxyValue {
    pub(crate) fn new(meta: Rc<FieldMetadata>) -> Self {
        ProxyValue {
            meta,
            state: State::Unset,
        }
    }

    /// Resolves one step: a direct value, a materialized default, a
    /// forwarding link to follow, or nothing.
    pub(crate) fn resolve(&self) -> Resolution {
        match &self.state {
            State::Direct(value) => Resolution::Found(value.clone()),
            State::Proxied { target, field } => Resolution::Forward(target.clone(), field.clone()),
            State::Unset => match self.meta.materialize_default() {
                Some(value) => Resolution::Found(value),
                None => Resolution::Unset,
            },
        }
    }

    /// Assigns a value, overwriting any proxy link.
    pub(crate) fn set(&mut self, value: Value) {
        self.state = State::Direct(value);
    }

    /// Installs a read-through link to `field` on `target`.
    ///
    /// No-op when the field is declared non-proxiable; the cell keeps
    /// its prior state.
    pub(crate) fn proxy_to(&mut self, target: Weak<RefCell<Inner>>, field: impl Into<String>) {
        if !self.meta.proxiable() {
            return;
        }
        self.state = State::Proxied {
            target,
            field: field.into(),
        };
    }

    /// True when a value was explicitly assigned (as opposed to being
    /// reachable through a default or a proxy link).
    pub(crate) fn is_explicit(&self) -> bool {
        matches!(self.state, State::Direct(_))
    }

    /// Clones the cell without sharing any nested structure. Proxy
    /// links are kept as links.
    pub(crate) fn deep_clone(&self) -> ProxyValue {
        let state = match &self.state {
            State::Unset => State::Unset,
            State::Direct(value) => State::Direct(value.deep_clone()),
            State::Proxied { target, field } => State::Proxied {
                target: target.clone(),
                field: field.clone(),
            },
        };
        ProxyValue {
            meta: Rc::clone(&self.meta),
            state,
        }
    }
}

impl fmt::Debug for ProxyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            State::Direct(value) => write!(f, "{value}"),
            State::Proxied { field, .. } => write!(f, "<proxy {field}>"),
            State::Unset => match self.meta.materialize_default() {
                Some(value) => write!(f, "{value} (default)"),
                None => write!(f, "<unset>"),
            },
        }
    }
}
