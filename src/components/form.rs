//! Form: collects named inputs on a trigger and creates a record.
//!
//! DESIGN
//! ======
//! One submission cycle runs `collecting -> validating -> submitting` and
//! always returns to `Idle`, emitting at most one outcome (`Submit` or
//! `Error`) at the form's node. The form never holds references to its
//! inputs or trigger; inputs are found by walking the form's subtree and
//! the trigger reaches the form by bubbling. The walk stops at a nested
//! form, which owns its own inputs the same way it owns its own triggers.
//!
//! Submissions are serialized per form. The trigger listener moves the
//! form out of `Idle` synchronously before spawning the cycle, so a second
//! trigger arriving mid-flight is rejected rather than overlapping writes.
//!
//! ERROR HANDLING
//! ==============
//! Validation failures always surface as `Error` and never reach the data
//! source. Transport failures on insert surface as `Error` and leave input
//! values intact. Configuration failures (no fields, no or unresolved
//! target, no table) are logged and abort quietly unless
//! `surface_config_errors` is set.

#[cfg(test)]
#[path = "form_test.rs"]
mod form_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::components::text_box::FieldCore;
use crate::error::{ConfigError, TreeError};
use crate::event::{EventKind, Payload};
use crate::record::{FieldSet, Record, Value};
use crate::tree::{NodeId, Role, Tree};

pub const TAG: &str = "app-form";
pub const EMPTY_RECORD_MESSAGE: &str = "At least one field must be filled";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormPhase {
    #[default]
    Idle,
    Collecting,
    Validating,
    Submitting,
}

/// What to do with a record whose every field is blank when no
/// required-field rule is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPolicy {
    #[default]
    RequireAny,
    Allow,
}

#[derive(Debug, Clone, Default)]
pub struct FormConfig {
    /// Element id of the target data source.
    pub target: Option<String>,
    /// Fields that must be non-empty.
    pub required: Option<FieldSet>,
    pub empty_policy: EmptyPolicy,
    /// Emit `Error` for configuration failures instead of only logging.
    pub surface_config_errors: bool,
}

impl FormConfig {
    #[must_use]
    pub fn for_source(target: impl Into<String>) -> Self {
        Self { target: Some(target.into()), ..Self::default() }
    }

    #[must_use]
    pub fn required(mut self, fields: &str) -> Self {
        self.required = Some(FieldSet::parse(fields)).filter(|f| !f.is_empty());
        self
    }
}

/// How one submission cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    /// Created; inputs cleared; `Submit` emitted.
    Submitted(Record),
    /// Rejected before contacting the source; `Error` emitted.
    Invalid(String),
    /// The insert failed; `Error` emitted, inputs kept.
    Failed(String),
    /// Configuration failure; `Error` emitted only when surfaced.
    Aborted(ConfigError),
    /// Another submission was still in flight.
    Busy,
}

#[derive(Default)]
pub(crate) struct FormCore {
    config: RefCell<FormConfig>,
    phase: Cell<FormPhase>,
    pending: RefCell<Option<JoinHandle<FormOutcome>>>,
}

// =============================================================================
// FORM
// =============================================================================

/// Handle to a form element.
#[derive(Clone)]
pub struct Form {
    tree: Tree,
    node: NodeId,
    core: Rc<FormCore>,
}

impl Form {
    /// Attach a form and start listening for triggers from its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Detached`] if `parent` is gone.
    pub fn attach(tree: &Tree, parent: NodeId, config: FormConfig) -> Result<Self, TreeError> {
        let core = Rc::new(FormCore { config: RefCell::new(config), ..FormCore::default() });
        let node = tree.insert(parent, TAG, None, Role::Form(Rc::clone(&core)))?;

        let weak_tree = tree.downgrade();
        let weak_core = Rc::downgrade(&core);
        tree.listen(node, EventKind::Trigger, move |event| {
            // The nearest form owns the trigger.
            event.stop_propagation();
            let (Some(tree), Some(core)) = (weak_tree.upgrade(), weak_core.upgrade()) else {
                return;
            };
            Form { tree, node, core }.on_trigger();
        })?;

        super::announce(tree, node, TAG);
        Ok(Self { tree: tree.clone(), node, core })
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn phase(&self) -> FormPhase {
        self.core.phase.get()
    }

    #[must_use]
    pub fn config(&self) -> FormConfig {
        self.core.config.borrow().clone()
    }

    /// Recognizes `for` and `required`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAttribute`] for anything else.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), ConfigError> {
        let mut config = self.core.config.borrow_mut();
        match name {
            "for" => config.target = Some(value.trim().to_owned()).filter(|v| !v.is_empty()),
            "required" => config.required = Some(FieldSet::parse(value)).filter(|f| !f.is_empty()),
            other => return Err(ConfigError::UnknownAttribute(other.to_owned())),
        }
        Ok(())
    }

    /// Run one submission cycle directly, as a trigger would.
    pub async fn submit(&self) -> FormOutcome {
        if !self.try_begin() {
            warn!(form = %self.node, phase = ?self.phase(), "submit rejected: submission in progress");
            return FormOutcome::Busy;
        }
        self.run_cycle().await
    }

    /// Wait for the cycle most recently started by a trigger.
    pub async fn settled(&self) -> Option<FormOutcome> {
        let handle = self.core.pending.borrow_mut().take()?;
        handle.await.ok()
    }

    fn on_trigger(&self) {
        if !self.try_begin() {
            warn!(form = %self.node, phase = ?self.phase(), "trigger ignored: submission in progress");
            return;
        }
        let form = self.clone();
        let handle = tokio::task::spawn_local(async move { form.run_cycle().await });
        *self.core.pending.borrow_mut() = Some(handle);
    }

    fn try_begin(&self) -> bool {
        if self.core.phase.get() != FormPhase::Idle {
            return false;
        }
        self.core.phase.set(FormPhase::Collecting);
        true
    }

    async fn run_cycle(&self) -> FormOutcome {
        let outcome = self.cycle().await;
        self.core.phase.set(FormPhase::Idle);
        outcome
    }

    // -------------------------------------------------------------------------
    // Cycle
    // -------------------------------------------------------------------------

    async fn cycle(&self) -> FormOutcome {
        info!(form = %self.node, target = ?self.core.config.borrow().target, "submission started");

        let fields = self.collect_fields();
        if fields.is_empty() {
            return self.abort(ConfigError::NoFields);
        }
        let record: Record = fields
            .iter()
            .map(|(name, field)| (name.as_str(), Value::from(field.value().trim())))
            .collect();

        self.core.phase.set(FormPhase::Validating);
        let config = self.config();
        if let Some(message) = validate(&config, &record) {
            warn!(form = %self.node, %message, "submission blocked");
            self.emit(EventKind::Error, Payload::Message(message.clone()));
            return FormOutcome::Invalid(message);
        }

        self.core.phase.set(FormPhase::Submitting);
        let Some(target) = config.target else {
            return self.abort(ConfigError::MissingTarget);
        };
        let Some(source) = self.tree.data_source(&target) else {
            return self.abort(ConfigError::UnresolvedSource(target));
        };

        match source.create_record(record.clone()).await {
            Ok(Some(_)) => {
                for (_, field) in &fields {
                    field.set_value("");
                }
                info!(form = %self.node, %target, "record submitted");
                self.emit(EventKind::Submit, Payload::Record(record.clone()));
                FormOutcome::Submitted(record)
            }
            Ok(None) => self.abort(ConfigError::NoTable),
            Err(e) => {
                let message = e.to_string();
                error!(form = %self.node, %target, error = %message, "error creating record");
                self.emit(EventKind::Error, Payload::Message(message.clone()));
                FormOutcome::Failed(message)
            }
        }
    }

    /// Named inputs inside the form, in document order, excluding those of
    /// nested forms.
    fn collect_fields(&self) -> Vec<(String, Rc<FieldCore>)> {
        let mut fields = Vec::new();
        let mut stack: Vec<NodeId> = self.tree.children(self.node).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            match self.tree.role(node) {
                Some(Role::Form(_)) => continue,
                Some(Role::Field(field)) => {
                    if let Some(name) = field.name() {
                        fields.push((name, field));
                    }
                }
                _ => {}
            }
            stack.extend(self.tree.children(node).into_iter().rev());
        }
        fields
    }

    fn abort(&self, err: ConfigError) -> FormOutcome {
        error!(form = %self.node, error = %err, "submission aborted");
        if self.core.config.borrow().surface_config_errors {
            self.emit(EventKind::Error, Payload::Message(err.to_string()));
        }
        FormOutcome::Aborted(err)
    }

    fn emit(&self, kind: EventKind, payload: Payload) {
        self.tree.dispatch(self.node, kind, payload);
    }
}

/// The validation message for `record`, if it may not be submitted.
fn validate(config: &FormConfig, record: &Record) -> Option<String> {
    match config.required.as_ref().filter(|r| !r.is_empty()) {
        Some(required) => {
            let missing = required.missing_in(record);
            (!missing.is_empty()).then(|| format!("Missing required fields: {}", missing.join(", ")))
        }
        None => (config.empty_policy == EmptyPolicy::RequireAny && record.all_blank())
            .then(|| EMPTY_RECORD_MESSAGE.to_owned()),
    }
}
