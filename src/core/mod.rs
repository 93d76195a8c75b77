//! Listener reconciliation and scheduling

mod binding;
mod reconciler;
mod update_manager;

#[cfg(test)]
pub(crate) mod testing;

pub use binding::{
    needs_change, resolve_binding, ActiveBinding, BindingSnapshot, DesiredBinding,
    ReconcileReport, SlotOutcome,
};
pub use reconciler::{ListenerEvent, ListenerReconciler};
pub use update_manager::UpdateManager;
