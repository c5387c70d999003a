//! Application-level orchestration.
//!
//! The coordinators own one trigger each and split every action into `start`
//! (validate, claim the trigger, issue the request) and `finish` (apply the
//! resolved response). `Workflow` composes them with the gate, the notifier,
//! the results panel and the map. UI and headless layers call into it.

mod controller;
mod solve;
mod trigger;
mod upload;

pub(crate) use controller::{run_controller, Snapshot, UiCommand, Workflow};
