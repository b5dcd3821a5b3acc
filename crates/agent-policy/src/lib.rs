//! Safety policy enforcement for assistant replies.
//!
//! A [`PolicyEnforcer`] holds a table of [`PolicyRule`]s. Each rule pairs a
//! [`Trigger`] over the user's message with the set of tools that must have
//! run before the assistant may answer. Evaluation is a pure function of the
//! user text and the tool names invoked so far in the turn.

mod enforcer;
mod error;
mod pharmacy;
mod rule;
mod trigger;

pub use enforcer::{PolicyEnforcer, PolicySpec, Verdict};
pub use error::PolicyError;
pub use pharmacy::{pharmacy_rules, DISPENSING_SAFETY_RULE};
pub use rule::{PolicyRule, PolicyRuleSpec};
pub use trigger::{Trigger, TriggerSpec};
