//! Scenario-based tests for redeploy

mod helpers;

mod blocking_failure;
mod canonical_order;
mod custom_steps;
mod idempotence;
