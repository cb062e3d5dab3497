//! Step definitions, fixtures and scenarios for the audit feature.

mod bdd_steps;
mod scenarios;
mod test_helpers;
