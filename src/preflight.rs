//! Capacity-mode guard run before a migration scans anything.
//!
//! A full-table rewrite against fixed provisioned capacity can throttle the table for every
//! other client, so runs are refused unless the table is on-demand or the operator forces it.

use crate::error::{Error, Result};
use crate::store::{CapacityMode, TableDescription, TableStore};

/// Whether a run against the described table may proceed
pub fn check(description: &TableDescription, force: bool) -> bool {
    force || description.capacity_mode == CapacityMode::OnDemand
}

/// Outcome of a passed [`guard`]
#[derive(Debug)]
pub enum Clearance {
    /// The table is on on-demand capacity
    Allowed(TableDescription),
    /// The table is not on-demand but the override was set
    Overridden(TableDescription),
    /// The override was set and the table could not be described
    Unchecked(Error),
}

/// Describe `table` and fail with [`Error::Preflight`] when [`check`] refuses it
///
/// With `force` set the run is never refused: a failed describe call is returned as
/// [`Clearance::Unchecked`] instead of an error.
pub async fn guard(store: &dyn TableStore, table: &str, force: bool) -> Result<Clearance> {
    let description = match store.describe(table).await {
        Ok(description) => description,
        Err(error) if force => return Ok(Clearance::Unchecked(error)),
        Err(error) => return Err(error),
    };

    if description.capacity_mode == CapacityMode::OnDemand {
        return Ok(Clearance::Allowed(description));
    }

    if !check(&description, force) {
        return Err(Error::Preflight {
            table: table.to_string(),
            capacity_mode: description.capacity_mode,
        });
    }

    Ok(Clearance::Overridden(description))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description(capacity_mode: CapacityMode) -> TableDescription {
        TableDescription {
            table_name: "users".to_string(),
            capacity_mode,
        }
    }

    #[test]
    fn test_on_demand_allowed() {
        assert!(check(&description(CapacityMode::OnDemand), false));
        assert!(check(&description(CapacityMode::OnDemand), true));
    }

    #[test]
    fn test_provisioned_requires_force() {
        assert!(!check(&description(CapacityMode::Provisioned), false));
        assert!(check(&description(CapacityMode::Provisioned), true));
    }

    #[test]
    fn test_clearance_debug_names_outcome() {
        let clearance = Clearance::Unchecked(Error::transport("AccessDenied"));
        assert!(format!("{clearance:?}").starts_with("Unchecked"));
    }
}
