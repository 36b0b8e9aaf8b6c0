use super::checklist::{Check, CheckGroup, Checklist};
use super::environment::HostEnvironment;
use super::types::CapabilityResult;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

/// Run every check in `checklist` against `host`.
///
/// Checks are independent: a check whose host primitive fails or panics is
/// recorded as absent and the rest of the list still runs. Nothing is
/// cached, so each call observes the host as it is now.
pub fn probe(host: &dyn HostEnvironment, checklist: &Checklist) -> CapabilityResult {
    let reasons = failed_checks(host, checklist)
        .into_iter()
        .map(|check| check.reason.clone())
        .collect();
    CapabilityResult::from_reasons(reasons)
}

/// The checks of `checklist` that failed on `host`, in checklist order.
pub fn failed_checks<'c>(host: &dyn HostEnvironment, checklist: &'c Checklist) -> Vec<&'c Check> {
    let checks = checklist.checks();
    let mut present: Vec<Option<bool>> = vec![None; checks.len()];

    let mut core_failed = false;
    for (slot, check) in present.iter_mut().zip(checks) {
        if check.id.group() == CheckGroup::Core {
            let ok = run_check(host, check);
            core_failed |= !ok;
            *slot = Some(ok);
        }
    }

    if core_failed && checklist.gates_on_core() {
        debug!("core check failed, skipping auxiliary checks");
    } else {
        for (slot, check) in present.iter_mut().zip(checks) {
            if slot.is_none() {
                *slot = Some(run_check(host, check));
            }
        }
    }

    checks
        .iter()
        .zip(present)
        .filter(|(_, ok)| *ok == Some(false))
        .map(|(check, _)| check)
        .collect()
}

fn run_check(host: &dyn HostEnvironment, check: &Check) -> bool {
    match catch_unwind(AssertUnwindSafe(|| check.id.evaluate(host))) {
        Ok(Ok(true)) => true,
        Ok(Ok(false)) => {
            debug!(check = check.id.as_str(), "feature absent");
            false
        }
        Ok(Err(err)) => {
            debug!(check = check.id.as_str(), error = %err, "feature probe failed");
            false
        }
        Err(_) => {
            debug!(check = check.id.as_str(), "feature probe panicked");
            false
        }
    }
}
