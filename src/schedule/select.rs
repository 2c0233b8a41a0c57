use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::archive::ArchiveStore;
use crate::config::VmConfig;
use crate::error::Result;

/// Picks the VM the next run should back up.
///
/// A configured VM without any archive always wins. Otherwise the overdue VM
/// with the oldest latest archive is chosen. VMs are visited in name order,
/// so ties go to the lexically first name.
pub fn next_vm_to_backup(
    vms: &BTreeMap<String, VmConfig>,
    store: &ArchiveStore,
    now: NaiveDateTime,
) -> Result<Option<String>> {
    for vm in vms.keys() {
        if store.list_archives_for_vm(vm)?.is_empty() {
            debug!("VM \"{}\" is ready next (no existing archives)", vm);
            return Ok(Some(vm.clone()));
        }
    }

    let latest = store.latest_archive_per_vm()?;
    let mut next: Option<(&String, NaiveDateTime)> = None;
    for (vm, ts) in &latest {
        if !is_overdue(vms, vm, *ts, now) {
            continue;
        }
        debug!("VM \"{}\" backup is overdue (last {})", vm, ts);
        match next {
            Some((_, oldest)) if *ts >= oldest => {}
            _ => next = Some((vm, *ts)),
        }
    }
    Ok(next.map(|(vm, _)| vm.clone()))
}

/// `now - last >= period`; unknown VMs are never overdue.
pub fn is_overdue(
    vms: &BTreeMap<String, VmConfig>,
    vm: &str,
    last: NaiveDateTime,
    now: NaiveDateTime,
) -> bool {
    let Some(config) = vms.get(vm) else {
        warn!("VM \"{}\" not in profile, but archive found", vm);
        return false;
    };
    now - last >= config.period
}
