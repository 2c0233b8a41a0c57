use std::path::Path;

use chrono::Timelike;

use crate::archive::ArchiveStore;
use crate::config::load_config;
use crate::error::Result;
use crate::schedule::{is_overdue, is_within_window, next_vm_to_backup, Clock, SystemClock};
use crate::types::format_period;

pub fn run_status_command(config_path: &Path, profile_name: &str) -> Result<()> {
    let cfg = load_config(config_path, profile_name)?;
    let profile = &cfg.profile;
    let store = ArchiveStore::new(&profile.archive_dir);
    let now = SystemClock.now();
    let time_of_day = now.time().with_nanosecond(0).unwrap_or(now.time());
    let latest = store.latest_archive_per_vm()?;

    let windows: Vec<String> = profile.windows.iter().map(|w| w.to_string()).collect();
    println!("profile: {}", profile.name);
    println!("  host: {}", profile.host);
    println!("  archives: {}", profile.archive_dir.display());
    println!("  windows: {}", windows.join(", "));
    println!(
        "  in window now: {}",
        if is_within_window(time_of_day, &profile.windows) { "yes" } else { "no" }
    );

    for (vm, config) in &profile.vms {
        let count = store.list_archives_for_vm(vm)?.len();
        println!("vm: {}", vm);
        println!("  period: {}", format_period(config.period));
        println!("  archives: {} (keep {})", count, config.rotation_count);
        match latest.get(vm) {
            Some(last) => {
                println!("  latest: {}", last.format("%Y-%m-%d %H:%M:%S"));
                let overdue = is_overdue(&profile.vms, vm, *last, now);
                println!("  overdue: {}", if overdue { "yes" } else { "no" });
            }
            None => {
                println!("  latest: none");
                println!("  overdue: yes");
            }
        }
    }
    for vm in latest.keys().filter(|vm| !profile.vms.contains_key(*vm)) {
        println!("unconfigured archives: {}", vm);
    }

    match next_vm_to_backup(&profile.vms, &store, now)? {
        Some(vm) => println!("next: {}", vm),
        None => println!("next: none"),
    }
    Ok(())
}
