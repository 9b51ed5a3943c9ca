// src/app/report.rs
use std::cmp::Ordering;

use crate::types::{CertificateEntry, CollectionResult, ComponentType};

/// Report order: `scheduler` before `kubelet`, everything else by type
/// name, then node, then name.
pub fn compare_entries(a: &CertificateEntry, b: &CertificateEntry) -> Ordering {
    match (a.kind, b.kind) {
        (ComponentType::Scheduler, ComponentType::Kubelet) => return Ordering::Less,
        (ComponentType::Kubelet, ComponentType::Scheduler) => return Ordering::Greater,
        _ => {}
    }
    a.kind
        .as_str()
        .cmp(b.kind.as_str())
        .then_with(|| a.node.cmp(&b.node))
        .then_with(|| a.name.cmp(&b.name))
}

pub fn sort_results(results: &mut [CollectionResult]) {
    results.sort_by(|a, b| compare_entries(&a.entry, &b.entry));
}
