//! Matching phase (spec §4.6): pairs entities between an existing project
//! and a freshly generated target using a prioritised strategy per entity
//! kind. Kept separate from `diff` so each matcher can be tested in
//! isolation against its own fixtures.

use std::collections::HashSet;

use circuit_model::{Component, HierarchicalPort, Label, PowerSymbol, Sheet, Uuid, Wire};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Uuid,
    Reference,
    Fingerprint,
}

#[derive(Debug, Clone)]
pub struct Matched {
    pub old_uuid: Uuid,
    pub new_uuid: Uuid,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Default)]
pub struct ComponentMatching {
    pub matched: Vec<Matched>,
    pub deleted: Vec<Uuid>,
    pub inserted: Vec<Uuid>,
}

/// uuid → reference → fingerprint, in that priority order (spec §4.6).
pub fn match_components(old: &[Component], new: &[Component]) -> ComponentMatching {
    let mut used_old: HashSet<Uuid> = HashSet::new();
    let mut used_new: HashSet<Uuid> = HashSet::new();
    let mut matched = Vec::new();

    for n in new {
        if let Some(o) = old.iter().find(|o| o.uuid == n.uuid && !used_old.contains(&o.uuid)) {
            used_old.insert(o.uuid.clone());
            used_new.insert(n.uuid.clone());
            matched.push(Matched {
                old_uuid: o.uuid.clone(),
                new_uuid: n.uuid.clone(),
                kind: MatchKind::Uuid,
            });
        }
    }

    for n in new {
        if used_new.contains(&n.uuid) {
            continue;
        }
        if let Some(o) = old
            .iter()
            .find(|o| !used_old.contains(&o.uuid) && o.reference == n.reference)
        {
            used_old.insert(o.uuid.clone());
            used_new.insert(n.uuid.clone());
            matched.push(Matched {
                old_uuid: o.uuid.clone(),
                new_uuid: n.uuid.clone(),
                kind: MatchKind::Reference,
            });
        }
    }

    for n in new {
        if used_new.contains(&n.uuid) {
            continue;
        }
        let n_fp = n.fingerprint();
        if let Some(o) = old
            .iter()
            .find(|o| !used_old.contains(&o.uuid) && o.fingerprint() == n_fp)
        {
            used_old.insert(o.uuid.clone());
            used_new.insert(n.uuid.clone());
            matched.push(Matched {
                old_uuid: o.uuid.clone(),
                new_uuid: n.uuid.clone(),
                kind: MatchKind::Fingerprint,
            });
        }
    }

    let deleted = old
        .iter()
        .filter(|o| !used_old.contains(&o.uuid))
        .map(|o| o.uuid.clone())
        .collect();
    let inserted = new
        .iter()
        .filter(|n| !used_new.contains(&n.uuid))
        .map(|n| n.uuid.clone())
        .collect();

    ComponentMatching {
        matched,
        deleted,
        inserted,
    }
}

fn label_key(label: &Label) -> (u8, String, (i64, i64)) {
    (label.kind as u8, label.text.clone(), quantize(label.position))
}

fn quantize(position: (f64, f64)) -> (i64, i64) {
    ((position.0 * 1000.0).round() as i64, (position.1 * 1000.0).round() as i64)
}

pub fn match_labels(old: &[Label], new: &[Label]) -> (Vec<(Uuid, Uuid)>, Vec<Uuid>, Vec<Uuid>) {
    let mut used_old = HashSet::new();
    let mut used_new = HashSet::new();
    let mut matched = Vec::new();

    for n in new {
        if let Some(o) = old.iter().find(|o| {
            !used_old.contains(&o.uuid) && label_key(o) == label_key(n)
        }) {
            used_old.insert(o.uuid.clone());
            used_new.insert(n.uuid.clone());
            matched.push((o.uuid.clone(), n.uuid.clone()));
        }
    }

    let deleted = old
        .iter()
        .filter(|o| !used_old.contains(&o.uuid))
        .map(|o| o.uuid.clone())
        .collect();
    let inserted = new
        .iter()
        .filter(|n| !used_new.contains(&n.uuid))
        .map(|n| n.uuid.clone())
        .collect();

    (matched, deleted, inserted)
}

pub fn match_power_symbols(
    old: &[PowerSymbol],
    new: &[PowerSymbol],
) -> (Vec<(Uuid, Uuid)>, Vec<Uuid>, Vec<Uuid>) {
    let mut used_old = HashSet::new();
    let mut used_new = HashSet::new();
    let mut matched = Vec::new();

    for n in new {
        if let Some(o) = old.iter().find(|o| {
            !used_old.contains(&o.uuid)
                && o.net_name == n.net_name
                && quantize(o.position) == quantize(n.position)
        }) {
            used_old.insert(o.uuid.clone());
            used_new.insert(n.uuid.clone());
            matched.push((o.uuid.clone(), n.uuid.clone()));
        }
    }

    let deleted = old
        .iter()
        .filter(|o| !used_old.contains(&o.uuid))
        .map(|o| o.uuid.clone())
        .collect();
    let inserted = new
        .iter()
        .filter(|n| !used_new.contains(&n.uuid))
        .map(|n| n.uuid.clone())
        .collect();

    (matched, deleted, inserted)
}

pub fn match_wires(old: &[Wire], new: &[Wire]) -> (Vec<(Uuid, Uuid)>, Vec<Uuid>, Vec<Uuid>) {
    let mut used_old = HashSet::new();
    let mut used_new = HashSet::new();
    let mut matched = Vec::new();

    for n in new {
        if let Some(o) = old.iter().find(|o| {
            !used_old.contains(&o.uuid)
                && o.points.len() == n.points.len()
                && o.points
                    .iter()
                    .zip(n.points.iter())
                    .all(|(a, b)| quantize(*a) == quantize(*b))
        }) {
            used_old.insert(o.uuid.clone());
            used_new.insert(n.uuid.clone());
            matched.push((o.uuid.clone(), n.uuid.clone()));
        }
    }

    let deleted = old
        .iter()
        .filter(|o| !used_old.contains(&o.uuid))
        .map(|o| o.uuid.clone())
        .collect();
    let inserted = new
        .iter()
        .filter(|n| !used_new.contains(&n.uuid))
        .map(|n| n.uuid.clone())
        .collect();

    (matched, deleted, inserted)
}

/// Sheets match by `uuid` then `filename`; ports within a matched sheet
/// match by `uuid` then `name`.
pub fn match_sheets(old: &[Sheet], new: &[Sheet]) -> (Vec<(Uuid, Uuid)>, Vec<Uuid>, Vec<Uuid>) {
    let mut used_old = HashSet::new();
    let mut used_new = HashSet::new();
    let mut matched = Vec::new();

    for n in new {
        if let Some(o) = old.iter().find(|o| !used_old.contains(&o.uuid) && o.uuid == n.uuid) {
            used_old.insert(o.uuid.clone());
            used_new.insert(n.uuid.clone());
            matched.push((o.uuid.clone(), n.uuid.clone()));
        }
    }
    for n in new {
        if used_new.contains(&n.uuid) {
            continue;
        }
        if let Some(o) = old
            .iter()
            .find(|o| !used_old.contains(&o.uuid) && o.filename == n.filename)
        {
            used_old.insert(o.uuid.clone());
            used_new.insert(n.uuid.clone());
            matched.push((o.uuid.clone(), n.uuid.clone()));
        }
    }

    let deleted = old
        .iter()
        .filter(|o| !used_old.contains(&o.uuid))
        .map(|o| o.uuid.clone())
        .collect();
    let inserted = new
        .iter()
        .filter(|n| !used_new.contains(&n.uuid))
        .map(|n| n.uuid.clone())
        .collect();

    (matched, deleted, inserted)
}

pub fn match_ports(
    old: &[HierarchicalPort],
    new: &[HierarchicalPort],
) -> (Vec<(Uuid, Uuid)>, Vec<Uuid>, Vec<Uuid>) {
    let mut used_old = HashSet::new();
    let mut used_new = HashSet::new();
    let mut matched = Vec::new();

    for n in new {
        if let Some(o) = old.iter().find(|o| !used_old.contains(&o.uuid) && o.uuid == n.uuid) {
            used_old.insert(o.uuid.clone());
            used_new.insert(n.uuid.clone());
            matched.push((o.uuid.clone(), n.uuid.clone()));
        }
    }
    for n in new {
        if used_new.contains(&n.uuid) {
            continue;
        }
        if let Some(o) = old.iter().find(|o| !used_old.contains(&o.uuid) && o.name == n.name) {
            used_old.insert(o.uuid.clone());
            used_new.insert(n.uuid.clone());
            matched.push((o.uuid.clone(), n.uuid.clone()));
        }
    }

    let deleted = old
        .iter()
        .filter(|o| !used_old.contains(&o.uuid))
        .map(|o| o.uuid.clone())
        .collect();
    let inserted = new
        .iter()
        .filter(|n| !used_new.contains(&n.uuid))
        .map(|n| n.uuid.clone())
        .collect();

    (matched, deleted, inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit_model::{Component, Reference};

    fn comp(uuid: &str, reference: &str, lib_id: &str, value: &str) -> Component {
        Component::new(Uuid::new(uuid), Reference::new(reference), lib_id, value)
    }

    #[test]
    fn uuid_match_wins_over_reference_change() {
        let old = vec![comp("u1", "R1", "Device:R", "10k")];
        let new = vec![comp("u1", "R_RENAMED", "Device:R", "10k")];
        let result = match_components(&old, &new);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].kind, MatchKind::Uuid);
    }

    #[test]
    fn reference_match_when_uuid_absent_on_new_side() {
        let old = vec![comp("u1", "R1", "Device:R", "10k")];
        let new = vec![comp("u2", "R1", "Device:R", "4k7")];
        let result = match_components(&old, &new);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].kind, MatchKind::Reference);
    }

    #[test]
    fn fingerprint_match_as_last_resort() {
        let mut old_c = comp("u1", "R1", "Device:R", "10k");
        old_c.connect(circuit_model::PinConnection::new("1", "VCC"));
        let mut new_c = comp("u2", "R2", "Device:R", "10k");
        new_c.connect(circuit_model::PinConnection::new("1", "VCC"));
        let result = match_components(&[old_c], &[new_c]);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].kind, MatchKind::Fingerprint);
    }

    #[test]
    fn unmatched_entities_become_insertions_and_deletions() {
        let old = vec![comp("u1", "R1", "Device:R", "10k")];
        let new = vec![comp("u2", "R2", "Device:R", "4k7")];
        let result = match_components(&old, &new);
        assert!(result.matched.is_empty());
        assert_eq!(result.deleted, vec![Uuid::new("u1")]);
        assert_eq!(result.inserted, vec![Uuid::new("u2")]);
    }
}
