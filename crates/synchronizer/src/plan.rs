//! The `EditPlan`: a fully-decided set of operations produced by [`crate::diff`]
//! before any byte is written (spec §5 — "the edit plan is built entirely
//! before any output byte is emitted"). [`crate::apply`] is the only consumer.

use std::collections::HashMap;

use circuit_model::{Component, HierarchicalPort, Label, Placement, PowerSymbol, Uuid, Wire};

#[derive(Debug, Clone)]
pub enum ComponentOp {
    Preserve(Uuid),
    UpdateAttributes {
        uuid: Uuid,
        fields: HashMap<String, String>,
        /// The placement to carry onto the written component, already
        /// resolved by the diff (old wins when present, spec §8's
        /// position-preservation scenario). `None` only when neither side
        /// has ever placed the component.
        placement: Option<Placement>,
    },
    RelinkPin {
        uuid: Uuid,
        pin_number: String,
        new_net: Option<String>,
    },
    Insert(Component),
    Remove(Uuid),
}

#[derive(Debug, Clone)]
pub enum LabelOp {
    Insert(Label),
    Remove(Uuid),
    Move { uuid: Uuid, position: (f64, f64) },
}

#[derive(Debug, Clone)]
pub enum PowerSymbolOp {
    Insert(PowerSymbol),
    Remove(Uuid),
}

#[derive(Debug, Clone)]
pub enum WireOp {
    Insert(Wire),
    Remove(Uuid),
}

#[derive(Debug, Clone)]
pub enum NetOp {
    Rename { old: String, new: String },
}

#[derive(Debug, Clone)]
pub enum SheetOp {
    Insert {
        filename: String,
        name: String,
    },
    Remove(Uuid),
    UpdatePort {
        sheet_uuid: Uuid,
        port: HierarchicalPort,
    },
}

/// One sheet's worth of decided operations, in the order they should be
/// applied: components, then labels/power/wires, then nets, then sheets.
#[derive(Debug, Clone, Default)]
pub struct SheetPlan {
    pub sheet_uuid: Option<Uuid>,
    pub filename: String,
    pub components: Vec<ComponentOp>,
    pub labels: Vec<LabelOp>,
    pub power_symbols: Vec<PowerSymbolOp>,
    pub wires: Vec<WireOp>,
    pub nets: Vec<NetOp>,
}

impl SheetPlan {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// True if this plan changes nothing at all — a bare `Preserve` op for
    /// every matched component carries no action, so it doesn't count as a
    /// change (spec §8's idempotent-sync property: syncing a project against
    /// itself must produce a no-op plan, not one full of inert `Preserve`s).
    pub fn is_empty(&self) -> bool {
        self.components
            .iter()
            .all(|op| matches!(op, ComponentOp::Preserve(_)))
            && self.labels.is_empty()
            && self.power_symbols.is_empty()
            && self.wires.is_empty()
            && self.nets.is_empty()
    }
}

/// A warning attached to the plan rather than raised as an error: the sync
/// can still proceed, but the caller should be told (spec §4.6's "net
/// ambiguity is a non-fatal warning attached to the edit plan").
#[derive(Debug, Clone, PartialEq)]
pub enum PlanWarning {
    AmbiguousNetMerge { net: String, candidates: Vec<String> },
    PinCountChanged { reference: String, lost_pins: Vec<String> },
    DuplicateProperty { reference: String, key: String },
}

/// The complete result of a diff: per-sheet operations plus sheet-level
/// insertions/removals, ready for [`crate::apply::apply`].
#[derive(Debug, Clone, Default)]
pub struct EditPlan {
    pub sheets: Vec<SheetPlan>,
    pub sheet_ops: Vec<SheetOp>,
    pub warnings: Vec<PlanWarning>,
}

impl EditPlan {
    pub fn is_noop(&self) -> bool {
        self.sheets.iter().all(SheetPlan::is_empty) && self.sheet_ops.is_empty()
    }
}
