//! Editable line rows of the new-customer form, as a pure reducer.

use rust_decimal::Decimal;

use fieldquote_catalog::{CatalogItem, price_for};

use crate::line::{LineInput, NormalizedLine, compute_total, normalize_lines};

/// Field-level change to one draft row. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftPatch {
    pub item: Option<String>,
    pub qty: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

impl DraftPatch {
    pub fn item(item: impl Into<String>) -> Self {
        Self {
            item: Some(item.into()),
            ..Self::default()
        }
    }

    pub fn qty(qty: Decimal) -> Self {
        Self {
            qty: Some(qty),
            ..Self::default()
        }
    }

    pub fn unit_price(unit_price: Decimal) -> Self {
        Self {
            unit_price: Some(unit_price),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftAction {
    AddRow,
    RemoveRow(usize),
    Update { index: usize, patch: DraftPatch },
    /// A catalog item was picked; `price` is the catalog price at that moment.
    SelectItem {
        index: usize,
        name: String,
        price: Option<Decimal>,
    },
}

impl DraftAction {
    /// Resolve the catalog price for `name` now, so the row keeps a snapshot.
    pub fn select_item(index: usize, name: impl Into<String>, catalog: &[CatalogItem]) -> Self {
        let name = name.into();
        let price = price_for(catalog, &name);
        DraftAction::SelectItem { index, name, price }
    }
}

/// Draft material rows. Always holds at least one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLines {
    rows: Vec<LineInput>,
}

impl Default for DraftLines {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftLines {
    pub fn new() -> Self {
        Self {
            rows: vec![LineInput::blank()],
        }
    }

    pub fn rows(&self) -> &[LineInput] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Apply one action. Out-of-range indexes leave the rows unchanged.
    pub fn reduce(self, action: DraftAction) -> Self {
        match action {
            DraftAction::AddRow => self.push_blank(),
            DraftAction::RemoveRow(index) => self.remove(index),
            DraftAction::Update { index, patch } => self.update(index, patch),
            DraftAction::SelectItem { index, name, price } => self.select(index, name, price),
        }
    }

    pub fn push_blank(mut self) -> Self {
        self.rows.push(LineInput::blank());
        self
    }

    /// Remove a row; the last remaining row is never removed.
    pub fn remove(mut self, index: usize) -> Self {
        if self.rows.len() > 1 && index < self.rows.len() {
            self.rows.remove(index);
        }
        self
    }

    pub fn update(mut self, index: usize, patch: DraftPatch) -> Self {
        if let Some(row) = self.rows.get_mut(index) {
            if let Some(item) = patch.item {
                row.item = item;
            }
            if patch.qty.is_some() {
                row.qty = patch.qty;
            }
            if patch.unit_price.is_some() {
                row.unit_price = patch.unit_price;
            }
        }
        self
    }

    pub fn select_item(
        self,
        index: usize,
        name: impl Into<String>,
        catalog: &[CatalogItem],
    ) -> Self {
        self.reduce(DraftAction::select_item(index, name, catalog))
    }

    fn select(mut self, index: usize, name: String, price: Option<Decimal>) -> Self {
        if let Some(row) = self.rows.get_mut(index) {
            row.item = name;
            // unknown names keep whatever price was typed
            if price.is_some() {
                row.unit_price = price;
            }
        }
        self
    }

    /// Running total of the rows as typed.
    pub fn total(&self) -> Decimal {
        compute_total(&self.rows)
    }

    /// Rows that survive normalisation, ready for `create_customer`.
    pub fn normalized(&self) -> Vec<NormalizedLine> {
        normalize_lines(&self.rows)
    }

    pub fn into_inputs(self) -> Vec<LineInput> {
        self.rows
    }
}
