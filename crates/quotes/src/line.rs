use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fieldquote_core::money::{price_or_zero, quantity_or_one};
use fieldquote_core::store::{Row, patch};
use fieldquote_core::{CustomerId, DomainError, DomainResult, Entity, MaterialLineId};

/// Anything carrying a quantity and a unit price.
pub trait Priced {
    fn qty(&self) -> Decimal;
    fn unit_price(&self) -> Decimal;

    /// `qty × unit_price`, always recomputed, never stored.
    fn line_total(&self) -> Decimal {
        self.qty() * self.unit_price()
    }
}

/// Sum of line totals. No rounding: callers round only for display.
pub fn compute_total<'a, L, I>(lines: I) -> Decimal
where
    L: Priced + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines.into_iter().map(Priced::line_total).sum()
}

/// One priced quantity of an item attached to a customer.
///
/// `item` and `unit_price` are a snapshot taken when the line was created;
/// they are not linked to the catalog. `customer_id` never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialLine {
    id: MaterialLineId,
    customer_id: CustomerId,
    item: String,
    qty: Decimal,
    unit_price: Decimal,
    #[serde(default)]
    ordered: bool,
}

impl MaterialLine {
    /// Rebuild a line from stored values.
    pub fn hydrate(
        id: MaterialLineId,
        customer_id: CustomerId,
        item: impl Into<String>,
        qty: Decimal,
        unit_price: Decimal,
        ordered: bool,
    ) -> Self {
        Self {
            id,
            customer_id,
            item: item.into(),
            qty,
            unit_price,
            ordered,
        }
    }

    pub fn line_id(&self) -> MaterialLineId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    /// Procurement flag: whether the materials have been purchased.
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }
}

impl Priced for MaterialLine {
    fn qty(&self) -> Decimal {
        self.qty
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
}

impl Entity for MaterialLine {
    type Id = MaterialLineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A material line as typed by the user, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInput {
    pub item: String,
    pub qty: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

impl LineInput {
    pub fn new(item: impl Into<String>, qty: Decimal, unit_price: Decimal) -> Self {
        Self {
            item: item.into(),
            qty: Some(qty),
            unit_price: Some(unit_price),
        }
    }

    /// The empty form row: no item, quantity 1, price 0.
    pub fn blank() -> Self {
        Self::new("", Decimal::ONE, Decimal::ZERO)
    }

    /// Trim the item and apply the quantity/price defaults.
    /// Returns `None` when the trimmed item is empty.
    pub fn normalize(&self) -> Option<NormalizedLine> {
        let item = self.item.trim();
        if item.is_empty() {
            return None;
        }
        Some(NormalizedLine {
            item: item.to_string(),
            qty: quantity_or_one(self.qty),
            unit_price: price_or_zero(self.unit_price),
        })
    }
}

impl Priced for LineInput {
    fn qty(&self) -> Decimal {
        self.qty.unwrap_or(Decimal::ZERO)
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price.unwrap_or(Decimal::ZERO)
    }
}

/// A line that passed normalisation and is ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    pub item: String,
    pub qty: Decimal,
    pub unit_price: Decimal,
}

impl NormalizedLine {
    pub(crate) fn for_customer(&self, customer_id: CustomerId) -> NewLineRow<'_> {
        NewLineRow {
            customer_id,
            item: &self.item,
            qty: self.qty,
            unit_price: self.unit_price,
            ordered: false,
        }
    }
}

impl Priced for NormalizedLine {
    fn qty(&self) -> Decimal {
        self.qty
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price
    }
}

/// Normalise a batch of inputs, dropping lines without an item.
pub fn normalize_lines(inputs: &[LineInput]) -> Vec<NormalizedLine> {
    inputs.iter().filter_map(LineInput::normalize).collect()
}

/// Insert payload for the `materials` table.
#[derive(Debug, Serialize)]
pub(crate) struct NewLineRow<'a> {
    pub customer_id: CustomerId,
    pub item: &'a str,
    pub qty: Decimal,
    pub unit_price: Decimal,
    pub ordered: bool,
}

/// A post-creation change to one field of a material line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEdit {
    Ordered(bool),
    Quantity(Decimal),
    UnitPrice(Decimal),
}

impl LineEdit {
    /// Apply the same defaults as line creation.
    pub fn normalized(self) -> Self {
        match self {
            LineEdit::Ordered(v) => LineEdit::Ordered(v),
            LineEdit::Quantity(q) => LineEdit::Quantity(quantity_or_one(Some(q))),
            LineEdit::UnitPrice(p) => LineEdit::UnitPrice(price_or_zero(Some(p))),
        }
    }

    pub fn apply_to(&self, line: &mut MaterialLine) {
        match *self {
            LineEdit::Ordered(v) => line.ordered = v,
            LineEdit::Quantity(q) => line.qty = q,
            LineEdit::UnitPrice(p) => line.unit_price = p,
        }
    }

    /// Whether `line` still holds the value this edit wrote.
    pub(crate) fn is_applied_to(&self, line: &MaterialLine) -> bool {
        match *self {
            LineEdit::Ordered(v) => line.ordered == v,
            LineEdit::Quantity(q) => line.qty == q,
            LineEdit::UnitPrice(p) => line.unit_price == p,
        }
    }

    /// Copy the one column this edit touches from `from` into `to`.
    pub(crate) fn copy_field(&self, from: &MaterialLine, to: &mut MaterialLine) {
        match self {
            LineEdit::Ordered(_) => to.ordered = from.ordered,
            LineEdit::Quantity(_) => to.qty = from.qty,
            LineEdit::UnitPrice(_) => to.unit_price = from.unit_price,
        }
    }

    /// The single-column patch sent to the store.
    pub fn to_patch(&self) -> DomainResult<Row> {
        let (column, value) = match *self {
            LineEdit::Ordered(v) => ("ordered", serde_json::Value::Bool(v)),
            LineEdit::Quantity(q) => ("qty", encode_decimal(q)?),
            LineEdit::UnitPrice(p) => ("unit_price", encode_decimal(p)?),
        };
        Ok(patch(column, value))
    }

    pub fn describe(&self) -> &'static str {
        match self {
            LineEdit::Ordered(_) => "ordered flag",
            LineEdit::Quantity(_) => "quantity",
            LineEdit::UnitPrice(_) => "unit price",
        }
    }
}

fn encode_decimal(value: Decimal) -> DomainResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| DomainError::validation(format!("amount: {e}")))
}
