//! Quote engine: customer creation, line mutations and reads against the
//! persistence collaborator.

use chrono::NaiveDate;

use fieldquote_auth::Session;
use fieldquote_core::store::{from_row, patch, to_row};
use fieldquote_core::{
    CustomerId, Direction, DomainError, DomainResult, MaterialLineId, Persistence, Query, Row,
    StoreError, Table,
};

use crate::customer::{CustomerRecord, NewCustomer};
use crate::line::{LineEdit, LineInput, MaterialLine, normalize_lines};
use crate::sheet::{MutationOutcome, PendingChange, PendingMutation, QuoteSheet};

const CUSTOMER: &str = "customer";
const LINE: &str = "material line";

/// A freshly created customer and the lines stored with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCustomer {
    pub customer: CustomerRecord,
    pub lines: Vec<MaterialLine>,
}

impl CreatedCustomer {
    pub fn into_sheet(self) -> QuoteSheet {
        QuoteSheet::new(self.customer, self.lines)
    }
}

/// Quote operations. Every entry point takes the caller's session first.
#[derive(Debug, Clone)]
pub struct QuoteEngine<P> {
    store: P,
}

impl<P: Persistence> QuoteEngine<P> {
    pub fn new(store: P) -> Self {
        Self { store }
    }

    /// Create a customer together with its initial material lines.
    ///
    /// Lines are normalised first (blank items dropped, quantity and price
    /// defaulted). The customer row is written before the lines; if the line
    /// insert then fails the error is [`DomainError::PartialCreate`] naming the
    /// customer that now exists without lines. Once the lines are stored, a
    /// response that cannot be decoded is a plain persistence error.
    pub async fn create_customer(
        &self,
        session: &Session,
        input: NewCustomer,
        lines: Vec<LineInput>,
    ) -> DomainResult<CreatedCustomer> {
        session.admit()?;
        let insert = input.to_insert()?;
        let kept = normalize_lines(&lines);

        let record = to_row(&insert).map_err(|e| DomainError::persistence("encode customer", e))?;
        let row = self
            .store
            .create(Table::Customers, record)
            .await
            .map_err(|e| {
                DomainError::persistence(format!("create customer '{}'", insert.name), e)
            })?;
        let customer: CustomerRecord =
            from_row(row).map_err(|e| DomainError::persistence("decode customer", e))?;

        tracing::info!(
            customer_id = %customer.id,
            submitted = lines.len(),
            kept = kept.len(),
            "customer created"
        );

        if kept.is_empty() {
            return Ok(CreatedCustomer {
                customer,
                lines: Vec::new(),
            });
        }

        let partial = |source: StoreError| {
            tracing::warn!(
                customer_id = %customer.id,
                error = %source,
                "initial material lines not saved"
            );
            DomainError::PartialCreate {
                customer_id: customer.id,
                source,
            }
        };

        let records = kept
            .iter()
            .map(|l| to_row(&l.for_customer(customer.id)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(partial)?;
        let stored = self
            .store
            .create_many(Table::Materials, records)
            .await
            .map_err(partial)?;
        // The lines exist from here on; a bad response is not a partial create.
        let lines = decode_all::<MaterialLine>(stored, "decode material lines")?;

        Ok(CreatedCustomer { customer, lines })
    }

    /// Every customer, newest first.
    pub async fn list_customers(&self, session: &Session) -> DomainResult<Vec<CustomerRecord>> {
        session.admit()?;
        let rows = self
            .store
            .read(Table::Customers, Query::all().order_by("id", Direction::Desc))
            .await
            .map_err(|e| DomainError::persistence("list customers", e))?;
        let customers = decode_all::<CustomerRecord>(rows, "decode customers")?;

        tracing::debug!(count = customers.len(), "listed customers");
        Ok(customers)
    }

    /// A customer's material lines in creation order.
    pub async fn lines_for(
        &self,
        session: &Session,
        customer_id: CustomerId,
    ) -> DomainResult<Vec<MaterialLine>> {
        session.admit()?;
        let rows = self
            .store
            .read(
                Table::Materials,
                Query::all()
                    .eq("customer_id", customer_id.get())
                    .order_by("id", Direction::Asc),
            )
            .await
            .map_err(|e| {
                DomainError::persistence(format!("load lines of customer {customer_id}"), e)
            })?;
        decode_all(rows, "decode material lines")
    }

    /// Load one customer and its lines into an editable sheet.
    pub async fn load_customer(
        &self,
        session: &Session,
        customer_id: CustomerId,
    ) -> DomainResult<QuoteSheet> {
        session.admit()?;
        let rows = self
            .store
            .read(Table::Customers, Query::all().eq("id", customer_id.get()))
            .await
            .map_err(|e| DomainError::persistence(format!("load customer {customer_id}"), e))?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found(CUSTOMER, customer_id.get()))?;
        let customer: CustomerRecord =
            from_row(row).map_err(|e| DomainError::persistence("decode customer", e))?;

        let lines = self.lines_for(session, customer_id).await?;
        tracing::debug!(customer_id = %customer_id, lines = lines.len(), "customer loaded");
        Ok(QuoteSheet::new(customer, lines))
    }

    /// Store a new line for the sheet's customer, then append it.
    ///
    /// Not optimistic: the line has no id until the store assigns one.
    pub async fn add_line(
        &self,
        session: &Session,
        sheet: &mut QuoteSheet,
        input: LineInput,
    ) -> DomainResult<MaterialLine> {
        session.admit()?;
        let line = input
            .normalize()
            .ok_or_else(|| DomainError::validation("material item is required"))?;
        let customer_id = sheet.customer().id;

        let record = to_row(&line.for_customer(customer_id))
            .map_err(|e| DomainError::persistence("encode material line", e))?;
        let row = self
            .store
            .create(Table::Materials, record)
            .await
            .map_err(|e| {
                let intent = format!("add '{}' to customer {customer_id}", line.item);
                DomainError::persistence(intent, e)
            })?;
        let stored: MaterialLine =
            from_row(row).map_err(|e| DomainError::persistence("decode material line", e))?;

        tracing::info!(
            customer_id = %customer_id,
            line_id = %stored.line_id(),
            "material line added"
        );
        sheet.push_confirmed(stored.clone());
        Ok(stored)
    }

    /// Apply `edit` to the sheet, commit it and record the answer.
    ///
    /// A failed commit comes back as [`MutationOutcome::Failed`]; the local
    /// value stays in place until the caller rolls it back.
    pub async fn edit_line(
        &self,
        session: &Session,
        sheet: &mut QuoteSheet,
        line_id: MaterialLineId,
        edit: LineEdit,
    ) -> DomainResult<MutationOutcome> {
        session.admit()?;
        let pending = sheet.begin(line_id, edit)?;
        let outcome = self.persist(pending).await;
        sheet.settle(&outcome);
        Ok(outcome)
    }

    /// Flip the procurement flag. Each call is persisted on its own.
    pub async fn toggle_ordered(
        &self,
        session: &Session,
        sheet: &mut QuoteSheet,
        line_id: MaterialLineId,
        ordered: bool,
    ) -> DomainResult<MutationOutcome> {
        self.edit_line(session, sheet, line_id, LineEdit::Ordered(ordered))
            .await
    }

    /// Remove the line locally, then delete it in the store.
    pub async fn remove_line(
        &self,
        session: &Session,
        sheet: &mut QuoteSheet,
        line_id: MaterialLineId,
    ) -> DomainResult<MutationOutcome> {
        session.admit()?;
        let pending = sheet.begin_remove(line_id)?;
        Ok(self.persist(pending).await)
    }

    /// Second phase for a mutation staged with [`QuoteSheet::begin`] or
    /// [`QuoteSheet::begin_remove`]. The sheet is left untouched; pass the
    /// outcome to [`QuoteSheet::settle`].
    pub async fn commit(&self, session: &Session, pending: PendingMutation) -> MutationOutcome {
        if let Err(reason) = session.admit() {
            return MutationOutcome::Failed { pending, reason };
        }
        self.persist(pending).await
    }

    /// Set or clear the installation date. `None` is stored as an explicit null.
    ///
    /// When `sheet` holds the same customer, it picks up the stored record.
    pub async fn set_install_date(
        &self,
        session: &Session,
        sheet: Option<&mut QuoteSheet>,
        customer_id: CustomerId,
        date: Option<NaiveDate>,
    ) -> DomainResult<CustomerRecord> {
        session.admit()?;
        let value = serde_json::to_value(date)
            .map_err(|e| DomainError::validation(format!("install date: {e}")))?;
        let row = self
            .store
            .update(Table::Customers, customer_id.get(), patch("install_date", value))
            .await
            .map_err(|e| {
                let intent = format!("set install date of customer {customer_id}");
                DomainError::from_store(CUSTOMER, intent, e)
            })?;
        let customer: CustomerRecord =
            from_row(row).map_err(|e| DomainError::persistence("decode customer", e))?;

        if let Some(sheet) = sheet.filter(|s| s.customer().id == customer_id) {
            sheet.set_customer(customer.clone());
        }
        tracing::info!(
            customer_id = %customer_id,
            install_date = ?customer.install_date,
            "install date set"
        );
        Ok(customer)
    }

    async fn persist(&self, pending: PendingMutation) -> MutationOutcome {
        let line_id = pending.line_id();
        let result = match pending.change() {
            PendingChange::Edit(edit) => self.persist_edit(line_id, edit).await.map(Some),
            PendingChange::Remove { .. } => self.persist_remove(line_id).await.map(|()| None),
        };

        match result {
            Ok(stored) => {
                tracing::info!(line_id = %line_id, "material line change confirmed");
                MutationOutcome::Confirmed { pending, stored }
            }
            Err(reason) => {
                tracing::warn!(line_id = %line_id, error = %reason, "material line change failed");
                MutationOutcome::Failed { pending, reason }
            }
        }
    }

    async fn persist_edit(
        &self,
        line_id: MaterialLineId,
        edit: &LineEdit,
    ) -> DomainResult<MaterialLine> {
        let intent = format!("update {} of line {line_id}", edit.describe());
        let change: Row = edit.to_patch()?;
        let row = self
            .store
            .update(Table::Materials, line_id.get(), change)
            .await
            .map_err(|e| DomainError::from_store(LINE, intent.as_str(), e))?;
        from_row(row).map_err(|e| DomainError::persistence(intent, e))
    }

    async fn persist_remove(&self, line_id: MaterialLineId) -> DomainResult<()> {
        self.store
            .delete(Table::Materials, line_id.get())
            .await
            .map_err(|e| DomainError::from_store(LINE, format!("remove line {line_id}"), e))
    }
}

fn decode_all<T>(rows: Vec<Row>, intent: &str) -> DomainResult<Vec<T>>
where
    T: serde::de::DeserializeOwned,
{
    rows.into_iter()
        .map(from_row::<T>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DomainError::persistence(intent, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use fieldquote_core::{InMemoryStore, UserId};
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::line::Priced;
    use crate::sheet::SyncState;

    type Engine = QuoteEngine<Arc<InMemoryStore>>;

    fn session() -> Session {
        Session::new(UserId::new(), "planner@example.com", "t", Utc::now() + Duration::hours(1))
    }

    fn expired_session() -> Session {
        let expired_at = Utc::now() - Duration::minutes(1);
        Session::new(UserId::new(), "x@example.com", "t", expired_at)
    }

    fn engine() -> (Arc<InMemoryStore>, Engine) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), QuoteEngine::new(store))
    }

    async fn seeded(engine: &Engine) -> QuoteSheet {
        engine
            .create_customer(
                &session(),
                NewCustomer::new("Jan de Vries").with_phone("0612345678"),
                vec![
                    LineInput::new("Pipe", dec!(3), dec!(2.50)),
                    LineInput::new("Valve", dec!(1), dec!(12)),
                ],
            )
            .await
            .unwrap()
            .into_sheet()
    }

    #[tokio::test]
    async fn create_customer_normalizes_and_drops_lines() {
        let (store, engine) = engine();
        let created = engine
            .create_customer(
                &session(),
                NewCustomer::new("Jan de Vries"),
                vec![
                    LineInput::new("", dec!(2), dec!(5)),
                    LineInput::new("Pipe", dec!(0), dec!(-1)),
                ],
            )
            .await
            .unwrap();

        let rows = store.rows(Table::Materials);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["customer_id"], json!(created.customer.id.get()));
        assert_eq!(rows[0]["ordered"], json!(false));

        let line = &created.lines[0];
        assert_eq!(line.item(), "Pipe");
        assert_eq!(line.qty(), dec!(1));
        assert_eq!(line.unit_price(), dec!(0));
        assert!(!line.is_ordered());
    }

    #[tokio::test]
    async fn create_customer_requires_name() {
        let (store, engine) = engine();
        let err = engine
            .create_customer(
                &session(),
                NewCustomer::new("  "),
                vec![LineInput::new("Pipe", dec!(1), dec!(1))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(store.rows(Table::Customers).is_empty());
        assert!(store.rows(Table::Materials).is_empty());
    }

    #[tokio::test]
    async fn create_customer_without_lines_skips_line_insert() {
        let (store, engine) = engine();
        let created = engine
            .create_customer(&session(), NewCustomer::new("Anna"), vec![LineInput::blank()])
            .await
            .unwrap();
        assert!(created.lines.is_empty());
        assert_eq!(store.write_attempts(Table::Materials), 0);
    }

    #[tokio::test]
    async fn line_failure_reports_partial_create() {
        let (store, engine) = engine();
        store.fail_writes(Table::Materials);

        let err = engine
            .create_customer(
                &session(),
                NewCustomer::new("Jan de Vries"),
                vec![LineInput::new("Pipe", dec!(1), dec!(2))],
            )
            .await
            .unwrap_err();

        let customer_id = match err {
            DomainError::PartialCreate { customer_id, .. } => customer_id,
            other => panic!("expected PartialCreate, got {other:?}"),
        };
        assert_eq!(store.rows(Table::Customers).len(), 1);
        assert!(store.rows(Table::Materials).is_empty());

        store.heal(Table::Materials);
        let sheet = engine.load_customer(&session(), customer_id).await.unwrap();
        assert!(sheet.lines().is_empty());
    }

    /// Stores lines faithfully but answers with rows that cannot be decoded.
    struct GarbledLineResponses(Arc<InMemoryStore>);

    #[async_trait::async_trait]
    impl Persistence for GarbledLineResponses {
        async fn create(&self, table: Table, record: Row) -> Result<Row, StoreError> {
            self.0.create(table, record).await
        }

        async fn create_many(
            &self,
            table: Table,
            records: Vec<Row>,
        ) -> Result<Vec<Row>, StoreError> {
            let rows = self.0.create_many(table, records).await?;
            Ok(rows
                .into_iter()
                .map(|mut row| {
                    row.insert("qty".into(), json!("n/a"));
                    row
                })
                .collect())
        }

        async fn read(&self, table: Table, query: Query) -> Result<Vec<Row>, StoreError> {
            self.0.read(table, query).await
        }

        async fn update(&self, table: Table, id: i64, patch: Row) -> Result<Row, StoreError> {
            self.0.update(table, id, patch).await
        }

        async fn delete(&self, table: Table, id: i64) -> Result<(), StoreError> {
            self.0.delete(table, id).await
        }
    }

    #[tokio::test]
    async fn undecodable_response_after_line_insert_is_not_partial_create() {
        let store = Arc::new(InMemoryStore::new());
        let engine = QuoteEngine::new(GarbledLineResponses(store.clone()));

        let err = engine
            .create_customer(
                &session(),
                NewCustomer::new("Jan de Vries"),
                vec![LineInput::new("Pipe", dec!(1), dec!(2))],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Persistence {
                source: StoreError::Decode(_),
                ..
            }
        ));
        assert_eq!(store.rows(Table::Materials).len(), 1);
    }

    #[tokio::test]
    async fn created_lines_read_back_unchanged() {
        let (_, engine) = engine();
        let submitted = vec![
            LineInput::new("Pipe", dec!(3), dec!(2.50)),
            LineInput::new("Valve", dec!(1), dec!(12)),
            LineInput::new("Anchor", dec!(40), dec!(0.15)),
        ];
        let created = engine
            .create_customer(&session(), NewCustomer::new("Jan"), submitted.clone())
            .await
            .unwrap();

        let lines = engine.lines_for(&session(), created.customer.id).await.unwrap();
        assert_eq!(lines.len(), submitted.len());
        for (line, input) in lines.iter().zip(&submitted) {
            assert_eq!(line.item(), input.item);
            assert_eq!(Some(line.qty()), input.qty);
            assert_eq!(Some(line.unit_price()), input.unit_price);
            assert!(!line.is_ordered());
        }
        let ids: Vec<_> = lines.iter().map(|l| l.line_id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn toggle_twice_persists_each_call() {
        let (store, engine) = engine();
        let mut sheet = seeded(&engine).await;
        let line_id = sheet.lines()[0].line().line_id();
        let before = store.write_attempts(Table::Materials);

        let first = engine.toggle_ordered(&session(), &mut sheet, line_id, true).await.unwrap();
        let second = engine.toggle_ordered(&session(), &mut sheet, line_id, false).await.unwrap();

        assert!(first.is_confirmed());
        assert!(second.is_confirmed());
        assert_eq!(store.write_attempts(Table::Materials), before + 2);
        assert!(!sheet.line(line_id).unwrap().line().is_ordered());

        let stored = engine.lines_for(&session(), sheet.customer().id).await.unwrap();
        assert!(!stored[0].is_ordered());
    }

    #[tokio::test]
    async fn failed_toggle_keeps_optimistic_value() {
        let (store, engine) = engine();
        let mut sheet = seeded(&engine).await;
        let line_id = sheet.lines()[0].line().line_id();
        store.fail_writes(Table::Materials);

        let outcome = engine.toggle_ordered(&session(), &mut sheet, line_id, true).await.unwrap();
        assert!(matches!(
            outcome.failure(),
            Some(DomainError::Persistence { .. })
        ));

        let tracked = sheet.line(line_id).unwrap();
        assert!(tracked.line().is_ordered());
        assert_eq!(tracked.sync(), SyncState::Failed);

        sheet.rollback(outcome.pending());
        assert!(!sheet.line(line_id).unwrap().line().is_ordered());
    }

    #[tokio::test]
    async fn edit_quantity_updates_total() {
        let (_, engine) = engine();
        let mut sheet = seeded(&engine).await;
        assert_eq!(sheet.total(), dec!(19.50));

        let line_id = sheet.lines()[0].line().line_id();
        engine
            .edit_line(&session(), &mut sheet, line_id, LineEdit::Quantity(dec!(4)))
            .await
            .unwrap();
        assert_eq!(sheet.total(), dec!(22.00));
        assert_eq!(sheet.line(line_id).unwrap().sync(), SyncState::Persisted);
    }

    #[tokio::test]
    async fn edit_of_deleted_line_is_not_found() {
        let (store, engine) = engine();
        let mut sheet = seeded(&engine).await;
        let line_id = sheet.lines()[0].line().line_id();
        store.delete(Table::Materials, line_id.get()).await.unwrap();

        let outcome = engine
            .edit_line(&session(), &mut sheet, line_id, LineEdit::UnitPrice(dec!(3)))
            .await
            .unwrap();
        assert_eq!(
            outcome.failure(),
            Some(&DomainError::not_found("material line", line_id.get()))
        );
    }

    #[tokio::test]
    async fn add_and_remove_lines() {
        let (store, engine) = engine();
        let mut sheet = seeded(&engine).await;

        let added = engine
            .add_line(&session(), &mut sheet, LineInput::new(" Anchor ", dec!(10), dec!(0.20)))
            .await
            .unwrap();
        assert_eq!(added.item(), "Anchor");
        assert_eq!(sheet.lines().len(), 3);
        assert_eq!(sheet.total(), dec!(21.50));

        let outcome = engine.remove_line(&session(), &mut sheet, added.line_id()).await.unwrap();
        assert!(outcome.is_confirmed());
        assert_eq!(sheet.lines().len(), 2);
        assert_eq!(store.rows(Table::Materials).len(), 2);
    }

    #[tokio::test]
    async fn add_line_rejects_blank_item() {
        let (_, engine) = engine();
        let mut sheet = seeded(&engine).await;
        let err = engine
            .add_line(&session(), &mut sheet, LineInput::blank())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn failed_remove_can_be_restored() {
        let (store, engine) = engine();
        let mut sheet = seeded(&engine).await;
        let line_id = sheet.lines()[1].line().line_id();
        store.fail_writes(Table::Materials);

        let outcome = engine.remove_line(&session(), &mut sheet, line_id).await.unwrap();
        assert!(outcome.failure().is_some());
        assert!(sheet.line(line_id).is_none());

        sheet.rollback(outcome.pending());
        assert!(sheet.line(line_id).is_some());
        assert_eq!(sheet.total(), dec!(19.50));
    }

    #[tokio::test]
    async fn staged_mutation_commits_separately() {
        let (_, engine) = engine();
        let mut sheet = seeded(&engine).await;
        let line_id = sheet.lines()[1].line().line_id();

        let pending = sheet.begin(line_id, LineEdit::UnitPrice(dec!(15))).unwrap();
        assert_eq!(sheet.line(line_id).unwrap().sync(), SyncState::Dirty);

        let outcome = engine.commit(&session(), pending).await;
        sheet.settle(&outcome);
        let tracked = sheet.line(line_id).unwrap();
        assert_eq!(tracked.sync(), SyncState::Persisted);
        assert_eq!(tracked.confirmed().unit_price(), dec!(15));
    }

    #[tokio::test]
    async fn commit_with_expired_session_fails_without_writing() {
        let (store, engine) = engine();
        let mut sheet = seeded(&engine).await;
        let line_id = sheet.lines()[0].line().line_id();
        let before = store.write_attempts(Table::Materials);

        let pending = sheet.begin(line_id, LineEdit::Ordered(true)).unwrap();
        let stale = expired_session();
        let outcome = engine.commit(&stale, pending).await;

        assert!(matches!(outcome.failure(), Some(DomainError::Unauthenticated(_))));
        assert_eq!(store.write_attempts(Table::Materials), before);
    }

    #[tokio::test]
    async fn install_date_can_be_set_and_cleared() {
        let (store, engine) = engine();
        let sheet = seeded(&engine).await;
        let id = sheet.customer().id;

        let date = NaiveDate::from_ymd_opt(2024, 6, 3);
        let updated = engine.set_install_date(&session(), None, id, date).await.unwrap();
        assert_eq!(updated.install_date, date);

        let cleared = engine.set_install_date(&session(), None, id, None).await.unwrap();
        assert_eq!(cleared.install_date, None);
        let row = &store.rows(Table::Customers)[0];
        assert_eq!(row.get("install_date"), Some(&json!(null)));
    }

    #[tokio::test]
    async fn install_date_refreshes_the_loaded_sheet() {
        let (_, engine) = engine();
        let mut sheet = seeded(&engine).await;
        let id = sheet.customer().id;
        let date = NaiveDate::from_ymd_opt(2024, 9, 12);

        engine
            .set_install_date(&session(), Some(&mut sheet), id, date)
            .await
            .unwrap();
        assert_eq!(sheet.customer().install_date, date);

        let other = engine
            .create_customer(&session(), NewCustomer::new("Anna"), Vec::new())
            .await
            .unwrap();
        engine
            .set_install_date(&session(), Some(&mut sheet), other.customer.id, None)
            .await
            .unwrap();
        assert_eq!(sheet.customer().id, id);
        assert_eq!(sheet.customer().install_date, date);
    }

    #[tokio::test]
    async fn install_date_of_unknown_customer_is_not_found() {
        let (_, engine) = engine();
        let err = engine
            .set_install_date(&session(), None, CustomerId::new(42), None)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::not_found("customer", 42));
    }

    #[tokio::test]
    async fn customers_are_listed_newest_first() {
        let (_, engine) = engine();
        for name in ["Anna", "Bram", "Cees"] {
            engine
                .create_customer(&session(), NewCustomer::new(name), Vec::new())
                .await
                .unwrap();
        }
        let names: Vec<_> = engine
            .list_customers(&session())
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Cees", "Bram", "Anna"]);
    }

    #[tokio::test]
    async fn unknown_customer_is_not_found() {
        let (_, engine) = engine();
        let err = engine.load_customer(&session(), CustomerId::new(7)).await.unwrap_err();
        assert_eq!(err, DomainError::not_found("customer", 7));
    }

    #[tokio::test]
    async fn expired_session_is_refused_before_any_write() {
        let (store, engine) = engine();
        let stale = expired_session();
        let err = engine
            .create_customer(&stale, NewCustomer::new("Jan"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthenticated(_)));
        assert_eq!(store.write_attempts(Table::Customers), 0);
    }
}
