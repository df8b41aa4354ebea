use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fieldquote_core::{CustomerId, DomainError, DomainResult, Entity};

/// Customer identity, contact details and installation date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// `None` means "not yet scheduled".
    #[serde(default)]
    pub install_date: Option<NaiveDate>,
}

impl Entity for CustomerRecord {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub install_date: Option<NaiveDate>,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_install_date(mut self, date: NaiveDate) -> Self {
        self.install_date = Some(date);
        self
    }

    /// Validate and build the insert row. Blank contact fields become null.
    pub(crate) fn to_insert(&self) -> DomainResult<CustomerInsert<'_>> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        Ok(CustomerInsert {
            name,
            email: blank_to_none(self.email.as_deref()),
            phone: blank_to_none(self.phone.as_deref()),
            address: blank_to_none(self.address.as_deref()),
            install_date: self.install_date,
        })
    }
}

/// Insert payload for the `customers` table.
#[derive(Debug, Serialize)]
pub(crate) struct CustomerInsert<'a> {
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub install_date: Option<NaiveDate>,
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a date field: blank input means "not yet scheduled".
pub fn parse_install_date(input: &str) -> DomainResult<Option<NaiveDate>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| DomainError::validation(format!("install date '{trimmed}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldquote_core::store::{from_row, to_row};
    use serde_json::json;

    #[test]
    fn blank_name_is_rejected() {
        let err = NewCustomer::new("   ").to_insert().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn blank_contact_fields_are_persisted_as_null() {
        let input = NewCustomer::new(" Jan de Vries ")
            .with_phone("0612345678")
            .with_email("  ");
        let row = to_row(&input.to_insert().unwrap()).unwrap();

        assert_eq!(row["name"], json!("Jan de Vries"));
        assert_eq!(row["phone"], json!("0612345678"));
        assert_eq!(row["email"], json!(null));
        assert_eq!(row["address"], json!(null));
        assert_eq!(row["install_date"], json!(null));
    }

    #[test]
    fn record_reads_rows_with_missing_optional_columns() {
        let row = to_row(&json!({"id": 5, "name": "Jan", "created_at": "2024-01-01T10:00:00Z"}))
            .unwrap();
        let customer: CustomerRecord = from_row(row).unwrap();
        assert_eq!(customer.id, CustomerId::new(5));
        assert_eq!(customer.phone, None);
        assert_eq!(customer.install_date, None);
    }

    #[test]
    fn install_date_parsing() {
        assert_eq!(parse_install_date("").unwrap(), None);
        assert_eq!(
            parse_install_date("2024-06-03").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 3)
        );
        assert!(matches!(
            parse_install_date("03-06-2024"),
            Err(DomainError::Validation(_))
        ));
    }
}
