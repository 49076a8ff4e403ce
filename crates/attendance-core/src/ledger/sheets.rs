//! Google Sheets v4 backed ledger.

use super::auth::{fetch_access_token, AccessToken, ServiceAccountKey};
use super::{AttendanceRecord, Ledger, LedgerFactory, Row, KEY_COLUMNS, SHEET_NAME};
use crate::config::Config;
use crate::error::{CredentialsError, RegistrationError, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

/// `values.get` response; `values` is omitted for an empty range
#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Row>,
}

/// Authenticated handle on one spreadsheet tab
#[derive(Debug, Clone)]
pub struct SheetsLedger {
    agent: ureq::Agent,
    base_url: String,
    spreadsheet_id: String,
    token: AccessToken,
}

impl SheetsLedger {
    pub fn new(
        agent: ureq::Agent,
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        token: AccessToken,
    ) -> Self {
        Self {
            agent,
            base_url: base_url.into(),
            spreadsheet_id: spreadsheet_id.into(),
            token,
        }
    }

    /// `{base}/v4/spreadsheets/{id}/values/{target}` with `target` percent-encoded
    pub fn values_url(&self, target: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(RegistrationError::ledger)?;
        url.path_segments_mut()
            .map_err(|()| RegistrationError::ledger(format!("unusable base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", target]);
        Ok(url)
    }

    fn get_values(&self, range: &str) -> Result<Vec<Row>> {
        let url = self.values_url(range)?;
        debug!("Sheets values.get {range}");

        let response = self
            .agent
            .get(url.as_str())
            .set("Authorization", &self.token.header_value())
            .call()
            .map_err(RegistrationError::ledger)?;
        let body = response.into_string().map_err(RegistrationError::ledger)?;

        parse_value_range(&body)
    }
}

/// Rows from a `values.get` JSON body
pub fn parse_value_range(body: &str) -> Result<Vec<Row>> {
    let range: ValueRange = serde_json::from_str(body).map_err(RegistrationError::ledger)?;
    Ok(range.values)
}

impl Ledger for SheetsLedger {
    fn read_all(&self) -> Result<Vec<Row>> {
        self.get_values(SHEET_NAME)
    }

    fn read_key_columns(&self) -> Result<Vec<Row>> {
        self.get_values(&format!("{SHEET_NAME}!{KEY_COLUMNS}"))
    }

    fn append(&self, record: &AttendanceRecord) -> Result<()> {
        let mut url = self.values_url(&format!("{SHEET_NAME}:append"))?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        self.agent
            .post(url.as_str())
            .set("Authorization", &self.token.header_value())
            .send_json(serde_json::json!({ "values": [record.to_row()] }))
            .map_err(RegistrationError::ledger)?;

        info!(date = %record.date, event = %record.event_name, "Appended attendance row");
        Ok(())
    }
}

/// Opens a [`SheetsLedger`] using the configured service account
#[derive(Debug, Clone)]
pub struct SheetsLedgerFactory {
    agent: ureq::Agent,
    base_url: String,
    spreadsheet_id: String,
    credentials_json: Option<String>,
}

impl SheetsLedgerFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            base_url: config.sheets_base_url.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            credentials_json: config.credentials_json.clone(),
        }
    }

    fn access_token(&self) -> std::result::Result<AccessToken, CredentialsError> {
        let payload = self
            .credentials_json
            .as_deref()
            .ok_or(CredentialsError::Missing)?;
        let key = ServiceAccountKey::from_json(payload)?;
        fetch_access_token(&self.agent, &key)
    }
}

impl LedgerFactory for SheetsLedgerFactory {
    type Ledger = SheetsLedger;

    fn open(&self) -> Result<SheetsLedger> {
        let token = self.access_token().map_err(|err| {
            warn!("Ledger credentials unavailable: {err}");
            RegistrationError::CredentialsUnavailable
        })?;

        Ok(SheetsLedger::new(
            self.agent.clone(),
            self.base_url.clone(),
            self.spreadsheet_id.clone(),
            token,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(base_url: &str) -> SheetsLedger {
        SheetsLedger::new(
            ureq::AgentBuilder::new().build(),
            base_url,
            "1AbC-sheet",
            AccessToken::new("token"),
        )
    }

    #[test]
    fn test_values_url_encodes_range() {
        let url = ledger("https://sheets.googleapis.com")
            .values_url(&format!("{SHEET_NAME}!{KEY_COLUMNS}"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/1AbC-sheet/values/P%C3%A1gina1!A:B"
        );
    }

    #[test]
    fn test_values_url_keeps_base_path() {
        let url = ledger("http://localhost:8080/proxy/").values_url("Sheet1").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/proxy/v4/spreadsheets/1AbC-sheet/values/Sheet1"
        );
    }

    #[test]
    fn test_values_url_rejects_bad_base() {
        assert!(matches!(
            ledger("not a url").values_url("Sheet1"),
            Err(RegistrationError::LedgerUnavailable(_))
        ));
    }

    #[test]
    fn test_parse_value_range() {
        let body = r#"{"range":"'Página1'!A1:B2","majorDimension":"ROWS","values":[["abc123","2024-03-01"],["def456"]]}"#;
        let rows = parse_value_range(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["abc123".to_string(), "2024-03-01".to_string()]);
        assert_eq!(rows[1], vec!["def456".to_string()]);
    }

    #[test]
    fn test_empty_range_has_no_values_field() {
        let body = r#"{"range":"'Página1'!A1:Z1000","majorDimension":"ROWS"}"#;
        assert!(parse_value_range(body).unwrap().is_empty());
    }

    #[test]
    fn test_unreachable_ledger_is_unavailable() {
        let ledger = ledger("http://127.0.0.1:9");
        assert!(matches!(
            ledger.read_all(),
            Err(RegistrationError::LedgerUnavailable(_))
        ));
        assert!(matches!(
            ledger.has_registered_today("abc123", "2024-03-01"),
            Err(RegistrationError::LedgerUnavailable(_))
        ));
    }

    #[test]
    fn test_factory_without_credentials() {
        let factory = SheetsLedgerFactory::new(&Config {
            spreadsheet_id: "1AbC-sheet".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            factory.open(),
            Err(RegistrationError::CredentialsUnavailable)
        ));
    }

    #[test]
    fn test_factory_with_malformed_credentials() {
        let factory = SheetsLedgerFactory::new(&Config {
            spreadsheet_id: "1AbC-sheet".to_string(),
            credentials_json: Some("{\"client_email\": 7}".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            factory.open(),
            Err(RegistrationError::CredentialsUnavailable)
        ));
    }
}
