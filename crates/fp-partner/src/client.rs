//! Partner API client.

use std::sync::Arc;

use forcepack_client::{xml, SessionGateway, SoapApi, Transport};
use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind, Result};
use crate::types::{
    ApiError, DeleteResult, ExecuteAnonymousResult, QueryResult, Record, SaveResult,
};

/// Maximum records per `create`/`update`/`delete`/`undelete` call; the
/// Partner API rejects larger batches.
pub const CRUD_BATCH_SIZE: usize = 200;

const PARTNER_XMLNS: &str = "urn:partner.soap.sforce.com";
const SOBJECT_XMLNS: &str = "urn:sobject.partner.soap.sforce.com";
const APEX_XMLNS: &str = "http://soap.sforce.com/2006/08/apex";

/// Thin, typed pass-through over the Partner API record operations.
///
/// All calls go through the shared [`SessionGateway`], so session renewal
/// is handled uniformly.
#[derive(Debug, Clone)]
pub struct PartnerApi<T> {
    gateway: Arc<SessionGateway<T>>,
}

impl<T: Transport> PartnerApi<T> {
    pub fn new(gateway: Arc<SessionGateway<T>>) -> Self {
        Self { gateway }
    }

    // ========================================================================
    // Query Operations
    // ========================================================================

    /// Execute a SOQL query, returning the first page.
    #[instrument(skip(self))]
    pub async fn query(&self, soql: &str) -> Result<QueryResult> {
        let body = format!(
            r#"<query xmlns="{PARTNER_XMLNS}"><queryString>{}</queryString></query>"#,
            xml::escape(soql)
        );
        let response = self.gateway.invoke(SoapApi::Partner, "query", &body).await?;
        parse_query_result(&response)
    }

    /// Execute a SOQL query including deleted and archived records.
    #[instrument(skip(self))]
    pub async fn query_including_deleted(&self, soql: &str) -> Result<QueryResult> {
        let body = format!(
            r#"<queryAll xmlns="{PARTNER_XMLNS}"><queryString>{}</queryString></queryAll>"#,
            xml::escape(soql)
        );
        let response = self
            .gateway
            .invoke(SoapApi::Partner, "queryAll", &body)
            .await?;
        parse_query_result(&response)
    }

    /// Fetch the next page for a query locator.
    #[instrument(skip(self))]
    pub async fn query_more(&self, locator: &str) -> Result<QueryResult> {
        let body = format!(
            r#"<queryMore xmlns="{PARTNER_XMLNS}"><queryLocator>{}</queryLocator></queryMore>"#,
            xml::escape(locator)
        );
        let response = self
            .gateway
            .invoke(SoapApi::Partner, "queryMore", &body)
            .await?;
        parse_query_result(&response)
    }

    /// Execute a SOQL query and drain every page via the locator.
    pub async fn query_all(&self, soql: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut page = self.query(soql).await?;
        loop {
            records.append(&mut page.records);
            if page.done {
                break;
            }
            let locator = page.query_locator.take().ok_or_else(|| {
                Error::new(ErrorKind::InvalidResponse(
                    "query page not done but no queryLocator".to_string(),
                ))
            })?;
            debug!(fetched = records.len(), "fetching next query page");
            page = self.query_more(&locator).await?;
        }
        Ok(records)
    }

    // ========================================================================
    // Record CRUD
    // ========================================================================

    /// Create records, batched in chunks of [`CRUD_BATCH_SIZE`].
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn create(&self, records: &[Record]) -> Result<Vec<SaveResult>> {
        self.save_call("create", records).await
    }

    /// Update records by Id, batched in chunks of [`CRUD_BATCH_SIZE`].
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn update(&self, records: &[Record]) -> Result<Vec<SaveResult>> {
        self.save_call("update", records).await
    }

    /// Delete records by Id, batched in chunks of [`CRUD_BATCH_SIZE`].
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete(&self, ids: &[String]) -> Result<Vec<DeleteResult>> {
        let mut results = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(CRUD_BATCH_SIZE) {
            let body = format!(
                r#"<delete xmlns="{PARTNER_XMLNS}">{}</delete>"#,
                id_elements(chunk)
            );
            let response = self
                .gateway
                .invoke(SoapApi::Partner, "delete", &body)
                .await?;
            results.extend(parse_delete_results(&response));
        }
        Ok(results)
    }

    /// Restore deleted records from the recycle bin, batched in chunks of
    /// [`CRUD_BATCH_SIZE`].
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn undelete(&self, ids: &[String]) -> Result<Vec<SaveResult>> {
        let mut results = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(CRUD_BATCH_SIZE) {
            let body = format!(
                r#"<undelete xmlns="{PARTNER_XMLNS}">{}</undelete>"#,
                id_elements(chunk)
            );
            let response = self
                .gateway
                .invoke(SoapApi::Partner, "undelete", &body)
                .await?;
            results.extend(parse_save_results(&response));
        }
        Ok(results)
    }

    async fn save_call(&self, operation: &str, records: &[Record]) -> Result<Vec<SaveResult>> {
        let mut results = Vec::with_capacity(records.len());
        for chunk in records.chunks(CRUD_BATCH_SIZE) {
            let mut sobjects = String::new();
            for record in chunk {
                sobjects.push_str(&record_xml(record)?);
            }
            let body = format!(
                r#"<{operation} xmlns="{PARTNER_XMLNS}" xmlns:so="{SOBJECT_XMLNS}">{sobjects}</{operation}>"#,
            );
            let response = self.gateway.invoke(SoapApi::Partner, operation, &body).await?;
            results.extend(parse_save_results(&response));
        }
        Ok(results)
    }

    // ========================================================================
    // Anonymous Apex
    // ========================================================================

    /// Compile and run an anonymous Apex block.
    #[instrument(skip(self, apex))]
    pub async fn execute_anonymous(&self, apex: &str) -> Result<ExecuteAnonymousResult> {
        let body = format!(
            r#"<executeAnonymous xmlns="{APEX_XMLNS}"><String>{}</String></executeAnonymous>"#,
            xml::escape(apex)
        );
        let response = self
            .gateway
            .invoke(SoapApi::Apex, "executeAnonymous", &body)
            .await?;
        parse_execute_anonymous_result(&response)
    }
}

/// Element names go into XML tags and cannot be escaped; reject anything
/// that is not a plain identifier.
fn is_safe_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn id_elements(ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("<ids>{}</ids>", xml::escape(id)))
        .collect()
}

fn record_xml(record: &Record) -> Result<String> {
    if !is_safe_element_name(&record.sobject_type) {
        return Err(Error::new(ErrorKind::UnsafeFieldName(
            record.sobject_type.clone(),
        )));
    }

    let mut fields_xml = String::new();
    if let Some(id) = &record.id {
        fields_xml.push_str(&format!("<so:Id>{}</so:Id>", xml::escape(id)));
    }
    for (name, value) in &record.fields {
        if !is_safe_element_name(name) {
            return Err(Error::new(ErrorKind::UnsafeFieldName(name.clone())));
        }
        fields_xml.push_str(&format!("<so:{name}>{}</so:{name}>", xml::escape(value)));
    }

    Ok(format!(
        "<sObjects><so:type>{}</so:type>{fields_xml}</sObjects>",
        xml::escape(&record.sobject_type)
    ))
}

fn parse_query_result(response: &str) -> Result<QueryResult> {
    if !response.contains("done") {
        return Err(Error::new(ErrorKind::InvalidResponse(
            "no query result in response".to_string(),
        )));
    }
    let query_locator = xml::extract_tag(response, "queryLocator").filter(|l| !l.is_empty());
    Ok(QueryResult {
        records: record_blocks(response)
            .into_iter()
            .map(parse_record)
            .collect(),
        query_locator,
        done: xml::extract_bool(response, "done"),
        size: xml::extract_u32(response, "size"),
    })
}

/// Collect the inner XML of each `<records ...>` element, tolerating the
/// `xsi:type` attribute the server attaches.
fn record_blocks(response: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = response;
    while let Some(start) = rest.find("<records") {
        let after = &rest[start..];
        let Some(open_end) = after.find('>') else { break };
        if after[..open_end].ends_with('/') {
            rest = &after[open_end + 1..];
            continue;
        }
        let Some(end) = after.find("</records>") else { break };
        blocks.push(&after[open_end + 1..end]);
        rest = &after[end + "</records>".len()..];
    }
    blocks
}

/// Parse the `sf:`-prefixed field elements of one record block.
fn parse_record(block: &str) -> Record {
    let mut record = Record::default();
    let mut rest = block;
    while let Some(start) = rest.find("<sf:") {
        let after = &rest[start + "<sf:".len()..];
        let Some(name_end) = after.find(['>', ' ', '/']) else { break };
        let name = &after[..name_end];
        let tail = &after[name_end..];
        let Some(gt) = tail.find('>') else { break };

        if tail[..gt].ends_with('/') || tail.starts_with('/') {
            // Self-closing element: a nil field. Skip it.
            rest = &tail[gt + 1..];
            continue;
        }

        let close = format!("</sf:{name}>");
        let Some(end) = tail[gt + 1..].find(&close) else { break };
        let value = xml::unescape(&tail[gt + 1..gt + 1 + end]);
        match name {
            "type" => record.sobject_type = value,
            "Id" => {
                // The Partner API repeats the Id element; keep one.
                if !value.is_empty() {
                    record.id = Some(value);
                }
            }
            _ => {
                record.fields.insert(name.to_string(), value);
            }
        }
        rest = &tail[gt + 1 + end + close.len()..];
    }
    record
}

fn parse_save_results(response: &str) -> Vec<SaveResult> {
    xml::extract_blocks(response, "result")
        .into_iter()
        .map(|block| SaveResult {
            id: xml::extract_tag(block, "id").filter(|id| !id.is_empty()),
            success: xml::extract_bool(block, "success"),
            errors: parse_api_errors(block),
        })
        .collect()
}

fn parse_delete_results(response: &str) -> Vec<DeleteResult> {
    xml::extract_blocks(response, "result")
        .into_iter()
        .map(|block| DeleteResult {
            id: xml::extract_tag(block, "id").filter(|id| !id.is_empty()),
            success: xml::extract_bool(block, "success"),
            errors: parse_api_errors(block),
        })
        .collect()
}

fn parse_api_errors(block: &str) -> Vec<ApiError> {
    xml::extract_blocks(block, "errors")
        .into_iter()
        .map(|error| ApiError {
            status_code: xml::extract_tag(error, "statusCode").unwrap_or_default(),
            message: xml::extract_tag(error, "message").unwrap_or_default(),
            fields: xml::extract_all_tags(error, "fields"),
        })
        .collect()
}

fn parse_execute_anonymous_result(response: &str) -> Result<ExecuteAnonymousResult> {
    if !response.contains("compiled") {
        return Err(Error::new(ErrorKind::InvalidResponse(
            "no executeAnonymous result in response".to_string(),
        )));
    }
    Ok(ExecuteAnonymousResult {
        compiled: xml::extract_bool(response, "compiled"),
        success: xml::extract_bool(response, "success"),
        compile_problem: xml::extract_tag(response, "compileProblem").filter(|s| !s.is_empty()),
        exception_message: xml::extract_tag(response, "exceptionMessage").filter(|s| !s.is_empty()),
        exception_stack_trace: xml::extract_tag(response, "exceptionStackTrace")
            .filter(|s| !s.is_empty()),
        line: xml::extract_tag(response, "line").and_then(|s| s.parse().ok()),
        column: xml::extract_tag(response, "column").and_then(|s| s.parse().ok()),
    })
}
