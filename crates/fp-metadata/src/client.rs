//! Metadata API orchestration.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use forcepack_client::{xml, SessionGateway, SoapApi, Transport};
use forcepack_manifest::Manifest;
use tracing::{info, instrument};

use crate::deploy::{ComponentFailure, DeployOptions, DeployResult, DeployStatus, TestLevel};
use crate::error::{Error, ErrorKind, Result};
use crate::list::{ListQuery, LIST_QUERY_BATCH};
use crate::poll::{self, CancelToken, PollConfig, Probe};
use crate::retrieve::{FileProperties, RetrieveMessage, RetrieveResult, RetrieveStatus};

const METADATA_XMLNS: &str = "http://soap.sforce.com/2006/04/metadata";

/// The two top-level long-running operations — retrieve and deploy — plus
/// the listing and promotion calls around them.
///
/// Each orchestrated operation submits through the shared
/// [`SessionGateway`], then drives the job with [`poll::poll`] until its
/// terminal status. Callers get the terminal payload or a typed error;
/// there are no partial results.
#[derive(Debug, Clone)]
pub struct MetadataApi<T> {
    gateway: Arc<SessionGateway<T>>,
    poll_config: PollConfig,
}

impl<T: Transport> MetadataApi<T> {
    pub fn new(gateway: Arc<SessionGateway<T>>) -> Self {
        Self {
            gateway,
            poll_config: PollConfig::default(),
        }
    }

    /// Replace the polling configuration.
    pub fn with_poll_config(mut self, poll_config: PollConfig) -> Self {
        self.poll_config = poll_config;
        self
    }

    // ========================================================================
    // Retrieve
    // ========================================================================

    /// Retrieve the metadata a manifest describes, polled to completion.
    ///
    /// The returned [`RetrieveResult::zip_file`] is left base64-encoded;
    /// hand it to [`crate::archive::unzip`].
    #[instrument(skip(self, manifest))]
    pub async fn retrieve(&self, manifest: &Manifest) -> Result<RetrieveResult> {
        self.retrieve_inner(manifest, None).await
    }

    /// Like [`Self::retrieve`], honoring a cancel token at each poll tick.
    pub async fn retrieve_with_cancel(
        &self,
        manifest: &Manifest,
        cancel: CancelToken,
    ) -> Result<RetrieveResult> {
        self.retrieve_inner(manifest, Some(cancel)).await
    }

    async fn retrieve_inner(
        &self,
        manifest: &Manifest,
        cancel: Option<CancelToken>,
    ) -> Result<RetrieveResult> {
        let id = self.start_retrieve(manifest).await?;
        info!(job_id = %id, "retrieve job submitted");
        poll::poll(&self.poll_config, cancel, || self.probe_retrieve(&id)).await
    }

    /// Submit a retrieve job and return its id without polling.
    pub async fn start_retrieve(&self, manifest: &Manifest) -> Result<String> {
        let body = format!(
            r#"<retrieve xmlns="{METADATA_XMLNS}"><retrieveRequest><apiVersion>{version}</apiVersion><unpackaged>{types}</unpackaged></retrieveRequest></retrieve>"#,
            version = xml::escape(manifest.api_version()),
            types = manifest.types_xml(),
        );
        let response = self
            .gateway
            .invoke(SoapApi::Metadata, "retrieve", &body)
            .await?;
        extract_job_id(&response, "retrieve")
    }

    /// One `checkRetrieveStatus` call.
    pub async fn check_retrieve_status(
        &self,
        job_id: &str,
        include_zip: bool,
    ) -> Result<RetrieveResult> {
        let body = format!(
            r#"<checkRetrieveStatus xmlns="{METADATA_XMLNS}"><asyncProcessId>{id}</asyncProcessId><includeZip>{include_zip}</includeZip></checkRetrieveStatus>"#,
            id = xml::escape(job_id),
        );
        let response = self
            .gateway
            .invoke(SoapApi::Metadata, "checkRetrieveStatus", &body)
            .await?;
        parse_retrieve_result(&response)
    }

    async fn probe_retrieve(&self, job_id: &str) -> Result<Probe<RetrieveResult>> {
        let result = self.check_retrieve_status(job_id, true).await?;
        if result.status == RetrieveStatus::Succeeded {
            return Ok(Probe::Done(result));
        }
        if result.status.is_in_progress() {
            return Ok(Probe::InProgress(result.status.to_string()));
        }
        Err(Error::new(ErrorKind::UnexpectedStatus {
            status: result.status.to_string(),
            detail: result.error_message.or(result.error_status_code),
        }))
    }

    // ========================================================================
    // Deploy
    // ========================================================================

    /// Deploy a zipped package, polled to completion.
    ///
    /// On success the returned result carries the job id, which can be
    /// chained into [`Self::deploy_recent_validation`] for check-only
    /// deployments.
    #[instrument(skip(self, package_zip, options), fields(bytes = package_zip.len()))]
    pub async fn deploy(
        &self,
        package_zip: &[u8],
        options: &DeployOptions,
    ) -> Result<DeployResult> {
        self.deploy_inner(package_zip, options, None).await
    }

    /// Like [`Self::deploy`], honoring a cancel token at each poll tick.
    pub async fn deploy_with_cancel(
        &self,
        package_zip: &[u8],
        options: &DeployOptions,
        cancel: CancelToken,
    ) -> Result<DeployResult> {
        self.deploy_inner(package_zip, options, Some(cancel)).await
    }

    async fn deploy_inner(
        &self,
        package_zip: &[u8],
        options: &DeployOptions,
        cancel: Option<CancelToken>,
    ) -> Result<DeployResult> {
        let id = self.start_deploy(package_zip, options).await?;
        info!(job_id = %id, "deploy job submitted");
        poll::poll(&self.poll_config, cancel, || self.probe_deploy(&id)).await
    }

    /// Submit a deploy job and return its id without polling.
    pub async fn start_deploy(
        &self,
        package_zip: &[u8],
        options: &DeployOptions,
    ) -> Result<String> {
        let body = build_deploy_body(package_zip, options);
        let response = self
            .gateway
            .invoke(SoapApi::Metadata, "deploy", &body)
            .await?;
        extract_job_id(&response, "deploy")
    }

    /// One `checkDeployStatus` call.
    pub async fn check_deploy_status(
        &self,
        job_id: &str,
        include_details: bool,
    ) -> Result<DeployResult> {
        let body = format!(
            r#"<checkDeployStatus xmlns="{METADATA_XMLNS}"><asyncProcessId>{id}</asyncProcessId><includeDetails>{include_details}</includeDetails></checkDeployStatus>"#,
            id = xml::escape(job_id),
        );
        let response = self
            .gateway
            .invoke(SoapApi::Metadata, "checkDeployStatus", &body)
            .await?;
        parse_deploy_result(&response)
    }

    async fn probe_deploy(&self, job_id: &str) -> Result<Probe<DeployResult>> {
        let result = self.check_deploy_status(job_id, true).await?;
        if result.status == DeployStatus::Succeeded {
            return Ok(Probe::Done(result));
        }
        if result.status.is_in_progress() {
            return Ok(Probe::InProgress(result.status.to_string()));
        }
        Err(Error::new(ErrorKind::UnexpectedStatus {
            status: result.status.to_string(),
            detail: result.detail_message(),
        }))
    }

    /// Promote a validated check-only deploy without re-running tests.
    ///
    /// Returns the id of the quick-deploy job.
    #[instrument(skip(self))]
    pub async fn deploy_recent_validation(&self, validation_id: &str) -> Result<String> {
        let body = format!(
            r#"<deployRecentValidation xmlns="{METADATA_XMLNS}"><validationId>{id}</validationId></deployRecentValidation>"#,
            id = xml::escape(validation_id),
        );
        let response = self
            .gateway
            .invoke(SoapApi::Metadata, "deployRecentValidation", &body)
            .await?;
        xml::extract_tag(&response, "result").ok_or_else(|| {
            Error::new(ErrorKind::InvalidResponse(
                "No job id in deployRecentValidation response".to_string(),
            ))
        })
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// List metadata members, batching queries in groups of
    /// [`LIST_QUERY_BATCH`].
    ///
    /// The returned map is keyed by canonical type name and merges
    /// directly into a [`Manifest`] via [`Manifest::add_map`].
    #[instrument(skip(self, queries), fields(count = queries.len()))]
    pub async fn list_metadata(
        &self,
        queries: &[ListQuery],
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let mut combined: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for chunk in queries.chunks(LIST_QUERY_BATCH) {
            let queries_xml: String = chunk
                .iter()
                .map(|query| {
                    let folder = query
                        .folder
                        .as_deref()
                        .map(|f| format!("<folder>{}</folder>", xml::escape(f)))
                        .unwrap_or_default();
                    format!(
                        "<queries><type>{}</type>{folder}</queries>",
                        xml::escape(&query.metadata_type)
                    )
                })
                .collect();
            let body = format!(
                r#"<listMetadata xmlns="{METADATA_XMLNS}">{queries_xml}<asOfVersion>{version}</asOfVersion></listMetadata>"#,
                version = self.gateway.api_version(),
            );
            let response = self
                .gateway
                .invoke(SoapApi::Metadata, "listMetadata", &body)
                .await?;

            for block in xml::extract_blocks(&response, "result") {
                let Some(full_name) = xml::extract_tag(block, "fullName") else {
                    continue;
                };
                let Some(type_name) = xml::extract_tag(block, "type") else {
                    continue;
                };
                combined.entry(type_name).or_default().push(full_name);
            }
        }

        for members in combined.values_mut() {
            members.sort();
            members.dedup();
        }
        Ok(combined)
    }
}

// ============================================================================
// Request/response plumbing
// ============================================================================

fn build_deploy_body(package_zip: &[u8], options: &DeployOptions) -> String {
    let encoded_zip = general_purpose::STANDARD.encode(package_zip);

    let test_level_xml = options
        .test_level
        .map(|tl| format!("<testLevel>{tl}</testLevel>"))
        .unwrap_or_default();

    let run_tests_xml = if options.test_level == Some(TestLevel::RunSpecifiedTests) {
        options
            .run_tests
            .iter()
            .map(|t| format!("<runTests>{}</runTests>", xml::escape(t)))
            .collect::<String>()
    } else {
        String::new()
    };

    format!(
        r#"<deploy xmlns="{METADATA_XMLNS}"><ZipFile>{zip}</ZipFile><DeployOptions><allowMissingFiles>{allow_missing}</allowMissingFiles><autoUpdatePackage>{auto_update}</autoUpdatePackage><checkOnly>{check_only}</checkOnly><ignoreWarnings>{ignore_warnings}</ignoreWarnings><purgeOnDelete>{purge_on_delete}</purgeOnDelete><rollbackOnError>{rollback_on_error}</rollbackOnError><singlePackage>{single_package}</singlePackage>{test_level}{run_tests}</DeployOptions></deploy>"#,
        zip = encoded_zip,
        allow_missing = options.allow_missing_files,
        auto_update = options.auto_update_package,
        check_only = options.check_only,
        ignore_warnings = options.ignore_warnings,
        purge_on_delete = options.purge_on_delete,
        rollback_on_error = options.rollback_on_error,
        single_package = options.single_package,
        test_level = test_level_xml,
        run_tests = run_tests_xml,
    )
}

fn extract_job_id(response: &str, operation: &str) -> Result<String> {
    xml::extract_tag(response, "id").ok_or_else(|| {
        Error::new(ErrorKind::InvalidResponse(format!(
            "No job id in {operation} response"
        )))
    })
}

/// Remove every `<tag>...</tag>` span so sibling scalars can be extracted
/// without matching identically named elements nested in the blocks.
fn strip_elements(xml_text: &str, tag: &str) -> String {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut out = String::with_capacity(xml_text.len());
    let mut rest = xml_text;
    while let Some(start) = rest.find(&open) {
        let Some(end) = rest[start..].find(&close) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &rest[start + end + close.len()..];
    }
    out.push_str(rest);
    out
}

fn parse_status<S: std::str::FromStr>(
    raw: Option<String>,
    detail: Option<String>,
) -> Result<S> {
    let raw = raw.ok_or_else(|| {
        Error::new(ErrorKind::InvalidResponse(
            "No status in job result".to_string(),
        ))
    })?;
    raw.parse().map_err(|_| {
        Error::new(ErrorKind::UnexpectedStatus {
            status: raw,
            detail,
        })
    })
}

fn parse_retrieve_result(response: &str) -> Result<RetrieveResult> {
    // fileProperties and messages blocks carry their own id/fileName
    // elements; scalars must be read with those blocks removed.
    let scalars = strip_elements(&strip_elements(response, "fileProperties"), "messages");

    let id = extract_job_id(&scalars, "checkRetrieveStatus")?;
    let error_message = xml::extract_tag(&scalars, "errorMessage");
    let error_status_code = xml::extract_tag(&scalars, "errorStatusCode");
    let status = parse_status(
        xml::extract_tag(&scalars, "status"),
        error_message.clone(),
    )?;

    Ok(RetrieveResult {
        id,
        done: xml::extract_bool(&scalars, "done"),
        status,
        success: xml::extract_bool(&scalars, "success"),
        error_message,
        error_status_code,
        zip_file: xml::extract_tag(&scalars, "zipFile").filter(|z| !z.is_empty()),
        file_properties: parse_file_properties(response),
        messages: parse_retrieve_messages(response),
    })
}

fn parse_file_properties(response: &str) -> Vec<FileProperties> {
    xml::extract_blocks(response, "fileProperties")
        .into_iter()
        .filter_map(|block| {
            let file_name = xml::extract_tag(block, "fileName")?;
            let full_name = xml::extract_tag(block, "fullName")?;
            let id = xml::extract_tag(block, "id")?;
            Some(FileProperties {
                file_name,
                full_name,
                id,
                component_type: xml::extract_tag(block, "type").unwrap_or_default(),
                created_by_name: xml::extract_tag(block, "createdByName").unwrap_or_default(),
                created_date: xml::extract_tag(block, "createdDate").unwrap_or_default(),
                last_modified_by_name: xml::extract_tag(block, "lastModifiedByName")
                    .unwrap_or_default(),
                last_modified_date: xml::extract_tag(block, "lastModifiedDate")
                    .unwrap_or_default(),
                manageable_state: xml::extract_tag(block, "manageableState"),
                namespace_prefix: xml::extract_tag(block, "namespacePrefix"),
            })
        })
        .collect()
}

fn parse_retrieve_messages(response: &str) -> Vec<RetrieveMessage> {
    xml::extract_blocks(response, "messages")
        .into_iter()
        .filter_map(|block| {
            Some(RetrieveMessage {
                file_name: xml::extract_tag(block, "fileName")?,
                problem: xml::extract_tag(block, "problem")?,
            })
        })
        .collect()
}

fn parse_deploy_result(response: &str) -> Result<DeployResult> {
    // The details block repeats fileName/fullName/success per component;
    // scalars must be read with it removed.
    let scalars = strip_elements(response, "details");

    let id = extract_job_id(&scalars, "checkDeployStatus")?;
    let error_message = xml::extract_tag(&scalars, "errorMessage");
    let state_detail = xml::extract_tag(&scalars, "stateDetail");
    let status = parse_status(
        xml::extract_tag(&scalars, "status"),
        error_message.clone().or_else(|| state_detail.clone()),
    )?;

    Ok(DeployResult {
        id,
        done: xml::extract_bool(&scalars, "done"),
        status,
        success: xml::extract_bool(&scalars, "success"),
        error_message,
        state_detail,
        number_components_deployed: xml::extract_u32(&scalars, "numberComponentsDeployed"),
        number_components_errors: xml::extract_u32(&scalars, "numberComponentErrors"),
        number_components_total: xml::extract_u32(&scalars, "numberComponentsTotal"),
        number_tests_completed: xml::extract_u32(&scalars, "numberTestsCompleted"),
        number_tests_errors: xml::extract_u32(&scalars, "numberTestErrors"),
        number_tests_total: xml::extract_u32(&scalars, "numberTestsTotal"),
        component_failures: parse_component_failures(response),
    })
}

fn parse_component_failures(response: &str) -> Vec<ComponentFailure> {
    xml::extract_blocks(response, "componentFailures")
        .into_iter()
        .map(|block| ComponentFailure {
            component_type: xml::extract_tag(block, "componentType"),
            file_name: xml::extract_tag(block, "fileName"),
            full_name: xml::extract_tag(block, "fullName"),
            line_number: xml::extract_tag(block, "lineNumber").and_then(|s| s.parse().ok()),
            column_number: xml::extract_tag(block, "columnNumber").and_then(|s| s.parse().ok()),
            problem: xml::extract_tag(block, "problem")
                .unwrap_or_else(|| "Unknown problem".to_string()),
            problem_type: xml::extract_tag(block, "problemType")
                .unwrap_or_else(|| "Error".to_string()),
        })
        .collect()
}
