use std::fs;
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::address::AddressSnapshot;
use crate::domain::{
    Annotation, AnnotationAggregates, Dataset, Deposition, Run, RunId, RunPage, VoxelSpacingGroup,
};
use crate::error::PortalError;
use crate::query::{FILTER_PARAMS, QueryParam, REFETCH_PARAMS};

/// Everything needed to fetch one page of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunQuery {
    pub run_id: RunId,
    /// 1-based.
    pub annotations_page: usize,
    pub page_size: usize,
    pub deposition_id: Option<u64>,
    pub filters: Vec<(QueryParam, String)>,
}

impl RunQuery {
    pub fn from_address(run_id: RunId, address: &AddressSnapshot, page_size: usize) -> Self {
        let annotations_page = address
            .get(QueryParam::AnnotationsPage)
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1);
        let deposition_id = address
            .get(QueryParam::DepositionId)
            .and_then(|value| value.trim().parse::<u64>().ok());
        let filters = FILTER_PARAMS
            .iter()
            .filter_map(|param| {
                address
                    .get_non_empty(param)
                    .map(|value| (*param, value.to_string()))
            })
            .collect();
        Self {
            run_id,
            annotations_page,
            page_size,
            deposition_id,
            filters,
        }
    }

    pub fn offset(&self) -> usize {
        self.annotations_page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
    }

    pub fn filter(&self, param: QueryParam) -> Option<&str> {
        self.filters
            .iter()
            .find(|(key, _)| *key == param)
            .map(|(_, value)| value.as_str())
    }
}

/// Remote data layer. `Ok(None)` means the run does not exist.
pub trait CatalogClient: Send + Sync {
    fn fetch_run(&self, query: &RunQuery) -> Result<Option<RunPage>, PortalError>;
}

impl<T: CatalogClient + ?Sized> CatalogClient for Box<T> {
    fn fetch_run(&self, query: &RunQuery) -> Result<Option<RunPage>, PortalError> {
        (**self).fetch_run(query)
    }
}

/// True when moving from `prev` to `next` changes the data a run page shows.
pub fn should_refetch(prev: &AddressSnapshot, next: &AddressSnapshot) -> bool {
    REFETCH_PARAMS
        .iter()
        .any(|param| prev.get(param) != next.get(param))
}

/// Turns a route id plus address into a run page, or a bad-request / not-found error.
pub struct RunLoader<C: CatalogClient> {
    catalog: C,
    page_size: usize,
}

impl<C: CatalogClient> RunLoader<C> {
    pub fn new(catalog: C, page_size: usize) -> Self {
        Self { catalog, page_size }
    }

    pub fn load(&self, route_id: &str, address: &AddressSnapshot) -> Result<RunPage, PortalError> {
        let run_id: RunId = route_id.parse()?;
        let query = RunQuery::from_address(run_id, address, self.page_size);
        debug!(run = %run_id, page = query.annotations_page, "loading run page");
        self.catalog
            .fetch_run(&query)?
            .ok_or(PortalError::RunNotFound(run_id.get()))
    }
}

/// Catalog backed by run pages held in memory, typically read from a JSON export.
///
/// Filtering and pagination are applied locally so pages behave like the remote API.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCatalog {
    pages: Vec<RunPage>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Many(Vec<RunPage>),
    One(Box<RunPage>),
}

impl SnapshotCatalog {
    pub fn new(pages: Vec<RunPage>) -> Self {
        Self { pages }
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, PortalError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| PortalError::SnapshotRead(path.as_std_path().to_path_buf()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, PortalError> {
        let file: SnapshotFile = serde_json::from_str(content)
            .map_err(|err| PortalError::SnapshotParse(err.to_string()))?;
        let pages = match file {
            SnapshotFile::Many(pages) => pages,
            SnapshotFile::One(page) => vec![*page],
        };
        Ok(Self { pages })
    }
}

impl CatalogClient for SnapshotCatalog {
    fn fetch_run(&self, query: &RunQuery) -> Result<Option<RunPage>, PortalError> {
        let Some(source) = self.pages.iter().find(|page| page.run.id == query.run_id) else {
            return Ok(None);
        };
        let mut page = source.clone();
        let total_count = page.run.annotations.len() as u64;
        let filtered: Vec<Annotation> = page
            .run
            .annotations
            .into_iter()
            .filter(|annotation| matches_filters(annotation, query))
            .collect();
        let filtered_count = filtered.len() as u64;
        page.run.annotations = filtered
            .into_iter()
            .skip(query.offset())
            .take(query.page_size)
            .collect();
        page.annotation_aggregates = AnnotationAggregates {
            total_count,
            filtered_count,
        };
        page.deposition = page
            .deposition
            .filter(|deposition| Some(deposition.id) == query.deposition_id);
        Ok(Some(page))
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_filters(annotation: &Annotation, query: &RunQuery) -> bool {
    query.filters.iter().all(|(param, value)| match param {
        QueryParam::ObjectName => contains_ignore_case(&annotation.object_name, value),
        QueryParam::ObjectShapeType => annotation
            .files
            .iter()
            .any(|file| file.shape_type == *value),
        QueryParam::MethodType => annotation.method_type.as_deref() == Some(value.as_str()),
        QueryParam::AuthorName => annotation
            .authors
            .iter()
            .any(|author| contains_ignore_case(&author.name, value)),
        QueryParam::AuthorOrcid => annotation
            .authors
            .iter()
            .any(|author| author.orcid.as_deref() == Some(value.as_str())),
        QueryParam::ObjectId => annotation
            .object_id
            .as_deref()
            .is_some_and(|object_id| contains_ignore_case(object_id, value)),
        QueryParam::AnnotationSoftware => annotation
            .annotation_software
            .as_deref()
            .is_some_and(|software| contains_ignore_case(software, value)),
        _ => true,
    })
}

const RUN_QUERY: &str = r#"
query GetRunById($id: Int, $limit: Int, $offset: Int, $filter: annotations_bool_exp, $depositionId: Int) {
  runs(where: { id: { _eq: $id } }) {
    id
    name
    dataset { id title }
    tomogram_voxel_spacings {
      id
      voxel_spacing
      s3_prefix
      tomograms {
        id
        processing
        voxel_spacing
        s3_mrc_scale0
        https_mrc_scale0
        s3_omezarr_dir
        https_omezarr_dir
      }
      annotations(limit: $limit, offset: $offset, where: $filter, order_by: { id: asc }) {
        id
        object_name
        object_id
        annotation_software
        object_count
        ground_truth_status
        method_type
        confidence_precision
        confidence_recall
        authors(order_by: { author_list_order: asc }) { name orcid primary_author_status }
        files { format shape_type s3_path https_path }
      }
    }
  }
  total: annotations_aggregate(where: { tomogram_voxel_spacing: { run_id: { _eq: $id } } }) {
    aggregate { count }
  }
  filtered: annotations_aggregate(where: $filter) {
    aggregate { count }
  }
  deposition: depositions_by_pk(id: $depositionId) { id title }
}
"#;

#[derive(Deserialize)]
struct GqlResponse {
    #[serde(default)]
    data: Option<GqlData>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Deserialize)]
struct GqlError {
    message: String,
}

#[derive(Deserialize)]
struct GqlData {
    runs: Vec<GqlRun>,
    total: GqlAggregate,
    filtered: GqlAggregate,
    #[serde(default)]
    deposition: Option<Deposition>,
}

#[derive(Deserialize)]
struct GqlAggregate {
    aggregate: GqlCount,
}

#[derive(Deserialize)]
struct GqlCount {
    count: u64,
}

#[derive(Deserialize)]
struct GqlRun {
    id: RunId,
    name: String,
    dataset: Dataset,
    #[serde(default)]
    tomogram_voxel_spacings: Vec<GqlVoxelSpacing>,
}

#[derive(Deserialize)]
struct GqlVoxelSpacing {
    #[serde(flatten)]
    group: VoxelSpacingGroup,
    #[serde(default)]
    annotations: Vec<Annotation>,
}

impl GqlData {
    fn into_page(self) -> Option<RunPage> {
        let run = self.runs.into_iter().next()?;
        let mut annotations = Vec::new();
        let mut groups = Vec::new();
        for spacing in run.tomogram_voxel_spacings {
            annotations.extend(spacing.annotations);
            groups.push(spacing.group);
        }
        Some(RunPage {
            run: Run {
                id: run.id,
                name: run.name,
                dataset: run.dataset,
                tomogram_voxel_spacings: groups,
                annotations,
            },
            annotation_aggregates: AnnotationAggregates {
                total_count: self.total.aggregate.count,
                filtered_count: self.filtered.aggregate.count,
            },
            deposition: self.deposition,
        })
    }
}

/// Annotation filter expression sent to the GraphQL API.
pub fn annotation_filter(query: &RunQuery) -> Value {
    let mut clauses = vec![json!({
        "tomogram_voxel_spacing": { "run_id": { "_eq": query.run_id.get() } }
    })];
    for (param, value) in &query.filters {
        let clause = match param {
            QueryParam::ObjectName => json!({ "object_name": { "_ilike": format!("%{value}%") } }),
            QueryParam::ObjectId => json!({ "object_id": { "_ilike": format!("%{value}%") } }),
            QueryParam::ObjectShapeType => json!({ "files": { "shape_type": { "_eq": value } } }),
            QueryParam::MethodType => json!({ "method_type": { "_eq": value } }),
            QueryParam::AnnotationSoftware => {
                json!({ "annotation_software": { "_ilike": format!("%{value}%") } })
            }
            QueryParam::AuthorName => {
                json!({ "authors": { "name": { "_ilike": format!("%{value}%") } } })
            }
            QueryParam::AuthorOrcid => {
                json!({ "authors": { "orcid": { "_ilike": format!("%{value}%") } } })
            }
            _ => continue,
        };
        clauses.push(clause);
    }
    if let Some(deposition_id) = query.deposition_id {
        clauses.push(json!({ "deposition_id": { "_eq": deposition_id } }));
    }
    json!({ "_and": clauses })
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    endpoint: String,
}

impl CatalogHttpClient {
    pub fn new(endpoint: &str) -> Result<Self, PortalError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("portal-dl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PortalError::CatalogHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| PortalError::CatalogHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, PortalError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "catalog request failed".to_string());
        Err(PortalError::CatalogStatus { status, message })
    }

    fn send_with_retries(&self, body: &Value) -> Result<reqwest::blocking::Response, PortalError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match self.client.post(&self.endpoint).json(body).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && (err.is_timeout() || err.is_connect()) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(PortalError::CatalogHttp(err.to_string()));
                }
            }
        }
    }
}

impl CatalogClient for CatalogHttpClient {
    fn fetch_run(&self, query: &RunQuery) -> Result<Option<RunPage>, PortalError> {
        let body = json!({
            "query": RUN_QUERY,
            "variables": {
                "id": query.run_id.get(),
                "limit": query.page_size,
                "offset": query.offset(),
                "filter": annotation_filter(query),
                "depositionId": query.deposition_id.unwrap_or(0),
            },
        });
        let response = Self::handle_status(self.send_with_retries(&body)?)?;
        let payload: GqlResponse = response
            .json()
            .map_err(|err| PortalError::CatalogHttp(err.to_string()))?;
        if let Some(error) = payload.errors.into_iter().next() {
            return Err(PortalError::CatalogQuery(error.message));
        }
        let data = payload
            .data
            .ok_or_else(|| PortalError::CatalogQuery("response carried no data".to_string()))?;
        Ok(data.into_page())
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}
