use serde::Serialize;
use tracing::debug;

use crate::address::{AddressSnapshot, AddressStateStore};
use crate::catalog::{CatalogClient, RunLoader, should_refetch};
use crate::config::{FeatureFlags, ResolvedConfig};
use crate::context::DownloadContext;
use crate::domain::{AnnotationAggregates, AnnotationId, RunPage, TomogramId};
use crate::drawer::{DrawerCoordinator, DrawerKind, DrawerRecord};
use crate::error::PortalError;
use crate::probe::{ProbeTicket, SizeProbe, SizeProbeTracker};
use crate::projector::{AnnotationRow, project_rows};
use crate::resolver::resolve;
use crate::selection::{DownloadDialog, DownloadStep, Selection, SelectionWriter};

/// Everything a run page renders, derived from the address and the fetched page.
#[derive(Debug, Clone, Serialize)]
pub struct RunView {
    pub address: String,
    pub selection: Selection,
    pub dialog: DownloadDialog,
    pub download: DownloadContext,
    pub drawers: Vec<DrawerRecord>,
    pub rows: Vec<AnnotationRow>,
    pub annotation_aggregates: AnnotationAggregates,
    pub tomograms_count: usize,
}

/// One run page session: the address, the drawers bound to it, and the fetched data.
///
/// Mutating calls only touch the address; [`refresh`](Self::refresh) reconciles the rest.
pub struct App<C: CatalogClient, P: SizeProbe> {
    loader: RunLoader<C>,
    probe: P,
    features: FeatureFlags,
    route_id: String,
    store: AddressStateStore,
    drawers: DrawerCoordinator,
    sizes: SizeProbeTracker,
    page: Option<RunPage>,
    fetched_for: Option<AddressSnapshot>,
}

impl<C: CatalogClient, P: SizeProbe> App<C, P> {
    pub fn new(config: &ResolvedConfig, catalog: C, probe: P, route_id: &str, query: &str) -> Self {
        Self {
            loader: RunLoader::new(catalog, config.page_size),
            probe,
            features: config.features,
            route_id: route_id.to_string(),
            store: AddressStateStore::from_query(query),
            drawers: DrawerCoordinator::new(),
            sizes: SizeProbeTracker::new(),
            page: None,
            fetched_for: None,
        }
    }

    pub fn address(&self) -> &AddressSnapshot {
        self.store.current()
    }

    pub fn store(&self) -> &AddressStateStore {
        &self.store
    }

    /// Brings derived state up to date with the address.
    ///
    /// Runs the drawer deep-link bootstrap, refetches the run page when a data parameter
    /// changed, and returns a ticket when the resolved artifact needs a size probe.
    pub fn refresh(&mut self) -> Result<Option<ProbeTicket>, PortalError> {
        if let Some(kind) = self.drawers.observe(&mut self.store) {
            debug!(drawer = %kind, "drawer opened from address");
        }

        let stale = match &self.fetched_for {
            Some(prev) => should_refetch(prev, self.store.current()),
            None => true,
        };
        if stale {
            let address = self.store.snapshot();
            let page = self.loader.load(&self.route_id, &address)?;
            self.page = Some(page);
            self.fetched_for = Some(address);
        }

        let descriptor = match &self.page {
            Some(page) => resolve(&self.selection(), page),
            None => Default::default(),
        };
        Ok(self.sizes.request(descriptor.size_query.as_deref()))
    }

    /// Performs a size probe and records its result if it is still current.
    pub fn run_probe(&mut self, ticket: &ProbeTicket) -> bool {
        let result = self.probe.probe(ticket.query());
        self.sizes.complete(ticket, result)
    }

    pub fn complete_probe(&mut self, ticket: &ProbeTicket, result: Result<u64, PortalError>) -> bool {
        self.sizes.complete(ticket, result)
    }

    pub fn selection(&self) -> Selection {
        Selection::from_address(self.store.current(), self.features)
    }

    pub fn page(&self) -> Option<&RunPage> {
        self.page.as_ref()
    }

    pub fn view(&self) -> Result<RunView, PortalError> {
        let address = self.store.current();
        let selection = self.selection();
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| PortalError::MissingContext("run page not loaded".to_string()))?;
        let descriptor = resolve(&selection, page);
        let file_size = if self.sizes.query() == descriptor.size_query.as_deref() {
            self.sizes.size()
        } else {
            None
        };
        let download = DownloadContext::new(Some(page), &selection, descriptor, file_size)?;

        Ok(RunView {
            address: address.to_query(),
            dialog: DownloadDialog::from_address(address),
            drawers: DrawerCoordinator::records(address),
            rows: project_rows(&page.run.annotations),
            annotation_aggregates: page.annotation_aggregates,
            tomograms_count: page.tomograms_count(),
            download,
            selection,
        })
    }

    pub fn open_drawer(&mut self, kind: DrawerKind, tab: Option<&str>) -> bool {
        match tab {
            Some(tab) => DrawerCoordinator::open_with(&mut self.store, kind, tab),
            None => DrawerCoordinator::open(&mut self.store, kind),
        }
    }

    pub fn close_drawer(&mut self, kind: DrawerKind) -> bool {
        DrawerCoordinator::close(&mut self.store, kind)
    }

    pub fn set_drawer_tab(&mut self, kind: DrawerKind, tab: &str) -> bool {
        DrawerCoordinator::set_tab(&mut self.store, kind, tab)
    }

    pub fn open_download(&mut self) -> bool {
        DownloadDialog::show(&mut self.store)
    }

    pub fn set_download_step(&mut self, step: DownloadStep) -> bool {
        DownloadDialog::go_to_step(&mut self.store, step)
    }

    pub fn set_download_tab(&mut self, tab: &str) -> bool {
        DownloadDialog::set_tab(&mut self.store, tab)
    }

    pub fn close_download(&mut self) -> bool {
        DownloadDialog::close(&mut self.store)
    }

    pub fn select_tomogram(&mut self, sampling: &str, processing: &str, file_format: &str) -> bool {
        SelectionWriter::select_tomogram(&mut self.store, sampling, processing, file_format)
    }

    pub fn select_tomogram_by_id(&mut self, id: TomogramId, file_format: &str) -> bool {
        SelectionWriter::select_tomogram_by_id(&mut self.store, id, file_format)
    }

    pub fn select_all_annotations(&mut self) -> bool {
        SelectionWriter::select_all_annotations(&mut self.store)
    }

    pub fn select_annotation(&mut self, id: AnnotationId, shape_type: &str, file_format: &str) -> bool {
        SelectionWriter::select_annotation(&mut self.store, id, shape_type, file_format)
    }

    pub fn set_file_format(&mut self, file_format: &str) -> bool {
        SelectionWriter::set_file_format(&mut self.store, file_format)
    }

    /// Follows a link within the run page, replacing the whole query.
    pub fn navigate(&mut self, query: &str) -> bool {
        self.store.navigate(query)
    }

    pub fn back(&mut self) -> bool {
        self.store.back()
    }

    pub fn forward(&mut self) -> bool {
        self.store.forward()
    }
}
