use crate::artifacts::filter::FilterCollection;
use crate::artifacts::graph::visible_graph::VisibleGraph;
use crate::artifacts::vislog::data_pack::DataPack;
use derive_new::new;
use std::sync::Arc;

/// What the log shows for one set of filters
#[derive(Debug, new)]
pub struct VisiblePack {
    data_pack: Arc<DataPack>,
    visible_graph: VisibleGraph,
    /// A wider stage could reveal more matches
    can_request_more: bool,
    filters: FilterCollection,
}

impl VisiblePack {
    pub fn data_pack(&self) -> &Arc<DataPack> {
        &self.data_pack
    }

    pub fn visible_graph(&self) -> &VisibleGraph {
        &self.visible_graph
    }

    pub fn can_request_more(&self) -> bool {
        self.can_request_more
    }

    pub fn filters(&self) -> &FilterCollection {
        &self.filters
    }
}
