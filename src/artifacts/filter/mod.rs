//! Log filters
//!
//! A [`FilterCollection`] holds at most one filter per axis. A missing filter
//! never constrains its axis.
//!
//! Axes fall into two groups:
//!
//! - Graph axes, answered from refs and roots alone: `branch`, `root`, `hash`
//! - Details axes, which need commit metadata: `user`, `date`, `text`,
//!   `structure`. These implement [`DetailsFilter`] and compose by conjunction.
//!
//! `structure` is also consulted on the graph side to decide which roots are
//! visible at all.

pub mod branch;
pub mod details;
pub mod hash;
pub mod structure;

use crate::artifacts::filter::branch::BranchFilter;
use crate::artifacts::filter::details::{DateFilter, TextFilter, UserFilter};
use crate::artifacts::filter::hash::HashFilter;
use crate::artifacts::filter::structure::{RootFilter, StructureFilter};
use crate::artifacts::vislog::metadata::CommitMetadata;
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FilterKind: u8 {
        const USER = 0b0001;
        const DATE = 0b0010;
        const TEXT = 0b0100;
        const STRUCTURE = 0b1000;
    }
}

pub trait DetailsFilter: std::fmt::Debug + Send + Sync {
    fn kind(&self) -> FilterKind;

    fn matches(&self, metadata: &CommitMetadata) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct FilterCollection {
    branch: Option<BranchFilter>,
    root: Option<RootFilter>,
    structure: Option<StructureFilter>,
    hash: Option<HashFilter>,
    user: Option<UserFilter>,
    date: Option<DateFilter>,
    text: Option<TextFilter>,
}

impl FilterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(mut self, filter: BranchFilter) -> Self {
        self.branch = Some(filter);
        self
    }

    pub fn with_root(mut self, filter: RootFilter) -> Self {
        self.root = Some(filter);
        self
    }

    pub fn with_structure(mut self, filter: StructureFilter) -> Self {
        self.structure = Some(filter);
        self
    }

    pub fn with_hash(mut self, filter: HashFilter) -> Self {
        self.hash = Some(filter);
        self
    }

    pub fn with_user(mut self, filter: UserFilter) -> Self {
        self.user = Some(filter);
        self
    }

    pub fn with_date(mut self, filter: DateFilter) -> Self {
        self.date = Some(filter);
        self
    }

    pub fn with_text(mut self, filter: TextFilter) -> Self {
        self.text = Some(filter);
        self
    }

    pub fn branch(&self) -> Option<&BranchFilter> {
        self.branch.as_ref()
    }

    pub fn root(&self) -> Option<&RootFilter> {
        self.root.as_ref()
    }

    pub fn structure(&self) -> Option<&StructureFilter> {
        self.structure.as_ref()
    }

    pub fn hash(&self) -> Option<&HashFilter> {
        self.hash.as_ref()
    }

    pub fn user(&self) -> Option<&UserFilter> {
        self.user.as_ref()
    }

    pub fn date(&self) -> Option<&DateFilter> {
        self.date.as_ref()
    }

    pub fn text(&self) -> Option<&TextFilter> {
        self.text.as_ref()
    }

    /// Hash filter with at least one entry, which overrides every other axis
    pub fn active_hash(&self) -> Option<&HashFilter> {
        self.hash.as_ref().filter(|hash| !hash.is_empty())
    }

    /// Only the hash filter, as reported back when it short-circuited a build
    pub fn hash_only(&self) -> Self {
        FilterCollection {
            hash: self.hash.clone(),
            ..Self::default()
        }
    }

    pub fn details_filters(&self) -> Vec<&dyn DetailsFilter> {
        let mut filters: Vec<&dyn DetailsFilter> = Vec::new();
        if let Some(user) = &self.user {
            filters.push(user);
        }
        if let Some(date) = &self.date {
            filters.push(date);
        }
        if let Some(text) = &self.text {
            filters.push(text);
        }
        if let Some(structure) = &self.structure {
            filters.push(structure);
        }
        filters
    }

    pub fn details_kinds(&self) -> FilterKind {
        self.details_filters()
            .iter()
            .fold(FilterKind::empty(), |kinds, filter| kinds | filter.kind())
    }

    pub fn has_details_filters(&self) -> bool {
        !self.details_kinds().is_empty()
    }

    pub fn matches_details(&self, metadata: &CommitMetadata) -> bool {
        self.details_filters()
            .iter()
            .all(|filter| filter.matches(metadata))
    }

    pub fn is_empty(&self) -> bool {
        self.branch.is_none()
            && self.root.is_none()
            && self.active_hash().is_none()
            && !self.has_details_filters()
    }
}
