//! Polling mirror of a directory subtree.
//!
//! A [`reconcile::Reconciler`] diffs what [`storage`] reports against the
//! in-memory [`tree::TreeIndex`]. The [`engine`] drives those passes one at a
//! time and reports committed changes to a [`engine::ChangeNotifier`].

#![allow(clippy::enum_variant_names)]

pub mod application;
#[allow(clippy::module_inception)]
pub mod cli;
pub mod config;
pub mod engine;
mod ext;
pub mod reconcile;
pub mod storage;
pub mod tree;
