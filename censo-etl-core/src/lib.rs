#![doc = "censo-etl-core: core pipeline for censo-etl."]

//! Resolves, downloads, extracts and uploads one year of the INEP Censo
//! Escolar microdata. Storage credentials and process setup live in the
//! `censo-etl` binary crate; everything here takes its collaborators as
//! arguments.
//!
//! # Usage
//! Build a [`config::PipelineConfig`], pick a [`contract::Fetcher`], an
//! [`extract::Extractor`] and an [`upload::Uploader`], then call
//! [`synchronise::synchronise`].

pub mod archive;
pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod extract;
pub mod source;
pub mod synchronise;
pub mod upload;
