//! Site data extraction seam.
//!
//! External plugins (spreadsheet parsers, REST inventory clients) produce
//! a site-document-shaped mapping; [`DataExtractor`] is their contract.
//! The built-in YAML-file plugin loads an already-extracted document from
//! disk, which is also how previously generated data re-enters the
//! pipeline.

use crate::models::SiteDocumentData;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde_yaml::Value;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A data source that can produce one site's extracted data
pub trait DataExtractor {
    /// Name of the site this extractor describes
    fn site_name(&self) -> &str;

    /// Produce the site aggregate
    fn extract(&self) -> Result<SiteDocumentData>;
}

/// Loads extracted site data from a YAML file
#[derive(Debug)]
pub struct YamlFileExtractor {
    site_name: String,
    path: PathBuf,
}

impl YamlFileExtractor {
    pub fn new(site_name: &str, path: &Path) -> Self {
        YamlFileExtractor {
            site_name: site_name.to_string(),
            path: path.to_path_buf(),
        }
    }
}

impl DataExtractor for YamlFileExtractor {
    fn site_name(&self) -> &str {
        &self.site_name
    }

    fn extract(&self) -> Result<SiteDocumentData> {
        info!("Loading extracted site data from: {:?}", self.path);
        let file = File::open(&self.path)
            .wrap_err_with(|| format!("Failed to open site data file '{}'", self.path.display()))?;
        let value: Value = serde_yaml::from_reader(file)?;
        let data = SiteDocumentData::from_value(&value)?;
        Ok(data)
    }
}

/// Merge a site-specific configuration file into extracted data.
///
/// The override mapping takes precedence field by field; everything it
/// omits is left alone.
pub fn apply_additional_config(data: &mut SiteDocumentData, path: &Path) -> Result<()> {
    info!("Applying site configuration from: {:?}", path);
    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open site configuration '{}'", path.display()))?;
    let overrides: Value = serde_yaml::from_reader(file)?;
    data.merge_additional_data(&overrides);
    Ok(())
}
