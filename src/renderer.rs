//! Manifest rendering.
//!
//! Walks a directory tree of manifest templates and renders every file
//! against the intermediary document, mirroring the tree under
//! `<manifest_dir>/site/<region_name>`. Rendering is all-or-nothing: a
//! failure on any template removes everything the run wrote before the
//! error is returned.
//!
//! The template engine itself stays behind the [`TemplateEngine`] trait;
//! the bundled implementation renders the Jinja dialect the manifest
//! templates are written in.

use log::{info, warn};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while rendering manifests
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template '{name}' failed to render: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("I/O failure at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("intermediary document has no region_name")]
    MissingRegionName,
}

impl RenderError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Black-box rendering service: template text in, rendered text out
pub trait TemplateEngine {
    fn render(&self, name: &str, template: &str, context: &Value) -> Result<String, RenderError>;
}

/// Jinja-dialect template engine
#[derive(Debug, Default)]
pub struct JinjaEngine;

impl TemplateEngine for JinjaEngine {
    fn render(&self, name: &str, template: &str, context: &Value) -> Result<String, RenderError> {
        let template_error = |source| RenderError::Template {
            name: name.to_string(),
            source,
        };
        let mut env = minijinja::Environment::new();
        env.add_template(name, template).map_err(template_error)?;
        let tmpl = env.get_template(name).map_err(template_error)?;
        tmpl.render(context).map_err(template_error)
    }
}

/// Renders one site's manifests from a template tree
#[derive(Debug)]
pub struct SiteProcessor<E> {
    document: Value,
    manifest_dir: PathBuf,
    engine: E,
}

impl<E: TemplateEngine> SiteProcessor<E> {
    pub fn new(document: Value, manifest_dir: &Path, engine: E) -> Self {
        SiteProcessor {
            document,
            manifest_dir: manifest_dir.to_path_buf(),
            engine,
        }
    }

    /// Render every template under `template_dir`.
    ///
    /// Returns the site output root on success. On any failure, partial
    /// output under that root is deleted before the error propagates.
    pub fn render_templates(&self, template_dir: &Path) -> Result<PathBuf, RenderError> {
        let region_name = self
            .document
            .get("region_name")
            .and_then(Value::as_str)
            .ok_or(RenderError::MissingRegionName)?;
        let site_root = self.manifest_dir.join("site").join(region_name);
        info!("Site manifest output dir: {}", site_root.display());

        let context = self.context();
        match self.render_tree(template_dir, template_dir, &site_root, &context) {
            Ok(rendered) => {
                info!(
                    "Rendered {} manifest(s) under {}",
                    rendered,
                    site_root.display()
                );
                Ok(site_root)
            }
            Err(err) => {
                warn!(
                    "Rendering failed, removing partial output under {}",
                    site_root.display()
                );
                if site_root.exists() {
                    if let Err(cleanup) = fs::remove_dir_all(&site_root) {
                        warn!(
                            "Could not remove partial output {}: {}",
                            site_root.display(),
                            cleanup
                        );
                    }
                }
                Err(err)
            }
        }
    }

    /// Template context: the document bound as `data`, plus the
    /// role-grouped host listing templates iterate over
    fn context(&self) -> Value {
        let mut context = Mapping::new();
        context.insert(
            Value::String("data".to_string()),
            self.document.clone(),
        );
        context.insert(
            Value::String("role_wise_nodes".to_string()),
            role_wise_nodes(&self.document),
        );
        Value::Mapping(context)
    }

    fn render_tree(
        &self,
        template_root: &Path,
        dir: &Path,
        site_root: &Path,
        context: &Value,
    ) -> Result<usize, RenderError> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|err| RenderError::io(dir, err))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        entries.sort();

        let mut rendered = 0;
        for path in entries {
            if path.is_dir() {
                rendered += self.render_tree(template_root, &path, site_root, context)?;
            } else {
                self.render_file(template_root, &path, site_root, context)?;
                rendered += 1;
            }
        }
        Ok(rendered)
    }

    fn render_file(
        &self,
        template_root: &Path,
        template_path: &Path,
        site_root: &Path,
        context: &Value,
    ) -> Result<(), RenderError> {
        let template = fs::read_to_string(template_path)
            .map_err(|err| RenderError::io(template_path, err))?;
        let name = template_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let output = self.engine.render(&name, &template, context)?;

        let relative = template_path
            .strip_prefix(template_root)
            .unwrap_or(template_path);
        let mut outfile = site_root.join(relative);
        if outfile.extension().is_some_and(|ext| ext == "j2") {
            outfile.set_extension("");
        }
        if let Some(parent) = outfile.parent() {
            fs::create_dir_all(parent).map_err(|err| RenderError::io(parent, err))?;
        }
        fs::write(&outfile, output).map_err(|err| RenderError::io(&outfile, err))?;
        info!("Rendered {}", outfile.display());
        Ok(())
    }
}

/// Group the document's hosts by role: the genesis descriptor plus
/// master and worker name lists
pub fn role_wise_nodes(document: &Value) -> Value {
    let mut genesis = Mapping::new();
    let mut masters = Vec::new();
    let mut workers = Vec::new();

    if let Some(Value::Mapping(racks)) = document.get("baremetal") {
        for (_, hosts) in racks {
            let Value::Mapping(hosts) = hosts else {
                continue;
            };
            for (host_name, host) in hosts {
                match host.get("type").and_then(Value::as_str) {
                    Some("genesis") => {
                        genesis.insert(Value::String("name".to_string()), host_name.clone());
                        for role in ["pxe", "oam"] {
                            if let Some(addr) = host.get("ip").and_then(|ip| ip.get(role)) {
                                genesis.insert(Value::String(role.to_string()), addr.clone());
                            }
                        }
                    }
                    Some("controller") => masters.push(host_name.clone()),
                    _ => workers.push(host_name.clone()),
                }
            }
        }
    }

    let mut nodes = Mapping::new();
    nodes.insert(Value::String("genesis".to_string()), Value::Mapping(genesis));
    nodes.insert(Value::String("masters".to_string()), Value::Sequence(masters));
    nodes.insert(Value::String("workers".to_string()), Value::Sequence(workers));
    Value::Mapping(nodes)
}
