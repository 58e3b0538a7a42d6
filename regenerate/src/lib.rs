use std::{
    io::Write,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};

use self::{
    manifest::Kustomization,
    resource::{ResId, Resource},
    transform::{SecretTransformer, Transformer},
};

pub mod command;
pub mod error;
pub mod manifest;
pub mod resmap;
pub mod resource;
pub mod transform;
mod yaml;

pub use self::error::Error;
pub use self::resmap::ResourceMap;

/// File names kustomize recognizes, in lookup order.
pub const KUSTOMIZATION_FILE_NAMES: [&str; 3] =
    ["kustomization.yaml", "kustomization.yml", "Kustomization"];

#[derive(Debug, Clone, PartialEq)]
pub struct Located<T> {
    pub value: T,
    pub path: PathBuf,
}

impl<T> Located<T> {
    /// The directory the manifest lives in, which relative paths are resolved against.
    pub fn base_path(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

impl<T> Deref for Located<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

pub trait PathExt {
    fn pretty(&self) -> std::path::Display<'_>;
}

impl PathExt for Path {
    fn pretty(&self) -> std::path::Display<'_> {
        self.display()
    }
}

/// Loads a kustomization from a file or from a directory containing one.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_kustomization(path: impl AsRef<Path>) -> anyhow::Result<Located<Kustomization>> {
    let path = path.as_ref();
    if !path.exists() {
        bail!("load kustomization: path does not exist: {}", path.pretty());
    }

    let mut path = path.canonicalize()?;
    if path.is_dir() {
        let dir = path;
        path = KUSTOMIZATION_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
            .with_context(|| format!("no kustomization file found in {}", dir.pretty()))?;
    }

    let file = std::fs::File::open(&path)
        .with_context(|| format!("opening kustomization {}", path.pretty()))?;
    let value = yaml::from_reader(file)
        .with_context(|| format!("parsing kustomization {}", path.pretty()))?;
    Ok(Located { value, path })
}

/// A file listed under `resources:` and the ids of the documents it held when loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    /// The entry as written in the kustomization.
    pub entry: PathBuf,
    pub path: PathBuf,
    pub ids: Vec<ResId>,
}

impl ResourceFile {
    /// The documents of this file still present in `resources`, in file order.
    pub fn remaining<'a>(
        &'a self,
        resources: &'a ResourceMap,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.ids.iter().filter_map(|id| resources.get(id))
    }

    pub fn is_modified(&self, resources: &ResourceMap) -> bool {
        self.ids.iter().any(|id| !resources.contains(id))
    }

    /// Every document of the file was removed. Empty files never count.
    pub fn is_emptied(&self, resources: &ResourceMap) -> bool {
        !self.ids.is_empty() && self.ids.iter().all(|id| !resources.contains(id))
    }
}

/// Loads every resource file listed under `resources:`. Files may hold several documents.
#[tracing::instrument(skip_all, fields(path = %kustomization.path.display()))]
pub fn load_resources(
    kustomization: &Located<Kustomization>,
) -> anyhow::Result<(ResourceMap, Vec<ResourceFile>)> {
    let mut resources = ResourceMap::default();
    let mut files = Vec::with_capacity(kustomization.resources.len());

    for entry in &kustomization.resources {
        if entry.to_string_lossy().contains("://") {
            bail!("remote resources are not supported: {}", entry.pretty());
        }

        let path = kustomization.base_path().join(entry);
        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("reading resource {}", path.pretty()))?;
        if metadata.is_dir() {
            bail!(
                "nested kustomizations are not supported: {}",
                path.pretty()
            );
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading resource {}", path.pretty()))?;
        let documents = yaml::documents::<Resource>(&contents)
            .with_context(|| format!("loading resource {}", path.pretty()))?;

        tracing::debug!(path = %path.display(), documents = documents.len(), "loaded resource file");

        let ids = documents.iter().map(|resource| resource.id().clone()).collect();
        for resource in documents {
            resources
                .insert(resource)
                .with_context(|| format!("loading resource {}", path.pretty()))?;
        }

        files.push(ResourceFile {
            entry: entry.clone(),
            path,
            ids,
        });
    }

    Ok((resources, files))
}

/// A kustomization whose Secrets were rewritten into `secretGenerator` entries, together with
/// the resources that remain and the files they were loaded from.
///
/// Entries under `resources:` whose files held only Secrets are dropped from the kustomization.
#[derive(Debug)]
pub struct Regenerated {
    pub kustomization: Located<Kustomization>,
    pub resources: ResourceMap,
    pub files: Vec<ResourceFile>,
}

impl Regenerated {
    /// Writes the rewrite back to disk: the kustomization itself, and every resource file that
    /// lost some but not all of its documents. Files that lost every document are no longer
    /// referenced and are left as they are.
    pub fn save(&self) -> anyhow::Result<()> {
        for file in &self.files {
            if file.is_emptied(&self.resources) {
                tracing::info!(path = %file.path.display(), "resource file is no longer referenced");
                continue;
            }
            if !file.is_modified(&self.resources) {
                continue;
            }

            let mut out = Vec::new();
            write_documents(&mut out, file.remaining(&self.resources), true)?;
            std::fs::write(&file.path, out)
                .with_context(|| format!("writing resource {}", file.path.pretty()))?;
            tracing::info!(path = %file.path.display(), "removed secrets from resource file");
        }

        save_kustomization(&self.kustomization)
    }
}

pub fn regenerate_secrets(path: impl AsRef<Path>) -> anyhow::Result<Regenerated> {
    let mut kustomization = load_kustomization(path)?;
    let (mut resources, files) = load_resources(&kustomization)?;

    SecretTransformer::new(&mut kustomization.value.secret_generators)
        .transform(&mut resources)
        .with_context(|| {
            format!(
                "rewriting secrets of kustomization {}",
                kustomization.path.pretty()
            )
        })?;

    let emptied = files
        .iter()
        .filter(|file| file.is_emptied(&resources))
        .map(|file| &file.entry)
        .collect::<Vec<_>>();
    if !emptied.is_empty() {
        tracing::debug!(?emptied, "dropping resource entries that only held secrets");
        kustomization
            .value
            .resources
            .retain(|entry| !emptied.contains(&entry));
    }

    Ok(Regenerated {
        kustomization,
        resources,
        files,
    })
}

/// Writes `kustomization` (when given) followed by `resources` as a multi-document YAML stream.
pub fn write_stream(
    out: &mut dyn Write,
    kustomization: Option<&Kustomization>,
    resources: &ResourceMap,
) -> anyhow::Result<()> {
    let mut first = true;

    if let Some(kustomization) = kustomization {
        yaml::to_writer(&mut *out, kustomization)?;
        first = false;
    }

    write_documents(out, resources.iter(), first)
}

fn write_documents<'a>(
    out: &mut dyn Write,
    resources: impl IntoIterator<Item = &'a Resource>,
    mut first: bool,
) -> anyhow::Result<()> {
    for resource in resources {
        if !first {
            writeln!(out, "---")?;
        }
        first = false;
        yaml::to_writer(&mut *out, resource)?;
    }

    Ok(())
}

/// Saves `kustomization` back to the file it was loaded from.
pub fn save_kustomization(kustomization: &Located<Kustomization>) -> anyhow::Result<()> {
    let yaml = yaml::to_string(&kustomization.value)?;
    std::fs::write(&kustomization.path, yaml)
        .with_context(|| format!("writing kustomization {}", kustomization.path.pretty()))
}
