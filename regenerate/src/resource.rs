mod secret;

use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use anyhow::ensure;
use compact_str::format_compact;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::manifest::Str;

pub use self::secret::{Secret, TypedResource};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Gvk {
    pub group: Str,
    pub version: Str,
    pub kind: Str,
}

impl Gvk {
    /// The core `v1` group-version-kind of a Kubernetes `Secret`.
    pub fn secret() -> Self {
        Self {
            group: Str::default(),
            version: "v1".into(),
            kind: "Secret".into(),
        }
    }

    pub fn is_secret(&self) -> bool {
        self.group.is_empty() && self.version == "v1" && self.kind == "Secret"
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}.{}", self.kind, self.version)
        } else {
            write!(f, "{}.{}.{}", self.kind, self.version, self.group)
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResId {
    #[serde(flatten)]
    pub gvk: Gvk,
    pub name: Str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Str>,
}

impl ResId {
    pub fn new(gvk: Gvk, name: impl Into<Str>) -> Self {
        Self {
            gvk,
            name: name.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<Str>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl Deref for ResId {
    type Target = Gvk;

    fn deref(&self) -> &Self::Target {
        &self.gvk
    }
}

impl fmt::Debug for ResId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for ResId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace) = &self.namespace {
            write!(f, "{}/{}.{namespace}", self.gvk, self.name)?;
        } else {
            write!(f, "{}/{}", self.gvk, self.name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    id: ResId,
    root: Object,
}

pub type Object = serde_json::Map<String, serde_json::Value>;

impl Resource {
    pub fn new(id: ResId, metadata: Metadata, mut root: Object) -> anyhow::Result<Self> {
        ensure!(
            root.insert("metadata".into(), serde_json::to_value(&metadata)?)
                .is_none(),
            "root must not duplicate metadata"
        );

        Ok(Resource { id, root })
    }

    pub fn id(&self) -> &ResId {
        &self.id
    }

    pub fn name(&self) -> &Str {
        &self.id.name
    }

    pub fn namespace(&self) -> Option<&Str> {
        self.id.namespace.as_ref()
    }

    pub fn gvk(&self) -> &Gvk {
        &self.id.gvk
    }

    pub fn kind(&self) -> &Str {
        &self.id.kind
    }

    pub fn root(&self) -> &Object {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Object {
        &mut self.root
    }

    /// `metadata.name` as written in the object itself, which may disagree with the id for
    /// resources assembled in code.
    pub fn metadata_name(&self) -> Option<&str> {
        self.root
            .get("metadata")
            .and_then(|metadata| metadata.get("name"))
            .and_then(|name| name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Metadata {
    // Absent names parse as empty so kind-specific validation can report them.
    #[serde(default)]
    pub name: Str,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Str>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<Str, Str>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub annotations: IndexMap<Str, Str>,
    #[serde(flatten)]
    pub rest: IndexMap<Str, serde_json::Value>,
}

impl Metadata {
    pub fn named(name: impl Into<Str>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Deref for Metadata {
    type Target = IndexMap<Str, serde_json::Value>;

    fn deref(&self) -> &Self::Target {
        &self.rest
    }
}

impl DerefMut for Metadata {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.rest
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Res {
    api_version: Str,
    kind: Str,
    metadata: Metadata,
    #[serde(flatten)]
    root: Object,
}

impl Serialize for Resource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let api_version = if self.id.gvk.group.is_empty() {
            self.id.gvk.version.clone()
        } else {
            format_compact!("{}/{}", self.id.gvk.group, self.id.gvk.version)
        };

        let mut root = self.root.clone();
        let metadata = match root.remove("metadata") {
            Some(metadata) => serde_json::from_value(metadata).map_err(serde::ser::Error::custom)?,
            None => Metadata::named(self.id.name.clone()),
        };

        Res {
            api_version,
            kind: self.kind().clone(),
            metadata,
            root,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let res = Res::deserialize(deserializer)
            .map_err(|err| serde::de::Error::custom(format!("parsing resource: {err}")))?;

        let (group, version) = res
            .api_version
            .split_once('/')
            .map_or(("".into(), res.api_version.clone()), |(g, v)| {
                (g.into(), v.into())
            });

        let id = ResId {
            gvk: Gvk {
                group,
                version,
                kind: res.kind,
            },
            name: res.metadata.name.clone(),
            namespace: res.metadata.namespace.clone(),
        };

        Resource::new(id, res.metadata, res.root).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_splits_api_version() {
        let resource: Resource = serde_yaml::from_str(
            r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: prod
spec:
  replicas: 2
"#,
        )
        .unwrap();

        assert_eq!(resource.gvk().group, "apps");
        assert_eq!(resource.gvk().version, "v1");
        assert_eq!(resource.id().to_string(), "Deployment.v1.apps/web.prod");
        assert!(!resource.gvk().is_secret());
        assert_eq!(resource.metadata_name(), Some("web"));
    }

    #[test]
    fn core_secret_gvk() {
        let resource: Resource = serde_yaml::from_str(
            r#"
apiVersion: v1
kind: Secret
metadata:
  name: creds
data: {}
"#,
        )
        .unwrap();

        assert_eq!(resource.gvk(), &Gvk::secret());
        assert!(resource.gvk().is_secret());
        assert_eq!(resource.id().to_string(), "Secret.v1/creds");
    }

    #[test]
    fn serialize_preserves_fields() {
        let yaml = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
  labels:
    app: web
data:
  mode: fast
"#;
        let resource: Resource = serde_yaml::from_str(yaml).unwrap();
        let reparsed: Resource =
            serde_yaml::from_str(&serde_yaml::to_string(&resource).unwrap()).unwrap();
        assert_eq!(resource, reparsed);
    }

    #[test]
    fn missing_metadata_name_is_rejected() {
        let err = serde_yaml::from_str::<Resource>(
            r#"
apiVersion: v1
kind: Secret
metadata: {}
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("parsing resource"));
    }
}
