use std::collections::BTreeMap;

use base64::Engine as _;

use crate::{
    error::{Error, Result},
    manifest::{SecretType, Str},
};

use super::{ResId, Resource};

/// A resource classified by kind, with kind-specific fields checked once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedResource<'a> {
    Secret(Secret),
    Other(&'a Resource),
}

impl Resource {
    pub fn typed(&self) -> Result<TypedResource<'_>> {
        if self.gvk().is_secret() {
            Secret::try_from(self).map(TypedResource::Secret)
        } else {
            Ok(TypedResource::Other(self))
        }
    }
}

/// A validated `v1` Secret. `data` still holds the base64 encoded values, sorted by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub id: ResId,
    pub name: Str,
    pub namespace: Option<Str>,
    pub ty: SecretType,
    pub data: BTreeMap<Str, Str>,
}

impl TryFrom<&Resource> for Secret {
    type Error = Error;

    fn try_from(resource: &Resource) -> Result<Self> {
        let id = resource.id();
        debug_assert!(id.is_secret(), "`{id}` is not a Secret");

        let name = match resource.metadata_name() {
            Some(name) if !name.is_empty() => Str::from(name),
            _ => return Err(Error::malformed(id, "missing `metadata.name`")),
        };

        // Kubernetes defaults an absent type to `Opaque`.
        let ty = match resource.root().get("type") {
            None | Some(serde_json::Value::Null) => SecretType::Opaque,
            Some(serde_json::Value::String(ty)) => SecretType::from(ty.as_str()),
            Some(other) => {
                return Err(Error::malformed(
                    id,
                    format!("`type` must be a string, found `{other}`"),
                ));
            }
        };

        let data = match resource.root().get("data") {
            None | Some(serde_json::Value::Null) => BTreeMap::new(),
            Some(serde_json::Value::Object(data)) => data
                .iter()
                .map(|(key, value)| match value {
                    serde_json::Value::String(value) => Ok((Str::from(key), Str::from(value))),
                    _ => Err(Error::malformed(
                        id,
                        format!("`data.{key}` must be a string, found `{value}`"),
                    )),
                })
                .collect::<Result<_>>()?,
            Some(other) => {
                return Err(Error::malformed(
                    id,
                    format!("`data` must be a mapping of strings, found `{other}`"),
                ));
            }
        };

        Ok(Secret {
            id: id.clone(),
            name,
            namespace: resource.namespace().cloned(),
            ty,
            data,
        })
    }
}

impl Secret {
    /// Decodes every `data` value in key order, stopping at the first failure.
    pub fn decoded(&self) -> impl Iterator<Item = Result<(&Str, String)>> + '_ {
        self.data
            .iter()
            .map(|(key, value)| Ok((key, self.decode(key, value)?)))
    }

    fn decode(&self, key: &Str, encoded: &str) -> Result<String> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|err| Error::encoding(&self.id, key.clone(), err))?;
        String::from_utf8(bytes).map_err(|err| Error::encoding(&self.id, key.clone(), err))
    }
}

#[cfg(test)]
mod tests {
    use crate::resource::{Gvk, Metadata, Object, ResId, Resource};

    use super::*;

    fn secret(yaml: &str) -> Resource {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn classifies_by_kind() {
        let configmap = secret(
            r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
data:
  a: b
"#,
        );
        assert_eq!(configmap.typed().unwrap(), TypedResource::Other(&configmap));

        // Only the core group counts.
        let foreign = secret(
            r#"
apiVersion: example.com/v1
kind: Secret
metadata:
  name: lookalike
"#,
        );
        assert!(matches!(foreign.typed().unwrap(), TypedResource::Other(_)));
    }

    #[test]
    fn parses_sorted_data_and_type() {
        let resource = secret(
            r#"
apiVersion: v1
kind: Secret
metadata:
  name: tls
  namespace: ingress
type: kubernetes.io/tls
data:
  tls.key: a2V5
  tls.crt: Y2VydA==
"#,
        );

        let TypedResource::Secret(secret) = resource.typed().unwrap() else {
            panic!("expected a secret");
        };

        assert_eq!(secret.name, "tls");
        assert_eq!(secret.namespace.as_deref(), Some("ingress"));
        assert_eq!(secret.ty, SecretType::Tls);
        assert_eq!(
            secret.data.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
            ["tls.crt", "tls.key"]
        );

        let decoded = secret.decoded().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(decoded[0].1, "cert");
        assert_eq!(decoded[1].1, "key");
    }

    #[test]
    fn missing_type_and_data_default() {
        let resource = secret(
            r#"
apiVersion: v1
kind: Secret
metadata:
  name: empty
"#,
        );
        let secret = Secret::try_from(&resource).unwrap();
        assert_eq!(secret.ty, SecretType::Opaque);
        assert!(secret.data.is_empty());
    }

    #[test]
    fn rejects_malformed_data() {
        let resource = secret(
            r#"
apiVersion: v1
kind: Secret
metadata:
  name: bad
data:
  - not
  - a
  - mapping
"#,
        );
        let err = Secret::try_from(&resource).unwrap_err();
        assert!(matches!(err, Error::MalformedResource { .. }), "{err}");
        assert!(err.to_string().contains("`data` must be a mapping"), "{err}");

        let resource = secret(
            r#"
apiVersion: v1
kind: Secret
metadata:
  name: bad
data:
  port: 5432
"#,
        );
        let err = Secret::try_from(&resource).unwrap_err();
        assert!(err.to_string().contains("`data.port` must be a string"), "{err}");

        let resource = secret(
            r#"
apiVersion: v1
kind: Secret
metadata:
  name: bad
type: [Opaque]
"#,
        );
        let err = Secret::try_from(&resource).unwrap_err();
        assert!(err.to_string().contains("`type` must be a string"), "{err}");
    }

    #[test]
    fn rejects_missing_name() {
        let resource = Resource::new(
            ResId::new(Gvk::secret(), "anonymous"),
            Metadata::default(),
            Object::new(),
        )
        .unwrap();

        let err = Secret::try_from(&resource).unwrap_err();
        assert!(matches!(err, Error::MalformedResource { .. }));
        assert!(err.to_string().contains("missing `metadata.name`"), "{err}");
    }

    #[test]
    fn parsed_secret_without_name_is_malformed() {
        let resource = secret(
            r#"
apiVersion: v1
kind: Secret
metadata:
  labels:
    app: web
data:
  a: Yg==
"#,
        );
        assert_eq!(resource.metadata_name(), Some(""));

        let err = resource.typed().unwrap_err();
        assert!(matches!(err, Error::MalformedResource { .. }), "{err}");
        assert!(err.to_string().contains("missing `metadata.name`"), "{err}");
    }

    #[test]
    fn decode_failures_name_the_key() {
        let resource = secret(
            r#"
apiVersion: v1
kind: Secret
metadata:
  name: broken
data:
  good: b2s=
  token: "not base64!"
"#,
        );
        let secret = Secret::try_from(&resource).unwrap();
        let err = secret.decoded().collect::<Result<Vec<_>>>().unwrap_err();
        match err {
            Error::Encoding { id, key, source } => {
                assert_eq!(id.name, "broken");
                assert_eq!(key, "token");
                assert!(matches!(source, crate::error::DecodeError::Base64(_)));
            }
            err => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn non_utf8_values_are_encoding_errors() {
        let resource = secret(
            r#"
apiVersion: v1
kind: Secret
metadata:
  name: binary
data:
  blob: //79
"#,
        );
        let secret = Secret::try_from(&resource).unwrap();
        let err = secret.decoded().collect::<Result<Vec<_>>>().unwrap_err();
        assert!(matches!(
            err,
            Error::Encoding {
                source: crate::error::DecodeError::Utf8(_),
                ..
            }
        ));
    }
}
