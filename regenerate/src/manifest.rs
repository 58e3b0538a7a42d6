use core::fmt;
use std::{convert::Infallible, path::PathBuf, str::FromStr};

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type Str = CompactString;

pub type Kustomization = Manifest<apiversion::V1Beta1, kind::Kustomize>;

/// The subset of a kustomization this crate rewrites. Every other field is carried through
/// `rest` untouched so that saving a loaded manifest only changes what was transformed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest<A, K> {
    #[serde(flatten)]
    pub type_meta: TypeMeta<A, K>,
    #[serde(default, skip_serializing_if = "<[_]>::is_empty")]
    pub resources: Vec<PathBuf>,
    #[serde(
        default,
        skip_serializing_if = "<[_]>::is_empty",
        rename = "secretGenerator"
    )]
    pub secret_generators: Vec<SecretGenerator>,
    #[serde(flatten)]
    pub rest: IndexMap<Str, serde_yaml::Value>,
}

impl<A: Default, K: Default> Default for Manifest<A, K> {
    fn default() -> Self {
        Self {
            type_meta: TypeMeta::default(),
            resources: Default::default(),
            secret_generators: Default::default(),
            rest: Default::default(),
        }
    }
}

/// A `secretGenerator` entry. Only `commands` is produced here; other sources (`literals`,
/// `files`, `envs`) along with `behavior` and `options` are kept in `rest` as written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretGenerator {
    pub name: Str,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Str>,
    #[serde(flatten)]
    pub sources: CommandSources,
    #[serde(default, rename = "type")]
    pub ty: SecretType,
    #[serde(flatten)]
    pub rest: IndexMap<Str, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct CommandSources {
    /// Maps each secret key to a command whose stdout is the value.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub commands: IndexMap<Str, Str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SecretType {
    #[default]
    Opaque,
    Tls,
    BasicAuth,
    SshAuth,
    DockerConfigJson,
    DockerConfig,
    ServiceAccountToken,
    BootstrapToken,
    Custom(Str),
}

impl SecretType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Opaque => "Opaque",
            Self::Tls => "kubernetes.io/tls",
            Self::BasicAuth => "kubernetes.io/basic-auth",
            Self::SshAuth => "kubernetes.io/ssh-auth",
            Self::DockerConfigJson => "kubernetes.io/dockerconfigjson",
            Self::DockerConfig => "kubernetes.io/dockercfg",
            Self::ServiceAccountToken => "kubernetes.io/service-account-token",
            Self::BootstrapToken => "bootstrap.kubernetes.io/token",
            Self::Custom(ty) => ty,
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unknown types are kept verbatim so they survive a round trip.
impl From<&str> for SecretType {
    fn from(s: &str) -> Self {
        match s {
            "Opaque" => Self::Opaque,
            "kubernetes.io/tls" => Self::Tls,
            "kubernetes.io/basic-auth" => Self::BasicAuth,
            "kubernetes.io/ssh-auth" => Self::SshAuth,
            "kubernetes.io/dockerconfigjson" => Self::DockerConfigJson,
            "kubernetes.io/dockercfg" => Self::DockerConfig,
            "kubernetes.io/service-account-token" => Self::ServiceAccountToken,
            "bootstrap.kubernetes.io/token" => Self::BootstrapToken,
            _ => Self::Custom(s.into()),
        }
    }
}

impl FromStr for SecretType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl Serialize for SecretType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SecretType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Str::deserialize(deserializer).map(|ty| Self::from(ty.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta<V, K> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<K>,
}

impl<V, K> Default for TypeMeta<V, K>
where
    V: Default,
    K: Default,
{
    fn default() -> Self {
        Self {
            api_version: Some(V::default()),
            kind: Some(K::default()),
        }
    }
}

pub mod kind {
    use super::define_symbol;

    define_symbol!(Kustomize = "Kustomization");
}

pub mod apiversion {
    use super::define_symbol;

    define_symbol!(V1Beta1 = "kustomize.config.k8s.io/v1beta1");
}

macro_rules! define_symbol {
    ($name:ident = $value:literal) => {
        #[derive(Clone, PartialEq, Eq, Hash, Default)]
        #[allow(non_camel_case_types)]
        pub struct $name;

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", $value)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", $value)
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str($value)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value: $crate::manifest::Str = ::serde::Deserialize::deserialize(deserializer)?;
                if value == $value {
                    Ok($name)
                } else {
                    Err(serde::de::Error::custom(format!(
                        "expected `{}`, found `{value}`",
                        $value
                    )))
                }
            }
        }
    };
}

use define_symbol;
