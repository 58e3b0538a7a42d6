use serde::{Deserialize, de::DeserializeOwned};

pub fn from_reader<R, T>(reader: R) -> anyhow::Result<T>
where
    R: std::io::Read,
    T: DeserializeOwned,
{
    serde_yaml::from_reader(reader).map_err(Into::into)
}

/// Parses every document of a `---` separated stream, skipping empty ones.
pub fn documents<T>(s: &str) -> anyhow::Result<Vec<T>>
where
    T: DeserializeOwned,
{
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(s) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        documents.push(serde_yaml::from_value(value)?);
    }
    Ok(documents)
}

pub fn to_string<T>(value: &T) -> anyhow::Result<String>
where
    T: serde::Serialize,
{
    serde_yaml::to_string(value).map_err(Into::into)
}

pub fn to_writer<W, T>(writer: W, value: &T) -> anyhow::Result<()>
where
    W: std::io::Write,
    T: serde::Serialize,
{
    serde_yaml::to_writer(writer, value).map_err(Into::into)
}
