mod secret;

pub use self::secret::{SecretPlan, SecretTransformer, regenerate, transform_secrets};

use crate::resmap::ResourceMap;

pub trait Transformer {
    fn transform(&mut self, resources: &mut ResourceMap) -> anyhow::Result<()>;
}
