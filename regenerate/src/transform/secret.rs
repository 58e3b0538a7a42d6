use indexmap::IndexMap;

use crate::{
    command::{CommandEncoder, PrintfCommand},
    error::Result,
    manifest::{CommandSources, Kustomization, SecretGenerator},
    resource::{ResId, Secret},
};

use super::{ResourceMap, Transformer};

/// Rewrites every `v1` Secret in `resources` into a `secretGenerator` entry of `kustomization`
/// and removes the Secret.
///
/// Secrets are processed one at a time. On error the secrets handled so far stay converted and
/// removed; use [`SecretPlan`] when the rewrite must be all or nothing.
pub fn transform_secrets(
    kustomization: &mut Kustomization,
    resources: &mut ResourceMap,
) -> Result<()> {
    SecretTransformer::new(&mut kustomization.secret_generators).rewrite(resources)
}

/// Builds the generator that reproduces `secret`. Keys are emitted in sorted order.
pub fn regenerate(secret: &Secret, encoder: &impl CommandEncoder) -> Result<SecretGenerator> {
    let commands = secret
        .decoded()
        .map(|decoded| decoded.map(|(key, value)| (key.clone(), encoder.encode(&value))))
        .collect::<Result<IndexMap<_, _>>>()?;

    Ok(SecretGenerator {
        name: secret.name.clone(),
        namespace: secret.namespace.clone(),
        sources: CommandSources { commands },
        ty: secret.ty.clone(),
        rest: IndexMap::new(),
    })
}

pub struct SecretTransformer<'a, E = PrintfCommand> {
    generators: &'a mut Vec<SecretGenerator>,
    encoder: E,
}

impl<'a> SecretTransformer<'a> {
    pub fn new(generators: &'a mut Vec<SecretGenerator>) -> Self {
        Self {
            generators,
            encoder: PrintfCommand,
        }
    }
}

impl<'a, E: CommandEncoder> SecretTransformer<'a, E> {
    pub fn with_encoder<F: CommandEncoder>(self, encoder: F) -> SecretTransformer<'a, F> {
        SecretTransformer {
            generators: self.generators,
            encoder,
        }
    }

    #[tracing::instrument(skip_all, name = "secret_transform", fields(resources = resources.len()))]
    pub fn rewrite(&mut self, resources: &mut ResourceMap) -> Result<()> {
        let ids = secret_ids(resources);

        for id in &ids {
            let secret = Secret::try_from(&resources[id])?;
            let generator = regenerate(&secret, &self.encoder)?;
            tracing::debug!(
                %id,
                keys = generator.sources.commands.len(),
                ty = %generator.ty,
                "regenerated secret"
            );
            self.generators.push(generator);
            resources.remove(id);
        }

        tracing::info!(secrets = ids.len(), "rewrote secrets into generators");
        Ok(())
    }

    /// Computes the rewrite without touching `resources` or the generator list.
    pub fn plan(&self, resources: &ResourceMap) -> Result<SecretPlan> {
        SecretPlan::build(resources, &self.encoder)
    }
}

impl<E: CommandEncoder> Transformer for SecretTransformer<'_, E> {
    fn transform(&mut self, resources: &mut ResourceMap) -> anyhow::Result<()> {
        Ok(self.rewrite(resources)?)
    }
}

/// The complete outcome of a secret rewrite, computed before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecretPlan {
    generators: Vec<SecretGenerator>,
    removals: Vec<ResId>,
}

impl SecretPlan {
    #[tracing::instrument(skip_all, name = "secret_plan", fields(resources = resources.len()))]
    pub fn build(resources: &ResourceMap, encoder: &impl CommandEncoder) -> Result<Self> {
        let removals = secret_ids(resources);
        let generators = removals
            .iter()
            .map(|id| regenerate(&Secret::try_from(&resources[id])?, encoder))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            generators,
            removals,
        })
    }

    pub fn generators(&self) -> &[SecretGenerator] {
        &self.generators
    }

    pub fn removals(&self) -> &[ResId] {
        &self.removals
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
    }

    pub fn apply(self, generators: &mut Vec<SecretGenerator>, resources: &mut ResourceMap) {
        for id in &self.removals {
            resources.remove(id);
        }
        generators.extend(self.generators);
    }
}

fn secret_ids(resources: &ResourceMap) -> Vec<ResId> {
    resources.ids().filter(|id| id.is_secret()).cloned().collect()
}
