use base64::Engine as _;
use regenerate::{
    ResourceMap,
    manifest::Kustomization,
    resource::{Gvk, Metadata, Object, ResId, Resource},
    transform::transform_secrets,
};

fn main() {
    divan::main();
}

fn resources(secrets: usize) -> ResourceMap {
    let mut resources = ResourceMap::default();
    for i in 0..secrets {
        let name = format!("secret-{i}");
        let data = (0..8)
            .map(|k| {
                let value = format!("value {k} of \"{name}\"");
                (
                    format!("key-{k}"),
                    serde_json::Value::String(
                        base64::engine::general_purpose::STANDARD.encode(value),
                    ),
                )
            })
            .collect::<Object>();
        let root = Object::from_iter([("data".to_string(), serde_json::Value::Object(data))]);
        let resource = Resource::new(
            ResId::new(Gvk::secret(), name.as_str()),
            Metadata::named(name.as_str()),
            root,
        )
        .unwrap();
        resources.insert(resource).unwrap();
    }
    resources
}

#[divan::bench(args = [10, 100, 1000])]
fn rewrite_secrets(bencher: divan::Bencher, secrets: usize) {
    bencher
        .with_inputs(|| (Kustomization::default(), resources(secrets)))
        .bench_local_values(|(mut kustomization, mut resources)| {
            transform_secrets(&mut kustomization, &mut resources).unwrap();
            kustomization
        });
}
