//! Bind mount mapping
//!
//! Turns Docker `source:dest[:mode]` binds into hostPath volumes. Only binds
//! whose source exists on the machine running the backend are mounted.

use k8s_openapi::api::core::v1::{HostPathVolumeSource, PodTemplateSpec, Volume, VolumeMount};
use std::path::Path;

use super::diagnostics::{Diagnostic, Diagnostics};
use crate::models::ContainerSpec;

/// A parsed bind mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind<'a> {
    pub source: &'a str,
    pub dest: &'a str,
    pub read_only: bool,
}

/// Split a `source:dest[:mode]` bind. Mode is a comma separated option list;
/// `ro` makes the mount read-only, anything else leaves it read-write.
pub fn parse_bind(bind: &str) -> Option<Bind<'_>> {
    let parts: Vec<&str> = bind.split(':').collect();
    let (source, dest, mode) = match parts.as_slice() {
        [source, dest] => (*source, *dest, ""),
        [source, dest, mode] => (*source, *dest, *mode),
        _ => return None,
    };
    if source.is_empty() || dest.is_empty() {
        return None;
    }
    Some(Bind {
        source,
        dest,
        read_only: mode.split(',').any(|opt| opt == "ro"),
    })
}

/// Add a Volume and matching VolumeMounts to the template for every bind of
/// the container whose source resolves locally. Other binds are skipped and
/// reported in `diagnostics`.
pub fn add_volumes(spec: &ContainerSpec, template: &mut PodTemplateSpec, diagnostics: &mut Diagnostics) {
    let pod_spec = template.spec.get_or_insert_with(Default::default);

    for raw in &spec.binds {
        let Some(bind) = parse_bind(raw) else {
            diagnostics.push(Diagnostic::MalformedBind(raw.clone()));
            continue;
        };

        let source = match std::fs::canonicalize(Path::new(bind.source)) {
            Ok(path) => path,
            Err(e) => {
                diagnostics.push(Diagnostic::UnresolvableBind {
                    bind: raw.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let volumes = pod_spec.volumes.get_or_insert_with(Vec::new);
        let name = format!("bind-{}", volumes.len());
        volumes.push(Volume {
            name: name.clone(),
            host_path: Some(HostPathVolumeSource {
                path: source.to_string_lossy().into_owned(),
                type_: None,
            }),
            ..Default::default()
        });

        for container in pod_spec.containers.iter_mut() {
            container
                .volume_mounts
                .get_or_insert_with(Vec::new)
                .push(VolumeMount {
                    name: name.clone(),
                    mount_path: bind.dest.to_string(),
                    read_only: Some(bind.read_only),
                    ..Default::default()
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, PodSpec};

    fn template() -> PodTemplateSpec {
        PodTemplateSpec {
            spec: Some(PodSpec {
                containers: vec![Container::default()],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn binds(entries: &[&str]) -> ContainerSpec {
        ContainerSpec {
            binds: entries.iter().map(|b| b.to_string()).collect(),
            ..Default::default()
        }
    }

    fn volume_count(template: &PodTemplateSpec) -> usize {
        template
            .spec
            .as_ref()
            .and_then(|s| s.volumes.as_ref())
            .map(Vec::len)
            .unwrap_or(0)
    }

    #[test]
    fn test_parse_bind() {
        assert_eq!(
            parse_bind(".:/remote:rw"),
            Some(Bind { source: ".", dest: "/remote", read_only: false })
        );
        assert_eq!(
            parse_bind("/data:/data:ro,z"),
            Some(Bind { source: "/data", dest: "/data", read_only: true })
        );
        assert_eq!(
            parse_bind("/data:/data"),
            Some(Bind { source: "/data", dest: "/data", read_only: false })
        );
        assert_eq!(parse_bind("/data"), None);
        assert_eq!(parse_bind(":/data"), None);
        assert_eq!(parse_bind("a:b:c:d"), None);
    }

    #[test]
    fn test_add_volumes_counts_resolvable_binds() {
        let cases: Vec<(Vec<&str>, usize)> = vec![
            (vec![], 0),
            (vec![".:/remote:rw"], 1),
            (vec![".:/remote:rw", "Cargo.toml:/tmp/Cargo.toml"], 2),
            (vec![".:/remote:rw", "xxx:/tmp/gogo.go"], 1),
        ];

        for (i, (entries, count)) in cases.into_iter().enumerate() {
            let mut tmpl = template();
            add_volumes(&binds(&entries), &mut tmpl, &mut Diagnostics::new());
            assert_eq!(volume_count(&tmpl), count, "case {}", i);
        }
    }

    #[test]
    fn test_add_volumes_mounts_and_diagnostics() {
        let mut tmpl = template();
        let mut diags = Diagnostics::new();
        add_volumes(
            &binds(&["src:/src:ro", "xxx:/tmp/x", "garbage"]),
            &mut tmpl,
            &mut diags,
        );

        let pod_spec = tmpl.spec.unwrap();
        let volumes = pod_spec.volumes.unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].name, "bind-0");
        let path = &volumes[0].host_path.as_ref().unwrap().path;
        assert!(Path::new(path).is_absolute());

        let mounts = pod_spec.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].mount_path, "/src");
        assert_eq!(mounts[0].read_only, Some(true));

        assert_eq!(diags.len(), 2);
        assert!(matches!(
            diags.iter().next(),
            Some(Diagnostic::UnresolvableBind { .. })
        ));
        assert_eq!(
            diags.iter().nth(1),
            Some(&Diagnostic::MalformedBind("garbage".to_string()))
        );
    }
}
